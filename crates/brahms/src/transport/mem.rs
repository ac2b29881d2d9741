use super::{Inbound, Prober, Transport};
use crate::engine::Core;
use crate::node::{Nid, Node};
use crate::view::View;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

/// In-memory transport that lets cores call each other's handlers directly.
///
/// Holds weak references so a core and the transport it uses don't keep each
/// other alive. Reaching a node that was never added is a setup bug and
/// panics.
#[derive(Default)]
pub struct MemNetTransport {
    peers: RwLock<HashMap<Nid, Weak<dyn Inbound>>>,
}

impl MemNetTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a core reachable under its own address.
    pub fn add_core(&self, core: &Arc<Core>) {
        let peer: Arc<dyn Inbound> = core.clone();
        self.add_peer(core.id(), &peer);
    }

    /// Make any inbound handler reachable under `node`'s identity.
    pub fn add(&self, node: &Node, peer: &Arc<dyn Inbound>) {
        self.add_peer(node.id(), peer);
    }

    fn add_peer(&self, id: Nid, peer: &Arc<dyn Inbound>) {
        self.peers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::downgrade(peer));
    }

    fn route(&self, node: &Node) -> Arc<dyn Inbound> {
        let peer = self
            .peers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&node.id())
            .and_then(Weak::upgrade);

        match peer {
            Some(peer) => peer,
            None => panic!("no core known for: {node}"),
        }
    }
}

#[async_trait]
impl Prober for MemNetTransport {
    async fn probe(&self, node: &Node) -> bool {
        self.route(node).is_active()
    }
}

#[async_trait]
impl Transport for MemNetTransport {
    async fn push(&self, self_node: &Node, to: &Node) {
        self.route(to).receive_node(*self_node);
    }

    async fn pull(&self, from: &Node) -> Option<View> {
        Some(self.route(from).read_view())
    }
}
