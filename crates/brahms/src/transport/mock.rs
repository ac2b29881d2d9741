use super::{Prober, Transport};
use crate::node::{Nid, Node};
use crate::view::View;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Transport that imitates peers with scripted answers.
///
/// Pulls answer with whatever was configured through [`MockTransport::set_pull`]
/// and stay silent otherwise. Probes succeed unless the node was marked
/// unresponsive.
#[derive(Default)]
pub struct MockTransport {
    pushed: RwLock<View>,
    pulls: RwLock<HashMap<Nid, View>>,
    unresponsive: RwLock<HashSet<Nid>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imitate the peer `id` answering a pull with `view`.
    pub fn set_pull(&self, id: Nid, view: View) {
        self.pulls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, view);
    }

    /// Make probes of `id` go unanswered.
    pub fn set_unresponsive(&self, id: Nid) {
        self.unresponsive
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
    }

    /// Whether the node `id` pushed itself through this transport.
    pub fn did_push(&self, id: &Nid) -> bool {
        self.pushed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }
}

#[async_trait]
impl Prober for MockTransport {
    async fn probe(&self, node: &Node) -> bool {
        !self
            .unresponsive
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&node.id())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn push(&self, self_node: &Node, _to: &Node) {
        self.pushed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(*self_node);
    }

    async fn pull(&self, from: &Node) -> Option<View> {
        self.pulls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&from.id())
            .cloned()
    }
}
