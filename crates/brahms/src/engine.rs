//! Per-node protocol state.
//!
//! A [`Core`] owns the view and the sampler of one node. A driver calls
//! [`Core::update_view`] and [`Core::validate_sample`] repeatedly, possibly
//! concurrently; remote nodes reach the core through a transport calling its
//! [`Inbound`] side.

use crate::node::{Nid, Node};
use crate::params::Params;
use crate::round::Round;
use crate::sampler::Sampler;
use crate::transport::{Inbound, Transport};
use crate::view::View;
use arc_swap::ArcSwap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Room in the push buffer beyond the push count, so a round can still tell
/// that it was flooded.
const PUSH_BUFFER_SLACK: usize = 10;

pub struct Core {
    self_node: Node,
    id: Nid,
    params: Params,
    view: ArcSwap<View>,
    active: AtomicBool,
    sampler: Sampler,
    transport: Arc<dyn Transport>,
    rng: Mutex<StdRng>,
    push_tx: mpsc::Sender<Node>,
    /// Held for the whole round, which serializes concurrent `update_view`s
    push_rx: tokio::sync::Mutex<mpsc::Receiver<Node>>,
}

impl Core {
    /// Create an active core for `self_node` with the initial view `v0`.
    ///
    /// `v0` also seeds the sampler. Sampler keys and every later random
    /// choice are drawn from `rng`.
    pub fn new<T: Transport + 'static>(
        mut rng: StdRng,
        self_node: Node,
        v0: View,
        params: Params,
        invalidation: Duration,
        transport: Arc<T>,
    ) -> Self {
        let sampler = Sampler::new(
            &mut rng,
            params.reservoir_size(),
            transport.clone(),
            invalidation,
        );
        sampler.update(&v0);

        let (push_tx, push_rx) = mpsc::channel(params.push_count() + PUSH_BUFFER_SLACK);

        info!("{self_node}: starting with {} known node(s)", v0.len());
        Self {
            self_node,
            id: self_node.id(),
            params,
            view: ArcSwap::from_pointee(v0),
            active: AtomicBool::new(true),
            sampler,
            transport,
            rng: Mutex::new(rng),
            push_tx,
            push_rx: tokio::sync::Mutex::new(push_rx),
        }
    }

    pub fn self_node(&self) -> Node {
        self.self_node
    }

    pub fn id(&self) -> Nid {
        self.id
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The current view, empty once deactivated.
    pub fn read_view(&self) -> View {
        if !self.is_active() {
            return View::new();
        }

        View::clone(&self.view.load())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Queue a node that pushed itself to us. Never blocks: when the buffer
    /// is full the node is dropped.
    pub fn receive_node(&self, node: Node) {
        if let Err(err) = self.push_tx.try_send(node) {
            warn!("{}: dropped push from {node}: {err}", self.self_node);
        }
    }

    /// Run one gossip round and publish its view.
    pub async fn update_view(&self, timeout: Duration) {
        if !self.is_active() {
            return;
        }

        let mut rng = self.fork_rng();
        let mut pushes = self.push_rx.lock().await;
        let prior = self.view.load_full();

        let round = Round {
            self_node: self.self_node,
            params: &self.params,
            sampler: &self.sampler,
            transport: &self.transport,
        };
        let next = round.run(&mut rng, timeout, &mut pushes, &prior).await;

        if !self.is_active() {
            // deactivated mid-round, undo what the round fed the sampler
            self.sampler.clear();
            return;
        }

        debug!("{}: view {next}", self.self_node);
        self.view.store(Arc::new(next));

        // lost a race with deactivate between the check above and the store
        if !self.is_active() {
            self.view.store(Arc::new(View::new()));
        }
    }

    /// The stored view, without hiding it once deactivated.
    #[cfg(test)]
    fn stored_view(&self) -> View {
        View::clone(&self.view.load())
    }

    /// Probe sampled nodes and evict the ones that don't answer in `timeout`.
    ///
    /// Probes at most `probe_count` random sampled nodes, or all of them when
    /// the probe count is zero.
    pub async fn validate_sample(&self, timeout: Duration) {
        if !self.is_active() {
            return;
        }

        let sample = self.sampler.sample();
        let probes = match self.params.probe_count() {
            0 => sample,
            count => {
                let mut rng = self.fork_rng();
                sample.pick(&mut rng, count)
            }
        };

        self.sampler.validate_subset(&probes, timeout).await;
    }

    pub fn sample(&self) -> View {
        self.sampler.sample()
    }

    /// Stop taking part in the protocol. Clears view and sample for good.
    pub fn deactivate(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        self.view.store(Arc::new(View::new()));
        self.sampler.clear();
        info!("{}: deactivated", self.self_node);
    }

    /// A fresh generator for one operation, so no lock is held across it.
    fn fork_rng(&self) -> StdRng {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        StdRng::from_rng(&mut *rng)
    }
}

impl Inbound for Core {
    fn receive_node(&self, node: Node) {
        Core::receive_node(self, node);
    }

    fn read_view(&self) -> View {
        Core::read_view(self)
    }

    fn is_active(&self) -> bool {
        Core::is_active(self)
    }
}
