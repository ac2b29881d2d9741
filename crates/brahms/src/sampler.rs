//! Frequency-unbiased node sampler.
//!
//! The gossip round observes popular nodes far more often than others. A cache
//! of recently or frequently seen nodes would be biased towards them, so the
//! sampler uses min-wise sampling instead:
//!
//! 1. Every slot owns a random SipHash key, i.e. its own pseudo-random order
//!    over all identities
//! 2. A slot keeps the node with the smallest rank it has ever seen
//! 3. Seeing a node again doesn't change its rank, so repetitions don't matter
//!
//! Each slot therefore holds a uniform pick among the *distinct* nodes seen.
//! Slots are validated by probing their nodes; nodes that don't answer are
//! evicted and remembered for a while so the round doesn't re-admit them
//! straight from a stale pull.

use crate::node::{Nid, Node};
use crate::transport::Prober;
use crate::view::View;
use rand::Rng;
use siphasher::sip::SipHasher13;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;

/// Node held by a slot together with its rank under the slot's key.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    rank: u64,
    node: Node,
}

struct SamplerState {
    /// One entry per key, `None` while the slot is empty
    slots: Vec<Option<Ranked>>,
    /// Nodes evicted by a failed probe and when that happened
    invalidated: HashMap<Nid, Instant>,
}

/// Holds a sample of a node stream that is not biased by the number of times
/// a node appears in the stream.
pub struct Sampler {
    keys: Vec<(u64, u64)>,
    state: RwLock<SamplerState>,
    prober: Arc<dyn Prober>,
    invalidation: Duration,
}

impl Sampler {
    /// Create a sampler with `size` slots, keyed from `rng`.
    ///
    /// Evicted nodes count as recently invalidated for `invalidation`.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        size: usize,
        prober: Arc<dyn Prober>,
        invalidation: Duration,
    ) -> Self {
        let keys = (0..size).map(|_| (rng.random(), rng.random())).collect();

        Self {
            keys,
            state: RwLock::new(SamplerState {
                slots: vec![None; size],
                invalidated: HashMap::new(),
            }),
            prober,
            invalidation,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Number of slots currently holding a node.
    pub fn len(&self) -> usize {
        self.read().slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feed observed nodes into the sampler.
    pub fn update(&self, view: &View) {
        let mut state = self.write();

        for node in view {
            let id = node.id();
            for (key, slot) in self.keys.iter().zip(state.slots.iter_mut()) {
                let rank = rank(*key, &id);
                match slot {
                    // ties keep the first writer
                    Some(held) if held.rank <= rank => {}
                    _ => *slot = Some(Ranked { rank, node: *node }),
                }
            }
        }
    }

    /// The current sample. Slots may share a node, so this holds at most
    /// `capacity()` distinct nodes.
    pub fn sample(&self) -> View {
        self.read().slots.iter().flatten().map(|held| held.node).collect()
    }

    /// Empty all slots. Invalidations are kept.
    pub fn clear(&self) {
        for slot in self.write().slots.iter_mut() {
            *slot = None;
        }
    }

    /// Whether `id` failed a probe less than the invalidation duration ago.
    pub fn recently_invalidated(&self, id: &Nid) -> bool {
        self.read()
            .invalidated
            .get(id)
            .is_some_and(|at| at.elapsed() < self.invalidation)
    }

    /// Probe every sampled node and evict the ones that don't answer within
    /// `timeout`.
    pub async fn validate(&self, timeout: Duration) {
        let probes = self.sample();
        self.validate_subset(&probes, timeout).await;
    }

    /// Probe `probes` and evict those that don't answer within `timeout`.
    ///
    /// The full `timeout` always elapses; probes still running afterwards are
    /// cancelled. Slots holding nodes outside `probes` are left alone.
    pub async fn validate_subset(&self, probes: &View, timeout: Duration) {
        self.prune_invalidated();
        if probes.is_empty() {
            return;
        }

        let (tx, mut rx) = mpsc::channel(probes.len());
        let mut tasks = JoinSet::new();
        for node in probes.iter().copied() {
            let prober = Arc::clone(&self.prober);
            let tx = tx.clone();
            tasks.spawn(async move {
                if prober.probe(&node).await {
                    let _ = tx.send(node.id()).await;
                }
            });
        }
        drop(tx);

        tokio::time::sleep(timeout).await;
        tasks.abort_all();

        let mut alive = HashSet::new();
        while let Ok(id) = rx.try_recv() {
            alive.insert(id);
        }

        let now = Instant::now();
        let mut state = self.write();
        let SamplerState { slots, invalidated } = &mut *state;

        let mut evicted = 0;
        for slot in slots.iter_mut() {
            let Some(held) = slot else { continue };

            let id = held.node.id();
            if !probes.contains(&id) || alive.contains(&id) {
                continue;
            }

            invalidated.insert(id, now);
            *slot = None;
            evicted += 1;
        }

        debug!(
            "Validated {} sampled node(s): {} alive, {} slot(s) evicted",
            probes.len(),
            alive.len(),
            evicted
        );
    }

    fn prune_invalidated(&self) {
        let now = Instant::now();
        let invalidation = self.invalidation;
        self.write()
            .invalidated
            .retain(|_, at| now.saturating_duration_since(*at) < invalidation);
    }

    fn read(&self) -> RwLockReadGuard<'_, SamplerState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SamplerState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Rank of `id` in the order defined by `key`.
fn rank((k0, k1): (u64, u64), id: &Nid) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(k0, k1);
    hasher.write(id.as_bytes());
    hasher.finish()
}
