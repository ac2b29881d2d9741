//! One push-pull gossip round.

use crate::node::{Nid, Node};
use crate::params::Params;
use crate::sampler::Sampler;
use crate::transport::Transport;
use crate::view::View;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

/// Everything a round reads besides the pending pushes and the prior view.
pub struct Round<'a> {
    pub self_node: Node,
    pub params: &'a Params,
    pub sampler: &'a Sampler,
    pub transport: &'a Arc<dyn Transport>,
}

impl Round<'_> {
    /// Run a round over the prior `view` and return the view that follows it.
    ///
    /// The round always lasts `timeout`: pushes and pulls are sent out
    /// concurrently and whatever hasn't finished by then is cancelled. Pushes
    /// received in the meantime are taken from `pushes`.
    ///
    /// The prior view is kept when more pushes arrived than the push count
    /// (someone is flooding us), or when the replace policy rejects the
    /// round's yield. The sampler sees every pushed and pulled node either way.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        timeout: Duration,
        pushes: &mut mpsc::Receiver<Node>,
        view: &View,
    ) -> View {
        let self_id = self.self_node.id();
        let push_targets = view.pick(rng, self.params.push_count());
        let pull_targets = view.pick(rng, self.params.pull_count());

        let (pull_tx, mut pull_rx) = mpsc::channel(pull_targets.len().max(1));
        let mut tasks = JoinSet::new();

        for target in push_targets.iter().copied() {
            let transport = Arc::clone(self.transport);
            let self_node = self.self_node;
            tasks.spawn(async move {
                transport.push(&self_node, &target).await;
            });
        }

        for target in pull_targets.iter().copied() {
            let transport = Arc::clone(self.transport);
            let pull_tx = pull_tx.clone();
            tasks.spawn(async move {
                if let Some(pulled) = transport.pull(&target).await {
                    let _ = pull_tx.send(pulled).await;
                }
            });
        }
        drop(pull_tx);

        tokio::time::sleep(timeout).await;
        tasks.abort_all();

        let mut pushed = View::new();
        while let Ok(node) = pushes.try_recv() {
            if node.id() != self_id {
                pushed.insert(node);
            }
        }

        let mut pulled = View::new();
        while let Ok(answer) = pull_rx.try_recv() {
            pulled.extend(
                answer
                    .into_iter()
                    .filter(|node| self.accept_pulled(&self_id, node)),
            );
        }

        let flooded = pushed.len() > self.params.push_count();
        let accepted = self
            .params
            .replace_policy()
            .accepts(pushed.len(), pulled.len());

        let next = if !flooded && accepted {
            let fill = self.sampler.sample().pick(rng, self.params.fill_count());
            pushed.pick(rng, self.params.push_count()).concat([
                &pulled.pick(rng, self.params.pull_count()),
                &fill,
            ])
        } else {
            view.clone()
        };

        debug!(
            "{}: round pushed to {}, pulled from {}, got {} push(es) and {} pulled node(s), view {}",
            self.self_node,
            push_targets.len(),
            pull_targets.len(),
            pushed.len(),
            pulled.len(),
            if flooded {
                "kept (too many pushes)"
            } else if accepted {
                "replaced"
            } else {
                "kept"
            }
        );

        self.sampler.update(&pushed.concat([&pulled]));
        next
    }

    fn accept_pulled(&self, self_id: &Nid, node: &Node) -> bool {
        let id = node.id();
        id != *self_id && !self.sampler.recently_invalidated(&id)
    }
}
