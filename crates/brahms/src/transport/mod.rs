//! Transport capabilities the gossip core depends on.
//!
//! The core never talks to the network directly. A [`Transport`] carries
//! pushes, pulls and probes to other nodes; [`Inbound`] is what a transport
//! calls on the local node when a remote request arrives.
//!
//! Implementations:
//! - [`MemNetTransport`]: in-process dispatch between cores (tests, simulations)
//! - [`MockTransport`]: scripted peers for unit tests
//! - `brahms-http`: JSON over HTTP
//!
//! Failures are never reported as errors here. A peer that doesn't answer in
//! time simply contributes nothing; the next round corrects for it.

use crate::node::Node;
use crate::view::View;
use async_trait::async_trait;

mod mem;
mod mock;

pub use mem::MemNetTransport;
pub use mock::MockTransport;

/// Checks whether peers are still online.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns true iff `node` answered that it is still active.
    async fn probe(&self, node: &Node) -> bool;
}

/// How a node communicates with its peers.
#[async_trait]
pub trait Transport: Prober {
    /// Announce `self_node` to `to`. Best effort, no outcome is observed.
    async fn push(&self, self_node: &Node, to: &Node);

    /// Request the view of `from`. `None` if it didn't answer.
    async fn pull(&self, from: &Node) -> Option<View>;
}

/// The local node as seen by a transport serving remote requests.
pub trait Inbound: Send + Sync {
    /// A remote peer pushed its info to us.
    fn receive_node(&self, node: Node);

    /// A remote peer pulls our view.
    fn read_view(&self) -> View;

    /// A remote peer probes whether we are still up.
    fn is_active(&self) -> bool;
}
