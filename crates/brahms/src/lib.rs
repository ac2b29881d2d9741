//! brahms: gossip-based peer sampling.
//!
//! Each node keeps a small view of other live nodes and refreshes it in
//! push-pull gossip rounds. This crate provides:
//! - Node identity and views ([`Node`], [`Nid`], [`View`])
//! - Parameter derivation ([`Params`])
//! - The frequency-unbiased sampler and its liveness validation ([`Sampler`])
//! - The round algorithm ([`Round`]) and the per-node state machine ([`Core`])
//! - The [`Transport`] abstraction with in-memory and mock providers

pub mod engine;
pub mod node;
pub mod params;
pub mod round;
pub mod sampler;
pub mod transport;
pub mod view;

pub use engine::Core;
pub use node::{Nid, Node, NodeParseError};
pub use params::{Params, ParamsError, ReplacePolicy};
pub use round::Round;
pub use sampler::Sampler;
pub use transport::{Inbound, MemNetTransport, MockTransport, Prober, Transport};
pub use view::View;
