//! brahms-agent: runs a brahms node as a process.
//!
//! The library side holds the agent and its configuration so integration
//! tests can run several agents in one process.

pub mod agent;
pub mod config;
pub mod error;

pub use agent::Agent;
pub use config::{AgentConfig, ParamsConfig};
pub use error::AgentError;
