use std::net::SocketAddr;
use std::path::PathBuf;

use brahms::ParamsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid protocol parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("Invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Agent hasn't joined a network yet")]
    NotJoined,

    #[error("Agent already joined a network")]
    AlreadyJoined,

    #[error("Agent is shut down")]
    Closed,

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}
