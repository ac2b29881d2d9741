use reqwest::StatusCode;
use thiserror::Error;

/// Why a request to a peer produced nothing.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Peer answered with status {0}")]
    Status(StatusCode),

    #[error("Failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
}
