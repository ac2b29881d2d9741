//! brahms-http: JSON over HTTP for brahms peer sampling.
//!
//! - [`router`]: axum router serving `/push`, `/pull`, `/probe` and `/emit`
//!   for one local node
//! - [`HttpTransport`]: reqwest client implementing [`brahms::Transport`]

pub mod error;
pub mod handler;
pub mod messages;
pub mod transport;

pub use error::TransportError;
pub use handler::router;
pub use messages::{EmitRequest, ProbeResponse};
pub use transport::HttpTransport;
