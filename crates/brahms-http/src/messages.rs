//! Request and response bodies. Everything travels as JSON.
//!
//! A push body is a single [`Node`] (`{"ip": "...", "port": n}`) and a pull
//! answer is a list of them, so neither needs its own type.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use brahms::{Node, View};
use serde::{Deserialize, Serialize};

/// Answer to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub active: bool,
}

/// Application payload sent to a peer, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitRequest {
    pub data: String,
}

impl EmitRequest {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(data),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Nodes of a view in the order they go over the wire.
pub fn pull_response(view: &View) -> Vec<Node> {
    view.sorted()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_request_shape() {
        let req = EmitRequest::new(b"foo");
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"data":"Zm9v"}"#);
        assert_eq!(req.decode().unwrap(), b"foo");
    }

    #[test]
    fn test_emit_request_rejects_garbage() {
        let req = EmitRequest {
            data: "not base64!".to_string(),
        };
        assert!(req.decode().is_err());
    }

    #[test]
    fn test_pull_response_shape() {
        let view = View::from_nodes(&[Node::new([127, 0, 0, 1], 8080)]);
        let json = serde_json::to_string(&pull_response(&view)).unwrap();
        assert_eq!(json, r#"[{"ip":"127.0.0.1","port":8080}]"#);
    }
}
