//! Inbound side: serves the protocol endpoints of one local node.
//!
//! | path     | body               | answer                  |
//! |----------|--------------------|-------------------------|
//! | `/push`  | `{ip, port}`       | 200, or 400 if garbled  |
//! | `/pull`  | none               | `[{ip, port}, ...]`     |
//! | `/probe` | none               | `{active}`              |
//! | `/emit`  | `{data: base64}`   | 200, 400 or 429         |
//!
//! Everything else is a 404.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use brahms::{Inbound, Node};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tower_http::trace::TraceLayer;

use crate::messages::{EmitRequest, ProbeResponse, pull_response};

/// Shared handler state
struct HandlerState {
    inbound: Arc<dyn Inbound>,
    messages: mpsc::Sender<Vec<u8>>,
    receive_timeout: Duration,
}

/// Build the router for `inbound`.
///
/// Emitted payloads are buffered up to `buffer` messages (at least one) and
/// come out of the returned receiver. An emit waits at most `receive_timeout`
/// for room in the buffer before giving up with 429.
pub fn router(
    inbound: Arc<dyn Inbound>,
    buffer: usize,
    receive_timeout: Duration,
) -> (Router, mpsc::Receiver<Vec<u8>>) {
    let (messages, rx) = mpsc::channel(buffer.max(1));
    let state = Arc::new(HandlerState {
        inbound,
        messages,
        receive_timeout,
    });

    let router = Router::new()
        .route("/push", post(push))
        .route("/pull", post(pull))
        .route("/probe", post(probe))
        .route("/emit", post(emit))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    (router, rx)
}

async fn push(State(state): State<Arc<HandlerState>>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Node>(&body) {
        Ok(node) => {
            state.inbound.receive_node(node);
            StatusCode::OK
        }
        Err(err) => {
            tracing::debug!("Rejected push: {err}");
            StatusCode::BAD_REQUEST
        }
    }
}

async fn pull(State(state): State<Arc<HandlerState>>) -> Json<Vec<Node>> {
    Json(pull_response(&state.inbound.read_view()))
}

async fn probe(State(state): State<Arc<HandlerState>>) -> Json<ProbeResponse> {
    Json(ProbeResponse {
        active: state.inbound.is_active(),
    })
}

async fn emit(State(state): State<Arc<HandlerState>>, body: Bytes) -> Response {
    let data = match serde_json::from_slice::<EmitRequest>(&body)
        .map_err(|err| err.to_string())
        .and_then(|req| req.decode().map_err(|err| err.to_string()))
    {
        Ok(data) if !data.is_empty() => data,
        Ok(_) => return (StatusCode::BAD_REQUEST, "Empty message").into_response(),
        Err(err) => {
            tracing::debug!("Rejected emit: {err}");
            return (StatusCode::BAD_REQUEST, "Invalid message").into_response();
        }
    };

    match state
        .messages
        .send_timeout(data, state.receive_timeout)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(SendTimeoutError::Timeout(_)) => {
            tracing::warn!("Message buffer full, rejecting emit");
            StatusCode::TOO_MANY_REQUESTS.into_response()
        }
        Err(SendTimeoutError::Closed(_)) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use brahms::View;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct MockInbound {
        inactive: AtomicBool,
        pushes: Mutex<Vec<Node>>,
    }

    impl Inbound for MockInbound {
        fn receive_node(&self, node: Node) {
            self.pushes.lock().unwrap().push(node);
        }

        fn read_view(&self) -> View {
            View::from_nodes(&[Node::new([127, 0, 0, 1], 8080)])
        }

        fn is_active(&self) -> bool {
            !self.inactive.load(Ordering::SeqCst)
        }
    }

    fn request(path: &str, body: &str) -> Request<Body> {
        Request::post(path).body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn setup() -> (Arc<MockInbound>, Router, mpsc::Receiver<Vec<u8>>) {
        let inbound = Arc::new(MockInbound::default());
        let (router, rx) = super::router(inbound.clone(), 1, Duration::from_millis(100));
        (inbound, router, rx)
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (_, router, _rx) = setup();

        let response = router.oneshot(request("/", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_probe() {
        let (inbound, router, _rx) = setup();

        let response = router.clone().oneshot(request("/probe", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let probe: ProbeResponse = body_json(response).await;
        assert!(probe.active);

        inbound.inactive.store(true, Ordering::SeqCst);
        let response = router.oneshot(request("/probe", "")).await.unwrap();
        let probe: ProbeResponse = body_json(response).await;
        assert!(!probe.active);
    }

    #[tokio::test]
    async fn test_push() {
        let (inbound, router, _rx) = setup();

        let response = router.clone().oneshot(request("/push", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(inbound.pushes.lock().unwrap().is_empty());

        let response = router
            .oneshot(request("/push", r#"{"ip": "127.0.0.1", "port": 11000}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *inbound.pushes.lock().unwrap(),
            vec![Node::new([127, 0, 0, 1], 11000)]
        );
    }

    #[tokio::test]
    async fn test_pull() {
        let (_, router, _rx) = setup();

        let response = router.oneshot(request("/pull", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let nodes: Vec<Node> = body_json(response).await;
        assert_eq!(nodes, vec![Node::new([127, 0, 0, 1], 8080)]);
    }

    #[tokio::test]
    async fn test_emit_rejects_empty_and_garbage() {
        let (_, router, _rx) = setup();

        for body in ["", r#"{"data": ""}"#, r#"{"data": "%%%"}"#] {
            let response = router.clone().oneshot(request("/emit", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_emit_is_buffered() {
        let (_, router, mut rx) = setup();
        let body = serde_json::to_string(&EmitRequest::new(b"foo")).unwrap();

        let response = router.clone().oneshot(request("/emit", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // nobody is reading and the buffer is full
        let response = router.clone().oneshot(request("/emit", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        assert_eq!(rx.recv().await.unwrap(), b"foo");
        let response = router.oneshot(request("/emit", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap(), b"foo");
    }
}
