//! HTTP transport against live handlers on localhost.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use brahms::{Core, Inbound, Node, Params, Prober, Transport, View};
use brahms_http::{HttpTransport, TransportError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

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

/// Serve `inbound` on an ephemeral port, returns its address and the emitted
/// message receiver.
async fn serve(inbound: Arc<dyn Inbound>, buffer: usize) -> (Node, mpsc::Receiver<Vec<u8>>) {
    let (router, rx) = brahms_http::router(inbound, buffer, Duration::from_millis(50));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (Node::from(addr), rx)
}

#[tokio::test]
async fn test_probe_push_pull() {
    let inbound = Arc::new(MockInbound::default());
    let (node, _rx) = serve(inbound.clone(), 1).await;
    let tr = HttpTransport::new();

    assert!(tr.probe(&node).await);

    tr.push(&Node::new([127, 0, 0, 1], 9090), &node).await;
    assert_eq!(
        *inbound.pushes.lock().unwrap(),
        vec![Node::new([127, 0, 0, 1], 9090)]
    );

    let view = tr.pull(&node).await.unwrap();
    assert_eq!(view, View::from_nodes(&[Node::new([127, 0, 0, 1], 8080)]));

    inbound.inactive.store(true, Ordering::SeqCst);
    assert!(!tr.probe(&node).await);
}

#[tokio::test]
async fn test_unreachable_peer_is_silent() {
    // bind and drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let node = Node::from(listener.local_addr().unwrap());
    drop(listener);

    let tr = HttpTransport::new();
    assert!(!tr.probe(&node).await);
    assert_eq!(tr.pull(&node).await, None);
    tr.push(&Node::new([127, 0, 0, 1], 9090), &node).await;

    let err = tr.emit(&node, b"foo").await.unwrap_err();
    assert!(matches!(err, TransportError::Request(_)), "{err}");
}

#[tokio::test]
async fn test_emit() {
    let (node, mut rx) = serve(Arc::new(MockInbound::default()), 1).await;
    let tr = HttpTransport::new();

    tr.emit(&node, b"hello").await.unwrap();

    // buffer is full, the peer gives up after its receive timeout
    let err = tr.emit(&node, b"again").await.unwrap_err();
    assert!(
        matches!(err, TransportError::Status(StatusCode::TOO_MANY_REQUESTS)),
        "{err}"
    );

    assert_eq!(rx.recv().await.unwrap(), b"hello");

    let err = tr.emit(&node, b"").await.unwrap_err();
    assert!(
        matches!(err, TransportError::Status(StatusCode::BAD_REQUEST)),
        "{err}"
    );
}

#[tokio::test]
async fn test_serves_core() {
    let tr = Arc::new(HttpTransport::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let self_node = Node::from(listener.local_addr().unwrap());
    let peer = Node::new([127, 0, 0, 1], 9);

    let core = Arc::new(Core::new(
        StdRng::seed_from_u64(1),
        self_node,
        View::from_nodes(&[peer]),
        Params::new(0.45, 0.45, 0.1, 10, 10, 2).unwrap(),
        Duration::from_secs(5),
        tr.clone(),
    ));

    let (router, _rx) = brahms_http::router(core.clone(), 1, Duration::from_millis(50));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    assert!(tr.probe(&self_node).await);
    assert_eq!(tr.pull(&self_node).await, Some(View::from_nodes(&[peer])));

    core.deactivate();
    assert!(!tr.probe(&self_node).await);
    assert_eq!(tr.pull(&self_node).await, Some(View::new()));
}
