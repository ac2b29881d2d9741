//! Agents gossiping with each other on localhost.

use std::time::Duration;

use brahms::{ParamsError, View};
use brahms_agent::{Agent, AgentConfig, AgentError, ParamsConfig};
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(10);

fn config() -> AgentConfig {
    AgentConfig {
        update_timeout_ms: 50,
        validate_timeout_ms: 50,
        ..AgentConfig::local_test()
    }
}

/// Poll `cond` until it holds or WAIT expires.
async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let polled = timeout(WAIT, async {
        while !cond() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    assert!(polled.is_ok(), "timed out waiting for: {what}");
}

#[tokio::test]
async fn test_two_agents_discover_each_other() {
    let mut a1 = Agent::bind(config()).await.unwrap();
    let mut a2 = Agent::bind(config()).await.unwrap();
    let n1 = a1.self_node();
    let n2 = a2.self_node();

    a1.join(View::new()).unwrap();
    a2.join(View::from_nodes(&[n1])).unwrap();

    eventually("a1 to learn about a2", || a1.view().contains(&n2.id())).await;
    eventually("a1 to sample a2", || a1.sample().contains(&n2.id())).await;
    assert!(a2.view().contains(&n1.id()));
    assert!(a2.sample().contains(&n1.id()));

    assert!(a1.emit(b"hello", 1, 1, Duration::from_secs(1)).await);
    let msg = timeout(WAIT, a2.receive()).await.unwrap().unwrap();
    assert_eq!(msg, b"hello");

    a1.shutdown().await.unwrap();
    a2.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_emit_needs_enough_acks() {
    let mut a1 = Agent::bind(config()).await.unwrap();
    let mut a2 = Agent::bind(config()).await.unwrap();
    let n2 = a2.self_node();

    a2.join(View::new()).unwrap();
    a1.join(View::from_nodes(&[n2])).unwrap();

    // only one peer to emit to
    assert!(!a1.emit(b"hello", 2, 2, Duration::from_secs(1)).await);
    assert!(a1.emit(b"hello", 2, 1, Duration::from_secs(1)).await);

    a1.shutdown().await.unwrap();
    a2.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_is_noticed() {
    let mut a1 = Agent::bind(config()).await.unwrap();
    let mut a2 = Agent::bind(config()).await.unwrap();
    let n1 = a1.self_node();
    let n2 = a2.self_node();

    a1.join(View::from_nodes(&[n2])).unwrap();
    a2.join(View::from_nodes(&[n1])).unwrap();
    assert!(a2.sample().contains(&n1.id()));

    a1.shutdown().await.unwrap();
    assert!(a1.view().is_empty());
    assert!(matches!(a1.receive().await, Err(AgentError::Closed)));
    assert!(!a1.emit(b"hello", 1, 1, Duration::from_millis(100)).await);

    // a1 stops answering probes and falls out of a2's sample
    eventually("a2 to evict a1", || !a2.sample().contains(&n1.id())).await;

    a2.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let mut agent = Agent::bind(config()).await.unwrap();

    assert!(matches!(agent.receive().await, Err(AgentError::NotJoined)));
    assert!(!agent.emit(b"hello", 1, 1, Duration::from_millis(10)).await);
    assert!(agent.view().is_empty());

    agent.join(View::new()).unwrap();
    assert!(matches!(
        agent.join(View::new()),
        Err(AgentError::AlreadyJoined)
    ));

    agent.shutdown().await.unwrap();
    // a second shutdown has nothing left to stop
    agent.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bind_rejects_invalid_params() {
    let config = AgentConfig {
        params: ParamsConfig {
            l1: 1,
            ..ParamsConfig::default()
        },
        ..config()
    };

    let result = Agent::bind(config).await;
    assert!(matches!(
        result,
        Err(AgentError::Params(ParamsError::L1TooSmall))
    ));
}
