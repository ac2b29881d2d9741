//! A node taking part in a brahms network over HTTP.
//!
//! Lifecycle: [`Agent::bind`] claims the listener, [`Agent::join`] starts
//! serving and gossiping from an initial view, [`Agent::shutdown`] leaves.
//! In between, [`Agent::emit`] and [`Agent::receive`] carry application
//! messages between sampled peers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use brahms::{Core, Node, Params, View};
use brahms_http::HttpTransport;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;

/// How long a shutdown waits for open HTTP connections to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct Agent {
    config: AgentConfig,
    params: Params,
    self_node: Node,
    transport: Arc<HttpTransport>,
    listener: Option<TcpListener>,
    joined: Option<Joined>,
}

/// State that exists once the agent joined a network.
struct Joined {
    core: Arc<Core>,
    messages: tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Option<Tasks>>,
}

struct Tasks {
    protocol: JoinHandle<()>,
    server: JoinHandle<std::io::Result<()>>,
}

impl Agent {
    /// Validate the parameters and bind the listener.
    pub async fn bind(config: AgentConfig) -> Result<Self, AgentError> {
        let params = config.params.build()?;

        let addr = config.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AgentError::Listen { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| AgentError::Listen { addr, source })?;

        let self_node = Node::new(
            config.advertise_addr.unwrap_or(bound.ip()),
            config.advertise_port.unwrap_or(bound.port()),
        );

        info!("Listening on {bound}, advertising as {self_node}");
        Ok(Self {
            config,
            params,
            self_node,
            transport: Arc::new(HttpTransport::new()),
            listener: Some(listener),
            joined: None,
        })
    }

    /// This agent as a node of the network.
    pub fn self_node(&self) -> Node {
        self.self_node
    }

    /// Start serving protocol requests and gossiping, starting from `v0`.
    pub fn join(&mut self, v0: View) -> Result<(), AgentError> {
        let listener = self.listener.take().ok_or(AgentError::AlreadyJoined)?;

        let core = Arc::new(Core::new(
            StdRng::from_os_rng(),
            self.self_node,
            v0,
            self.params,
            self.config.invalidation_timeout(),
            self.transport.clone(),
        ));

        let (router, messages) = brahms_http::router(
            core.clone(),
            self.config.message_buffer,
            self.config.receive_timeout(),
        );
        let (shutdown, _) = watch::channel(false);

        let mut stop = shutdown.subscribe();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.changed().await;
                })
                .await
        });

        let protocol = tokio::spawn(run_protocol(
            core.clone(),
            self.config.update_timeout(),
            self.config.validate_timeout(),
            shutdown.subscribe(),
        ));

        info!("{}: joined", self.self_node);
        self.joined = Some(Joined {
            core,
            messages: tokio::sync::Mutex::new(messages),
            shutdown,
            tasks: Mutex::new(Some(Tasks { protocol, server })),
        });

        Ok(())
    }

    /// Current view, empty before joining.
    pub fn view(&self) -> View {
        self.joined
            .as_ref()
            .map(|joined| joined.core.read_view())
            .unwrap_or_default()
    }

    /// Current sample, empty before joining.
    pub fn sample(&self) -> View {
        self.joined
            .as_ref()
            .map(|joined| joined.core.sample())
            .unwrap_or_default()
    }

    /// Send `msg` to `n` sampled peers. Returns true iff at least `m` of them
    /// accepted it within `timeout`.
    pub async fn emit(&self, msg: &[u8], n: usize, m: usize, timeout: Duration) -> bool {
        let Some(joined) = &self.joined else {
            return false;
        };

        let peers = joined.core.sample().pick(&mut rand::rng(), n);

        let mut tasks = JoinSet::new();
        for peer in peers {
            let transport = self.transport.clone();
            let msg = msg.to_vec();
            tasks.spawn(async move {
                match transport.emit(&peer, &msg).await {
                    Ok(()) => true,
                    Err(err) => {
                        debug!("Emit to {peer} failed: {err}");
                        false
                    }
                }
            });
        }

        let mut oks = 0;
        let collect = async {
            while let Some(result) = tasks.join_next().await {
                if let Ok(true) = result {
                    oks += 1;
                }
            }
        };
        if tokio::time::timeout(timeout, collect).await.is_err() {
            debug!("Emit timed out after {:?}", timeout);
        }

        oks >= m
    }

    /// Wait for the next message emitted to us.
    pub async fn receive(&self) -> Result<Vec<u8>, AgentError> {
        let joined = self.joined.as_ref().ok_or(AgentError::NotJoined)?;

        let mut stop = joined.shutdown.subscribe();
        if *stop.borrow() {
            return Err(AgentError::Closed);
        }

        let mut messages = joined.messages.lock().await;
        tokio::select! {
            msg = messages.recv() => msg.ok_or(AgentError::Closed),
            _ = stop.changed() => Err(AgentError::Closed),
        }
    }

    /// Leave the network: deactivate, stop gossiping and stop serving.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        let Some(joined) = &self.joined else {
            return Ok(());
        };

        joined.core.deactivate();
        joined.shutdown.send_replace(true);

        let tasks = joined
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(Tasks { protocol, server }) = tasks else {
            return Ok(());
        };

        if let Err(err) = protocol.await {
            warn!("Protocol loop ended abnormally: {err}");
        }

        let abort = server.abort_handle();
        match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
            Ok(Ok(result)) => result.map_err(AgentError::Serve)?,
            Ok(Err(err)) => return Err(AgentError::Serve(std::io::Error::other(err))),
            Err(_) => {
                warn!("HTTP connections still open after {:?}, aborting", SHUTDOWN_GRACE);
                abort.abort();
            }
        }

        info!("{}: shut down", self.self_node);
        Ok(())
    }
}

/// Alternate gossip rounds and sample validations until told to stop.
async fn run_protocol(
    core: Arc<Core>,
    update: Duration,
    validate: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = async {
                core.update_view(update).await;
                core.validate_sample(validate).await;
            } => {}
            _ = stop.changed() => break,
        }
    }

    debug!("{}: protocol loop stopped", core.self_node());
}
