//! Outbound side: reaches peers' handlers with an HTTP client.

use async_trait::async_trait;
use brahms::{Node, Prober, Transport, View};
use reqwest::{Client, RequestBuilder, Response};

use crate::error::TransportError;
use crate::messages::{EmitRequest, ProbeResponse};

/// [`Transport`] over HTTP.
///
/// Failed gossip requests are logged at debug level and count as silence.
/// Requests have no timeout of their own; the caller cancels them by
/// dropping the future.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Hand an application message to `to`.
    pub async fn emit(&self, to: &Node, data: &[u8]) -> Result<(), TransportError> {
        self.send(self.post(to, "/emit").json(&EmitRequest::new(data)))
            .await?;
        Ok(())
    }

    async fn probe_active(&self, node: &Node) -> Result<bool, TransportError> {
        let response = self.send(self.post(node, "/probe")).await?;
        let probe: ProbeResponse = response.json().await.map_err(TransportError::Decode)?;
        Ok(probe.active)
    }

    async fn pull_view(&self, from: &Node) -> Result<View, TransportError> {
        let response = self.send(self.post(from, "/pull")).await?;
        let nodes: Vec<Node> = response.json().await.map_err(TransportError::Decode)?;
        Ok(nodes.into_iter().collect())
    }

    fn post(&self, to: &Node, path: &str) -> RequestBuilder {
        self.client
            .post(format!("http://{}{}", to.socket_addr(), path))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await.map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        Ok(response)
    }
}

#[async_trait]
impl Prober for HttpTransport {
    async fn probe(&self, node: &Node) -> bool {
        match self.probe_active(node).await {
            Ok(active) => active,
            Err(err) => {
                tracing::debug!("Probe of {node} failed: {err}");
                false
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn push(&self, self_node: &Node, to: &Node) {
        if let Err(err) = self.send(self.post(to, "/push").json(self_node)).await {
            tracing::debug!("Push to {to} failed: {err}");
        }
    }

    async fn pull(&self, from: &Node) -> Option<View> {
        match self.pull_view(from).await {
            Ok(view) => Some(view),
            Err(err) => {
                tracing::debug!("Pull from {from} failed: {err}");
                None
            }
        }
    }
}
