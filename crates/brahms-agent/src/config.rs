//! Agent configuration, loadable from YAML.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```yaml
//! listen_port: 9000
//! update_timeout_ms: 1000
//! params:
//!   l1: 20
//!   policy: both_non_empty
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use brahms::{Params, ParamsError, ReplacePolicy};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Address the HTTP listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,

    /// Port the HTTP listener binds to, 0 picks a free one
    #[serde(default)]
    pub listen_port: u16,

    /// Address other nodes reach us on, defaults to the bound address
    #[serde(default)]
    pub advertise_addr: Option<IpAddr>,

    /// Port other nodes reach us on, defaults to the bound port
    #[serde(default)]
    pub advertise_port: Option<u16>,

    /// Time budget of a sample validation
    #[serde(default = "default_validate_timeout_ms")]
    pub validate_timeout_ms: u64,

    /// Time budget of a gossip round
    #[serde(default = "default_update_timeout_ms")]
    pub update_timeout_ms: u64,

    /// How long an evicted node is kept out of pulled views
    #[serde(default = "default_invalidation_timeout_ms")]
    pub invalidation_timeout_ms: u64,

    /// How long an incoming message may wait for room in the buffer
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    /// Incoming messages buffered until `receive` picks them up
    #[serde(default = "default_message_buffer")]
    pub message_buffer: usize,

    #[serde(default)]
    pub params: ParamsConfig,
}

/// Protocol parameters as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub l1: usize,
    pub l2: usize,
    /// Sampled nodes probed per validation, 0 probes all
    pub probes: usize,
    pub policy: ReplacePolicy,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            alpha: 0.45,
            beta: 0.45,
            gamma: 0.1,
            l1: 10,
            l2: 10,
            probes: 2,
            policy: ReplacePolicy::default(),
        }
    }
}

impl ParamsConfig {
    pub fn build(&self) -> Result<Params, ParamsError> {
        Params::new(
            self.alpha, self.beta, self.gamma, self.l1, self.l2, self.probes,
        )
        .map(|params| params.with_replace_policy(self.policy))
    }
}

fn default_listen_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_validate_timeout_ms() -> u64 {
    100
}

fn default_update_timeout_ms() -> u64 {
    200
}

fn default_invalidation_timeout_ms() -> u64 {
    5_000
}

fn default_receive_timeout_ms() -> u64 {
    1_000
}

fn default_message_buffer() -> usize {
    16
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::local_test()
    }
}

impl AgentConfig {
    /// Sensible settings for running a few agents on one machine.
    pub fn local_test() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: 0,
            advertise_addr: None,
            advertise_port: None,
            validate_timeout_ms: default_validate_timeout_ms(),
            update_timeout_ms: default_update_timeout_ms(),
            invalidation_timeout_ms: default_invalidation_timeout_ms(),
            receive_timeout_ms: default_receive_timeout_ms(),
            message_buffer: default_message_buffer(),
            params: ParamsConfig::default(),
        }
    }

    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let invalid = |message: String| AgentError::Config {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config: AgentConfig =
            serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_millis(self.validate_timeout_ms)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }

    pub fn invalidation_timeout(&self) -> Duration {
        Duration::from_millis(self.invalidation_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}
