//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration shared by the chat client and the rendezvous server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub rendezvous: RendezvousConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    /// Prometheus endpoint; disabled when absent.
    pub metrics: Option<MetricsConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// How this participant presents itself in chat payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_display_name")]
    pub name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_display_name(),
        }
    }
}

/// Rendezvous client and server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RendezvousConfig {
    /// `host:port` of the rendezvous server clients connect to.
    #[serde(default = "default_rendezvous_server")]
    pub server: String,
    /// Address the rendezvous server binary listens on.
    #[serde(default = "default_rendezvous_listen")]
    pub listen: SocketAddr,
    /// Host a coordinator binds its peer listener to.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Host advertised to dialers instead of the bound address
    /// (for NAT or wildcard binds).
    #[serde(default)]
    pub advertise_host: Option<String>,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            server: default_rendezvous_server(),
            listen: default_rendezvous_listen(),
            bind_host: default_bind_host(),
            advertise_host: None,
        }
    }
}

/// Peer session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Outbound queue bound; 0 disables the bound.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound for a claim or a dial.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum encoded frame length on links and control connections.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_line_len: default_max_line_len(),
        }
    }
}

/// Chat client settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    /// Room joined at startup unless given on the command line.
    #[serde(default)]
    pub room: Option<String>,
}

/// Prometheus endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub port: u16,
}
