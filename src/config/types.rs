//! Core configuration types and loading.

use serde::Deserialize;
use slirc_proto::RegistrationConfig;
use std::net::{IpAddr, SocketAddr};
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

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Upstream IRC server and identity.
    pub irc: IrcConfig,
    /// HTTP side: event delivery and command intake.
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub queues: QueueConfig,
    #[serde(default)]
    pub extensions: ExtensionsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Upstream server and the identity we register with.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub host: String,
    pub port: u16,
    pub nick: String,
    /// The single channel that is bridged.
    pub channel: String,
    /// Defaults to `nick`.
    pub username: Option<String>,
    /// Defaults to `nick`.
    pub realname: Option<String>,
    pub channel_key: Option<String>,
}

impl IrcConfig {
    /// `host:port`, suitable for dialing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Identity handed to the registration state machine.
    pub fn registration(&self) -> RegistrationConfig {
        let mut registration = RegistrationConfig::new(self.nick.as_str(), self.channel.as_str());
        if let Some(ref username) = self.username {
            registration.username = username.clone();
        }
        if let Some(ref realname) = self.realname {
            registration.realname = realname.clone();
        }
        registration.channel_key = self.channel_key.clone();
        registration
    }
}

/// HTTP side of the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Where channel events are POSTed.
    pub event_url: String,
    /// Port of the command intake server.
    pub listen_port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// Upper bound on concurrent event deliveries.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl BridgeConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.listen_port)
    }
}

/// Deadlines, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect: u64,
    /// Whole registration, from first NICK to 001.
    #[serde(default = "default_handshake_timeout")]
    pub handshake: u64,
    /// Longest silence tolerated from the server.
    #[serde(default = "default_read_timeout")]
    pub read: u64,
    #[serde(default = "default_write_timeout")]
    pub write: u64,
    /// Per event callback, response body included.
    #[serde(default = "default_delivery_timeout")]
    pub delivery: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect: default_connect_timeout(),
            handshake: default_handshake_timeout(),
            read: default_read_timeout(),
            write: default_write_timeout(),
            delivery: default_delivery_timeout(),
        }
    }
}

impl TimeoutsConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect)
    }

    pub fn handshake(&self) -> Duration {
        Duration::from_secs(self.handshake)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write)
    }

    pub fn delivery(&self) -> Duration {
        Duration::from_secs(self.delivery)
    }
}

/// Capacity of the inbound and outbound message queues.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

/// Optional channel features.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionsConfig {
    /// Answer `!claim`, `!release` and `!claims` in the channel.
    #[serde(default)]
    pub claims: bool,
}
