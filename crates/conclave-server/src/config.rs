use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use conclave_core::Settings;
use conclave_store::AtomicPolicy;
use conclave_tasks::RetryPolicy;

use crate::error::{ServerError, ServerResult};

/// Server configuration, usually loaded from a TOML file.
///
/// Every field has a default, so a file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub announcement_ttl_secs: u64,
    /// Attempts per atomic unit before a sale reports failure.
    pub transaction_attempts: u32,
    /// Capacity of the push task channel.
    pub task_channel_capacity: usize,
    /// Dispatches per push task before it is dropped, the first included.
    pub task_max_attempts: u32,
    pub task_retry_delay_ms: u64,
    /// `From` address of notification mail.
    pub sender: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            log_level: "info".into(),
            announcement_ttl_secs: 3600,
            transaction_attempts: 3,
            task_channel_capacity: 1024,
            task_max_attempts: 3,
            task_retry_delay_ms: 1000,
            sender: "noreply@conclave.local".into(),
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.transaction_attempts == 0 {
            return Err(ServerError::Config(
                "transaction_attempts must be at least 1".into(),
            ));
        }
        if self.task_channel_capacity == 0 {
            return Err(ServerError::Config(
                "task_channel_capacity must be at least 1".into(),
            ));
        }
        if self.task_max_attempts == 0 {
            return Err(ServerError::Config(
                "task_max_attempts must be at least 1".into(),
            ));
        }
        if self.sender.trim().is_empty() {
            return Err(ServerError::Config("sender must not be empty".into()));
        }
        Ok(())
    }

    /// Service settings derived from this configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            policy: AtomicPolicy::with_attempts(self.transaction_attempts),
            announcement_ttl: Duration::from_secs(self.announcement_ttl_secs),
            sender: self.sender.clone(),
            task_retry: RetryPolicy {
                max_attempts: self.task_max_attempts,
                delay: Duration::from_millis(self.task_retry_delay_ms),
            },
        }
    }
}
