//! Quay Configuration Module
//!
//! This module provides configuration types for a Quay server process and the
//! applications it hosts. Each servant endpoint is carried by one network
//! adapter, and every adapter is described by an [`AdapterConfig`] entry keyed
//! by servant name inside a [`ServerConfig`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Default number of worker tasks an adapter dedicates to one servant.
pub const DEFAULT_ADAPTER_THREADS: usize = 4;

/// Default ceiling on concurrent connections per adapter.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Default request queue capacity per adapter.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default queue timeout in milliseconds.
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 5_000;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field was missing or structurally invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Network adapter configuration for a single servant endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Name of the servant this adapter carries traffic for.
    pub servant: String,
    /// Socket address the adapter binds.
    pub bind: SocketAddr,
    /// Worker tasks dedicated to this endpoint.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Ceiling on concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Pending request queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Time a request may wait in the queue before being dropped.
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
}

fn default_threads() -> usize {
    DEFAULT_ADAPTER_THREADS
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_queue_timeout_ms() -> u64 {
    DEFAULT_QUEUE_TIMEOUT_MS
}

impl AdapterConfig {
    /// Creates an adapter configuration with default sizing.
    pub fn new(servant: impl Into<String>, bind: SocketAddr) -> Self {
        Self {
            servant: servant.into(),
            bind,
            threads: DEFAULT_ADAPTER_THREADS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queue_timeout_ms: DEFAULT_QUEUE_TIMEOUT_MS,
        }
    }

    /// Checks structural validity of this entry.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.servant.is_empty() {
            return Err(ConfigError::Invalid(
                "adapter entry with empty servant name".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(ConfigError::Invalid(format!(
                "adapter '{}' declares zero worker threads",
                self.servant
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(format!(
                "adapter '{}' declares a zero connection ceiling",
                self.servant
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (threads={}, max_conns={})",
            self.servant, self.bind, self.threads, self.max_connections
        )
    }
}

/// Configuration of one hosted application's server side.
///
/// Injected into the application container at construction; there is no
/// process-global configuration lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Application name. May be empty for the default application.
    #[serde(default)]
    pub application: String,
    /// Server instance name inside the application.
    #[serde(default)]
    pub server_name: String,
    /// Adapter entries keyed by servant name.
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,
}

impl ServerConfig {
    /// Creates an empty server configuration for the named application.
    pub fn new(application: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            server_name: server_name.into(),
            adapters: HashMap::new(),
        }
    }

    /// Adds an adapter entry, keyed by its servant name.
    pub fn with_adapter(mut self, config: AdapterConfig) -> Self {
        self.adapters.insert(config.servant.clone(), config);
        self
    }

    /// Looks up the adapter configuration for a servant, if declared.
    pub fn adapter_config(&self, servant: &str) -> Option<&AdapterConfig> {
        self.adapters.get(servant)
    }

    /// Validates every adapter entry and the key/servant pairing.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, adapter) in &self.adapters {
            adapter.validate()?;
            if name != &adapter.servant {
                return Err(ConfigError::Invalid(format!(
                    "adapter entry '{}' declares mismatched servant '{}'",
                    name, adapter.servant
                )));
            }
        }
        Ok(())
    }
}
