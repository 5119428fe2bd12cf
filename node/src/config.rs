//! Host configuration: which applications to boot and which servant
//! endpoints each one declares.

use anyhow::{Context, Result};
use quay_config::{AdapterConfig, ServerConfig};
use quay_core::ADMIN_SERVANT_NAME;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    /// Applications hosted by this process.
    #[serde(rename = "application", default)]
    pub applications: Vec<AppBootConfig>,
}

/// Boot declaration of one hosted application.
#[derive(Debug, Clone, Deserialize)]
pub struct AppBootConfig {
    /// Application name.
    pub name: String,
    /// Optional bind address for the built-in admin servant. Without it the
    /// application starts degraded, without an admin endpoint.
    #[serde(default)]
    pub admin_bind: Option<SocketAddr>,
    /// Servant adapter declarations.
    #[serde(rename = "adapter", default)]
    pub adapters: Vec<AdapterConfig>,
}

impl AppBootConfig {
    /// Names of the declared servants, admin excluded.
    pub fn servant_names(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|adapter| adapter.servant.clone())
            .filter(|name| name != ADMIN_SERVANT_NAME)
            .collect()
    }

    /// Builds the server configuration injected into the container.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::new(&self.name, format!("{}-server", self.name));
        for adapter in &self.adapters {
            config = config.with_adapter(adapter.clone());
        }
        if let Some(bind) = self.admin_bind {
            config = config.with_adapter(AdapterConfig::new(ADMIN_SERVANT_NAME, bind));
        }
        config
            .validate()
            .with_context(|| format!("invalid configuration for application '{}'", self.name))?;
        Ok(config)
    }
}

impl NodeConfig {
    /// Loads and parses the host configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: NodeConfig = toml::from_str(&raw)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [[application]]
        name = "demo"
        admin_bind = "127.0.0.1:9190"

        [[application.adapter]]
        servant = "echo"
        bind = "127.0.0.1:9100"
        threads = 2

        [[application]]
        name = "bare"
    "#;

    #[test]
    fn parses_multi_application_config() {
        let config: NodeConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.applications.len(), 2);

        let demo = &config.applications[0];
        assert_eq!(demo.name, "demo");
        assert_eq!(demo.servant_names(), vec!["echo"]);

        let server = demo.server_config().unwrap();
        assert!(server.adapter_config("echo").is_some());
        assert!(server.adapter_config(ADMIN_SERVANT_NAME).is_some());

        let bare = &config.applications[1];
        assert!(bare.servant_names().is_empty());
        assert!(bare
            .server_config()
            .unwrap()
            .adapter_config(ADMIN_SERVANT_NAME)
            .is_none());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.applications.len(), 2);
    }
}
