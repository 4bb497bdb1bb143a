//! Server configuration

use aseguradora_core::Error;
use aseguradora_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::cli::Cli;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL prefix the policy routes are mounted under
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Storage engine
    #[serde(default)]
    pub storage: StoreConfig,

    /// Cross-origin access for browser clients
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(&cli.config).exists() {
            let content = std::fs::read_to_string(&cli.config)?;
            Self::from_yaml(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(url) = &cli.storage_url {
            config.storage.url = url.clone();
        }

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reject settings the router cannot be built from
    pub fn validate(&self) -> Result<(), Error> {
        if !self.base_path.starts_with('/') || self.base_path.len() < 2 {
            return Err(Error::config(format!(
                "base_path must start with '/' and name a segment, got '{}'",
                self.base_path
            )));
        }
        if self.base_path.ends_with('/') {
            return Err(Error::config(format!(
                "base_path must not end with '/', got '{}'",
                self.base_path
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::config("max_body_bytes must be greater than zero"));
        }
        Ok(())
    }

    /// Storage URL with any credentials masked, for logging
    pub fn redacted_storage_url(&self) -> String {
        let url = &self.storage.url;
        match (url.split_once("://"), url.rfind('@')) {
            (Some((scheme, _)), Some(at)) => format!("{}://***{}", scheme, &url[at..]),
            _ => url.clone(),
        }
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.listen, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            base_path: default_base_path(),
            max_body_bytes: default_max_body_bytes(),
            storage: StoreConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Allow every origin (overrides `allowed_origins`)
    #[serde(default)]
    pub allow_any_origin: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allow_any_origin: false,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_base_path() -> String {
    "/api/policies".to_string()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}
