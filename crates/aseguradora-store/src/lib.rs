//! Aseguradora Store
//!
//! Storage engines for policy records. Every engine implements
//! [`PolicyStore`], whose operations map one-to-one onto the HTTP API:
//! each call touches at most one document and is atomic for that document.
//!
//! Engines are selected by URL through [`open`]:
//! - `memory://` keeps records in process memory
//! - `redis://` / `rediss://` stores each policy as a Redis hash

use aseguradora_core::{Error, NewPolicy, Policy, PolicyPatch, Result};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Persistence operations for policy records
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a new policy, assigning its identifier and timestamps.
    ///
    /// Fails with [`Error::Duplicate`] when the policy number is taken.
    async fn create(&self, fields: NewPolicy) -> Result<Policy>;

    /// All policies in creation order
    async fn list(&self) -> Result<Vec<Policy>>;

    /// Look up a policy by identifier
    async fn get(&self, id: &str) -> Result<Option<Policy>>;

    /// Merge the supplied fields into an existing policy.
    ///
    /// Returns `Ok(None)` when no policy has this identifier.
    async fn update(&self, id: &str, patch: PolicyPatch) -> Result<Option<Policy>>;

    /// Remove a policy, returning the record as it was before deletion
    async fn delete(&self, id: &str) -> Result<Option<Policy>>;

    /// Check that the engine is reachable
    async fn ping(&self) -> Result<()>;

    /// Short engine name for logs and health output
    fn name(&self) -> &str;
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URL (`memory://`, `redis://host:port/db`)
    #[serde(default = "default_url")]
    pub url: String,

    /// Key prefix for engines that share a keyspace
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            namespace: default_namespace(),
        }
    }
}

fn default_url() -> String {
    "memory://".to_string()
}

fn default_namespace() -> String {
    "aseguradora".to_string()
}

/// Open the storage engine named by `config.url`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn PolicyStore>> {
    let scheme = config
        .url
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .unwrap_or(config.url.as_str());

    match scheme {
        "memory" => {
            info!("Using in-memory policy store");
            Ok(Arc::new(MemoryStore::new()))
        }
        "redis" | "rediss" => {
            let store = RedisStore::connect(&config.url, &config.namespace).await?;
            Ok(Arc::new(store))
        }
        other => Err(Error::config(format!(
            "unsupported storage url scheme '{}'",
            other
        ))),
    }
}

/// Generate a new policy identifier (UUID v4, hex form)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current time at the millisecond precision every engine persists
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_hex() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = open(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.name(), "memory");
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_scheme() {
        let config = StoreConfig {
            url: "mongodb://localhost:27017".to_string(),
            ..Default::default()
        };
        let err = open(&config).await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_redis_url() {
        let config = StoreConfig {
            url: "redis://[::1".to_string(),
            ..Default::default()
        };
        assert!(open(&config).await.is_err());
    }
}
