//! Error types for Aseguradora

use crate::schema::ValidationError;

/// Result type alias using Aseguradora's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by the schema and the storage engines
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write was rejected by the policy schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A unique field collided with an existing record
    #[error("{0}")]
    Duplicate(String),

    /// No record exists for the given identifier
    #[error("{0}")]
    NotFound(String),

    /// Storage engine unreachable or failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a duplicate-key error for a policy number
    pub fn duplicate_policy_number(policy_number: &str) -> Self {
        Self::Duplicate(format!(
            "policy number '{}' already exists",
            policy_number
        ))
    }

    /// Create a not-found error for a policy identifier
    pub fn policy_not_found(id: &str) -> Self {
        Self::NotFound(format!("policy '{}' not found", id))
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the caller caused this error (bad input or unknown record)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Duplicate(_) | Self::NotFound(_)
        )
    }
}
