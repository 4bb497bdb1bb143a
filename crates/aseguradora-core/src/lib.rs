//! Aseguradora Core
//!
//! Types, schema validation, and error handling shared across the
//! Aseguradora policy service.
//!
//! This crate provides:
//! - The [`Policy`] record and its [`InsuranceType`] enum
//! - Write-time validation of request bodies into [`NewPolicy`] / [`PolicyPatch`]
//! - The [`Error`] type used by the storage engines and the HTTP layer

pub mod error;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use schema::{FieldError, PolicyInput, ValidationError};
pub use types::{InsuranceType, NewPolicy, Policy, PolicyPatch};

