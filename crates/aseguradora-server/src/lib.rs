//! Aseguradora Server
//!
//! HTTP API exposing create, list, get, update and delete for insurance
//! policies, mounted under a configurable base path (default `/api/policies`).

pub mod cli;
pub mod config;
pub mod error;
pub mod policies;
pub mod routes;
pub mod state;

pub use cli::{Cli, LogFormat};
pub use config::{CorsConfig, ServerConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
