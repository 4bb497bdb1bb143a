//! Policy resource handlers
//!
//! Each handler validates its input, performs exactly one storage call and
//! serializes the result.

use aseguradora_core::{Policy, PolicyInput};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Instant;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn create_policy(
    State(state): State<AppState>,
    payload: Result<Json<PolicyInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Policy>), ApiError> {
    let Json(input) = payload?;
    let fields = input.into_new_policy()?;

    let policy = timed("create", state.store.create(fields)).await?;
    info!(id = %policy.id, policy_number = %policy.policy_number, "Policy created");

    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn list_policies(State(state): State<AppState>) -> Result<Json<Vec<Policy>>, ApiError> {
    let policies = timed("list", state.store.list()).await?;
    Ok(Json(policies))
}

pub async fn get_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Policy>, ApiError> {
    timed("get", state.store.get(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::policy_not_found(&id))
}

/// Merge the supplied fields into an existing policy (partial update)
pub async fn update_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PolicyInput>, JsonRejection>,
) -> Result<Json<Policy>, ApiError> {
    let Json(input) = payload?;
    let patch = input.into_patch()?;

    let policy = timed("update", state.store.update(&id, patch))
        .await?
        .ok_or_else(|| ApiError::policy_not_found(&id))?;
    info!(id = %policy.id, "Policy updated");

    Ok(Json(policy))
}

pub async fn delete_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = timed("delete", state.store.delete(&id))
        .await?
        .ok_or_else(|| ApiError::policy_not_found(&id))?;
    info!(id = %removed.id, policy_number = %removed.policy_number, "Policy deleted");

    Ok(Json(json!({ "message": "Policy deleted" })))
}

/// Await a storage call, recording its latency
async fn timed<T, F>(operation: &'static str, call: F) -> aseguradora_core::Result<T>
where
    F: Future<Output = aseguradora_core::Result<T>>,
{
    let start = Instant::now();
    let result = call.await;
    metrics::histogram!("aseguradora_storage_latency_us", "operation" => operation)
        .record(start.elapsed().as_micros() as f64);
    result
}
