//! HTTP routes

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, warn};

use crate::config::{CorsConfig, ServerConfig};
use crate::policies;
use crate::state::AppState;

/// Build the application router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let policy_routes = Router::new()
        .route(
            "/",
            get(policies::list_policies).post(policies::create_policy),
        )
        .route(
            "/:id",
            get(policies::get_policy)
                .put(policies::update_policy)
                .delete(policies::delete_policy),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .nest(&config.base_path, policy_routes)
        .fallback(fallback)
        .layer(middleware::from_fn(track_requests))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(cors_layer(&config.cors))
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allow_any_origin {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage = state.store.name().to_string();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "storage": storage })),
        ),
        Err(e) => {
            warn!(error = %e, "Storage health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "storage": storage, "error": e.to_string() })),
            )
        }
    }
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Count every request by method, route template and status
async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status().as_u16();

    debug!(
        %method,
        %path,
        status,
        elapsed_us = start.elapsed().as_micros() as u64,
        "Handled request"
    );
    metrics::counter!(
        "aseguradora_requests_total",
        "method" => method,
        "path" => path,
        "status" => status.to_string()
    )
    .increment(1);

    response
}
