//! API routes: the RPC surface described in §6, mounted with bearer auth on
//! everything except `/health`.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    cancel_export, cleanup, download_url, export_status, health, metadata, preview, render,
    start_export, transcribe, transcribe_queue, transcribe_status, upload, youtube,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, require_bearer_auth, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let protected_routes = Router::new()
        .route("/upload", post(upload))
        .route("/youtube", post(youtube))
        .route("/metadata", post(metadata))
        .route("/render", post(render))
        .route("/preview", post(preview))
        .route("/transcribe", post(transcribe))
        .route("/transcribe/queue", post(transcribe_queue))
        .route("/transcribe/status/:sessionId", get(transcribe_status))
        .route("/editor-export/start", post(start_export))
        .route("/editor-export/status/:jobId", get(export_status))
        .route("/editor-export/cancel/:jobId", post(cancel_export))
        .route("/download-url", post(download_url))
        .route("/cleanup", post(cleanup))
        .layer(middleware::from_fn_with_state(rate_limiter.clone(), rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer_auth));

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled).
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(protected_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
