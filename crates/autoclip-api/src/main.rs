//! Axum API server binary.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autoclip_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("autoclip=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
            )
            .with(env_filter)
            .init();
    }

    info!("Starting autoclip-api");

    // Load configuration
    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    // Discard scratch directories left behind by a previous, uncleanly
    // terminated process before accepting any work.
    autoclip_worker::sweep_stale_scratch().await;

    // Create application state
    let state = match AppState::new(config.clone()).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize metrics
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    spawn_job_retention_sweep(state.clone());

    // Create router
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    info!("Server shutdown complete");
}

/// Periodically evict terminal jobs past their retention window from both
/// schedulers' in-memory maps (§4.7 job TTL).
fn spawn_job_retention_sweep(state: AppState) {
    let retention = Duration::from_millis(
        std::env::var("AUTOCLIP_TRANSCRIBE_JOB_RETENTION_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60 * 60 * 1000),
    );
    let sweep_interval = Duration::from_secs(60);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            state.transcribe_scheduler.evict_expired().await;
            let evicted = state.export_scheduler.evict_expired(retention).await;
            if !evicted.is_empty() {
                info!("evicted {} expired export job(s)", evicted.len());
            }
        }
    });
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
