use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Json, Router, extract::State, response::IntoResponse, routing};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{
    bus::rabbit::{self, ConsumerHandler},
    config,
    state::AppState,
};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

#[derive(Serialize)]
struct HealthRes {
    service: &'static str,
    status: &'static str,
    uptime_secs: u64,
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthRes {
        service: state.service_name,
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Wires the shared state, spawns one consumer per `(topic, handler)`
/// binding, and serves the HTTP app until shutdown.
pub async fn bootstrap(
    service_name: &'static str,
    app: Router<AppState>,
    consumers: &[(&'static str, ConsumerHandler)],
) -> Result<()> {
    let config = config::load()?;
    let (state, rabbit) = AppState::initialize(service_name, &config).await?;

    rabbit::spawn_consumers(&rabbit, service_name, Arc::new(state.clone()), consumers).await?;

    let app = app
        .route("/healthz", routing::get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!("{} listening on port {}", service_name, config.port);
    axum::serve(listener, app).await?;

    Ok(())
}
