// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instrumented demo API server
//!
//! A small HTTP API wired up with routeprom:
//! - Every request is counted and timed, labeled by route template
//! - Metrics are exposed for Prometheus scraping at `METRICS_PATH` (default `/metrics`)
//!
//! Useful for checking label output and scrape configuration against a live process.

use anyhow::Context;
use axum::{extract::Path, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

// Import from the library
use routeprom::{Prometheus, PrometheusConfig, Server};

/// Server configuration
const DEFAULT_API_PORT: u16 = 8080;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// User resource
#[derive(Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fetch a user by id
async fn get_user(Path(id): Path<String>) -> Json<User> {
    Json(User {
        name: format!("user-{}", id),
        id,
    })
}

/// Create a user, echoing it back
async fn create_user(Json(user): Json<User>) -> (StatusCode, Json<User>) {
    (StatusCode::CREATED, Json(user))
}

/// Delete a user by id
async fn delete_user(Path(_id): Path<String>) -> StatusCode {
    StatusCode::NO_CONTENT
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("starting routeprom demo server v{}", env!("CARGO_PKG_VERSION"));

    // get configuration from environment
    let api_port = std::env::var("API_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_API_PORT);
    let config = PrometheusConfig::from_env();

    info!("api port: {}", api_port);
    info!("metrics path: {:?}", config.metrics_path);
    info!("metrics subsystem: {:?}", config.subsystem);

    let mut server = Server::new();

    // outermost: request tracing
    server.layer_fn(|router| router.layer(TraceLayer::new_for_http()));

    // instrumentation and metrics endpoint
    let prometheus = Prometheus::new(config).context("failed to create prometheus metrics")?;
    prometheus.attach(&mut server);

    // build api routes
    server
        .get("/api/v1/health", health_check)
        .get("/api/v1/users/{id}", get_user)
        .delete("/api/v1/users/{id}", delete_user)
        .post("/api/v1/users", create_user);

    // start server
    let addr = format!("0.0.0.0:{}", api_port);

    info!("routeprom demo server listening on {}", addr);
    info!(
        "metrics available at http://{}{}",
        addr,
        prometheus.config().mount_path()
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, server.into_router())
        .await
        .context("server error")?;

    Ok(())
}
