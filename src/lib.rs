// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! routeprom - Prometheus request instrumentation for axum
//!
//! Observes every request/response pair handled by an axum application and exports
//! request count, latency, request size and response size in the Prometheus text
//! exposition format.
//!
//! # Features
//!
//! - Request metrics labeled with `code`, `method`, `path` and `host`
//! - `path` is the route template (`/user/{id}`), never the concrete URL (`/user/10`),
//!   so the number of series stays bounded by the number of registered routes
//! - Metrics live in an explicit [`prometheus::Registry`] owned by each instance
//! - Self-registered metrics endpoint that is itself never instrumented
//! - Response sizes counted as the body streams, without buffering
//!
//! # Usage
//!
//! ```rust,no_run
//! use routeprom::{Prometheus, PrometheusConfig, Server};
//! use axum::extract::Path;
//!
//! async fn get_user(Path(id): Path<String>) -> String {
//!     format!("user {}", id)
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = Server::new();
//!     server.get("/user/{id}", get_user);
//!
//!     let prometheus = Prometheus::new(PrometheusConfig::default())?;
//!     prometheus.attach(&mut server);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, server.into_router()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Custom options
//!
//! ```rust
//! use routeprom::Prometheus;
//!
//! let prometheus = Prometheus::builder()
//!     .metrics_path("/internal/metrics")
//!     .subsystem("shop")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(prometheus.metrics_path(), "/internal/metrics");
//! assert_eq!(prometheus.subsystem(), "shop");
//! ```

// Re-export public modules
pub mod config;
pub mod exporter;
pub mod metrics;
pub mod middleware;
pub mod resolver;
pub mod server;
pub mod types;

// Re-export commonly used types

// Instrumentation entry point
pub use exporter::{metrics_handler, Prometheus, PrometheusBuilder};

// Configuration
pub use config::{PrometheusConfig, DEFAULT_METRICS_PATH, DEFAULT_SUBSYSTEM};

// Routing
pub use server::{handler_identity, identity_base, RouteInfo, RouteRegistry, Server};

// Metrics and errors
pub use metrics::{MetricSet, Observation};
pub use resolver::RouteTable;
pub use types::{Error, ErrorResponse};

#[cfg(test)]
mod metrics_test;
#[cfg(test)]
mod types_test;
