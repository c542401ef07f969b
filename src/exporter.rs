// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus exporter: the public entry point
//!
//! A [`Prometheus`] instance owns its configuration, its own [`Registry`] with the
//! request [`MetricSet`] registered in it, and the [`RouteTable`] used to label requests.
//! [`Prometheus::attach`] wires it into a [`Server`]: it registers the metrics endpoint
//! and installs the instrumentation middleware.

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Registry, TEXT_FORMAT};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};
use tracing::{debug, error, warn};

use crate::config::PrometheusConfig;
use crate::metrics::{gather_metrics, MetricSet};
use crate::middleware::instrument;
use crate::resolver::RouteTable;
use crate::server::{handler_identity, identity_base, mount_path, Server};
use crate::types::Error;

struct Inner {
    config: PrometheusConfig,
    registry: Registry,
    metrics: MetricSet,
    routes: OnceLock<RouteTable>,
    middleware_installed: AtomicBool,
    serves_metrics_path: AtomicBool,
}

/// Request instrumentation for one server
///
/// Cheap to clone; clones share the same metrics and route table.
#[derive(Clone)]
pub struct Prometheus {
    inner: Arc<Inner>,
}

impl Prometheus {
    /// Create an instance with its own registry
    pub fn new(config: PrometheusConfig) -> Result<Self, Error> {
        Self::with_registry(config, Registry::new())
    }

    /// Create an instance whose metrics are registered in `registry`.
    ///
    /// Fails with [`Error::Registration`] if the registry already holds metrics with the
    /// same names, e.g. another instance with the same subsystem.
    pub fn with_registry(config: PrometheusConfig, registry: Registry) -> Result<Self, Error> {
        config.validate()?;

        let metrics = MetricSet::new(&config)?;
        metrics.register(&registry)?;

        debug!(
            "prometheus metrics registered (subsystem: {:?}, path: {:?})",
            config.subsystem, config.metrics_path
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                registry,
                metrics,
                routes: OnceLock::new(),
                middleware_installed: AtomicBool::new(false),
                serves_metrics_path: AtomicBool::new(false),
            }),
        })
    }

    /// Create an instance bound to `server`, registering the metrics endpoint right away.
    ///
    /// The instrumentation middleware is not installed; use [`Prometheus::attach`] or
    /// [`Prometheus::install_middleware`] for that.
    pub fn with_server(config: PrometheusConfig, server: &mut Server) -> Result<Self, Error> {
        let prometheus = Self::new(config)?;
        prometheus.bind(server);
        prometheus.register_route(server);
        Ok(prometheus)
    }

    pub fn builder() -> PrometheusBuilder {
        PrometheusBuilder::default()
    }

    pub fn config(&self) -> &PrometheusConfig {
        &self.inner.config
    }

    pub fn metrics_path(&self) -> &str {
        &self.inner.config.metrics_path
    }

    pub fn subsystem(&self) -> &str {
        &self.inner.config.subsystem
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.inner.metrics
    }

    /// Register the metrics endpoint and install the instrumentation middleware.
    ///
    /// Safe to call more than once: the endpoint is only registered if the server has no
    /// GET route at the metrics path yet, and the middleware is installed once.
    pub fn attach(&self, server: &mut Server) {
        self.bind(server);
        self.register_route(server);
        self.install_middleware(server);
    }

    /// Install the instrumentation middleware on `server`, once per instance
    pub fn install_middleware(&self, server: &mut Server) {
        self.bind(server);

        if self.inner.middleware_installed.swap(true, Ordering::SeqCst) {
            debug!("instrumentation middleware already installed");
            return;
        }

        let state = self.clone();
        server.layer_fn(move |router| {
            router.layer(from_fn_with_state(state.clone(), instrument))
        });
    }

    /// Template registered for a handler identity, as currently known.
    ///
    /// Does not look for new routes; the table learns about routes added after
    /// [`Prometheus::attach`] the first time a request reaches them.
    pub fn lookup(&self, identity: &str) -> Option<String> {
        self.inner.routes.get()?.lookup(identity)
    }

    /// Template registered for a handler identity, scanning for new routes on a miss
    pub(crate) fn resolve(&self, identity: &str) -> Option<String> {
        self.inner.routes.get()?.resolve(identity)
    }

    /// Whether a request to `path` is served by a metrics endpoint.
    ///
    /// False when another handler owns the GET route at the metrics path.
    pub(crate) fn is_metrics_request(&self, path: &str) -> bool {
        self.inner.serves_metrics_path.load(Ordering::Acquire)
            && path == self.inner.config.mount_path()
    }

    /// Current metrics snapshot in the Prometheus text format
    pub fn render(&self) -> Result<String, Error> {
        gather_metrics(&self.inner.registry)
    }

    fn bind(&self, server: &Server) {
        let registry = server.registry();
        let table = self
            .inner
            .routes
            .get_or_init(|| RouteTable::new(registry.clone()));

        if !table.reads_from(&registry) {
            warn!("prometheus instance is bound to another server, routes of this server will not be labeled");
            return;
        }

        table.refresh();
    }

    fn register_route(&self, server: &mut Server) {
        let path = self.metrics_path();
        let base = handler_identity(&metrics_handler);

        if server.has_route(&Method::GET, path) {
            let ours = server.routes().iter().any(|route| {
                route.method == Method::GET
                    && identity_base(&route.handler) == base
                    && mount_path(&route.path) == mount_path(path)
            });
            if ours {
                debug!("metrics endpoint already registered at {:?}", path);
                self.inner.serves_metrics_path.store(true, Ordering::Release);
            } else {
                warn!(
                    "GET route already registered at {:?}, not adding metrics endpoint",
                    path
                );
            }
            return;
        }

        let identity = server.registry().unique_identity(base);
        server.register(
            Method::GET,
            path,
            &identity,
            get(metrics_handler).with_state(self.clone()),
        );
        self.inner.serves_metrics_path.store(true, Ordering::Release);

        debug!("metrics endpoint registered at {:?}", path);
    }
}

/// Metrics endpoint for Prometheus scraping
pub async fn metrics_handler(State(prometheus): State<Prometheus>) -> Response {
    match prometheus.render() {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_FORMAT)],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            e.into_response()
        }
    }
}

/// Composable construction options for [`Prometheus`]
#[derive(Default)]
pub struct PrometheusBuilder {
    config: PrometheusConfig,
    registry: Option<Registry>,
}

impl PrometheusBuilder {
    /// Start from an existing configuration
    pub fn from_config(config: PrometheusConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    /// Path of the metrics endpoint
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.config.metrics_path = path.into();
        self
    }

    /// Metric name prefix
    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.config.subsystem = subsystem.into();
        self
    }

    pub fn duration_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.config.duration_buckets = buckets;
        self
    }

    pub fn size_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.config.size_buckets = buckets;
        self
    }

    /// Register metrics in an existing registry instead of a fresh one
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<Prometheus, Error> {
        Prometheus::with_registry(self.config, self.registry.unwrap_or_default())
    }

    /// Build and bind to `server`, registering the metrics endpoint right away
    pub fn build_with_server(self, server: &mut Server) -> Result<Prometheus, Error> {
        let prometheus = self.build()?;
        prometheus.bind(server);
        prometheus.register_route(server);
        Ok(prometheus)
    }
}
