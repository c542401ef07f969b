// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for HTTP request instrumentation
//!
//! A [`MetricSet`] holds the four request instruments. All of them share the label set
//! `code`, `method`, `path` and `host`:
//! - `<subsystem>_requests_total` - completed requests
//! - `<subsystem>_request_duration_seconds` - request latency
//! - `<subsystem>_request_size_bytes` - request body size
//! - `<subsystem>_response_size_bytes` - response body size
//!
//! `path` is always a route template or empty, never a concrete URL.

use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::config::PrometheusConfig;
use crate::types::Error;

/// Label names shared by every request instrument, in label-value order
pub const LABELS: [&str; 4] = ["code", "method", "path", "host"];

/// One completed request, ready to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub code: u16,
    pub method: String,
    pub path: String,
    pub host: String,
    /// Elapsed time in seconds
    pub duration: f64,
    pub request_size: u64,
    pub response_size: u64,
}

/// The request instruments
#[derive(Clone)]
pub struct MetricSet {
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    request_size_bytes: HistogramVec,
    response_size_bytes: HistogramVec,
}

impl MetricSet {
    /// Create the instruments described by `config`. They are not registered anywhere yet.
    pub fn new(config: &PrometheusConfig) -> Result<Self, Error> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "requests_total",
                "How many HTTP requests processed, partitioned by status code and HTTP method.",
            )
            .subsystem(config.subsystem.as_str()),
            &LABELS,
        )
        .map_err(Error::Metric)?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "The HTTP request latencies in seconds.",
            )
            .subsystem(config.subsystem.as_str())
            .buckets(config.duration_buckets.clone()),
            &LABELS,
        )
        .map_err(Error::Metric)?;

        let request_size_bytes = HistogramVec::new(
            HistogramOpts::new("request_size_bytes", "The HTTP request sizes in bytes.")
                .subsystem(config.subsystem.as_str())
                .buckets(config.size_buckets.clone()),
            &LABELS,
        )
        .map_err(Error::Metric)?;

        let response_size_bytes = HistogramVec::new(
            HistogramOpts::new("response_size_bytes", "The HTTP response sizes in bytes.")
                .subsystem(config.subsystem.as_str())
                .buckets(config.size_buckets.clone()),
            &LABELS,
        )
        .map_err(Error::Metric)?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            request_size_bytes,
            response_size_bytes,
        })
    }

    /// Register all four instruments in `registry`.
    ///
    /// Fails if any metric name is already taken. Instruments registered before the
    /// failing one are unregistered again.
    pub fn register(&self, registry: &Registry) -> Result<(), Error> {
        for (index, collector) in self.collectors().into_iter().enumerate() {
            if let Err(e) = registry.register(collector) {
                for done in self.collectors().into_iter().take(index) {
                    let _ = registry.unregister(done);
                }
                return Err(Error::Registration(e));
            }
        }

        Ok(())
    }

    /// Remove all four instruments from `registry`
    pub fn unregister(&self, registry: &Registry) -> Result<(), Error> {
        for collector in self.collectors() {
            registry.unregister(collector).map_err(Error::Registration)?;
        }

        Ok(())
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![
            Box::new(self.requests_total.clone()),
            Box::new(self.request_duration_seconds.clone()),
            Box::new(self.request_size_bytes.clone()),
            Box::new(self.response_size_bytes.clone()),
        ]
    }

    /// Record one completed request into every instrument
    pub fn observe(&self, observation: &Observation) {
        let code = observation.code.to_string();
        let labels = [
            code.as_str(),
            observation.method.as_str(),
            observation.path.as_str(),
            observation.host.as_str(),
        ];

        self.requests_total.with_label_values(&labels).inc();
        self.request_duration_seconds
            .with_label_values(&labels)
            .observe(observation.duration);
        self.request_size_bytes
            .with_label_values(&labels)
            .observe(observation.request_size as f64);
        self.response_size_bytes
            .with_label_values(&labels)
            .observe(observation.response_size as f64);
    }

    /// Completed request counter
    pub fn requests_total(&self) -> &IntCounterVec {
        &self.requests_total
    }

    /// Request latency histogram
    pub fn request_duration_seconds(&self) -> &HistogramVec {
        &self.request_duration_seconds
    }

    /// Request size histogram
    pub fn request_size_bytes(&self) -> &HistogramVec {
        &self.request_size_bytes
    }

    /// Response size histogram
    pub fn response_size_bytes(&self) -> &HistogramVec {
        &self.response_size_bytes
    }
}

/// Generate metrics output in Prometheus format
pub fn gather_metrics(registry: &Registry) -> Result<String, Error> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(Error::Encode)?;
    Ok(String::from_utf8(buffer)?)
}
