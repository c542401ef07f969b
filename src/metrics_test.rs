// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for metrics module

use super::config::PrometheusConfig;
use super::metrics::*;
use super::types::Error;
use prometheus::Registry;

fn config_with_subsystem(subsystem: &str) -> PrometheusConfig {
    PrometheusConfig {
        subsystem: subsystem.to_string(),
        ..Default::default()
    }
}

fn observation(code: u16, path: &str) -> Observation {
    Observation {
        code,
        method: "GET".to_string(),
        path: path.to_string(),
        host: "example.com".to_string(),
        duration: 0.123,
        request_size: 0,
        response_size: 512,
    }
}

#[test]
fn test_register_and_gather_empty() {
    let registry = Registry::new();
    let metrics = MetricSet::new(&config_with_subsystem("test")).unwrap();
    metrics.register(&registry).unwrap();

    // Vectors without children produce no output
    let output = gather_metrics(&registry).unwrap();
    assert!(!output.contains("test_requests_total"));
}

#[test]
fn test_observe_records_all_instruments() {
    let registry = Registry::new();
    let metrics = MetricSet::new(&config_with_subsystem("test")).unwrap();
    metrics.register(&registry).unwrap();

    metrics.observe(&observation(200, "/user/{id}"));

    let output = gather_metrics(&registry).unwrap();
    assert!(output.contains("test_requests_total"));
    assert!(output.contains("test_request_duration_seconds_bucket"));
    assert!(output.contains("test_request_size_bytes_bucket"));
    assert!(output.contains("test_response_size_bytes_bucket"));
    assert!(output.contains(r#"path="/user/{id}""#));
    assert!(output.contains(r#"code="200""#));
    assert!(output.contains(r#"host="example.com""#));
}

#[test]
fn test_observe_counts_per_label_set() {
    let metrics = MetricSet::new(&config_with_subsystem("test")).unwrap();

    metrics.observe(&observation(200, "/a"));
    metrics.observe(&observation(200, "/a"));
    metrics.observe(&observation(404, ""));

    let ok = metrics
        .requests_total()
        .with_label_values(&["200", "GET", "/a", "example.com"])
        .get();
    let not_found = metrics
        .requests_total()
        .with_label_values(&["404", "GET", "", "example.com"])
        .get();
    assert_eq!(ok, 2);
    assert_eq!(not_found, 1);

    let sizes = metrics
        .response_size_bytes()
        .with_label_values(&["200", "GET", "/a", "example.com"]);
    assert_eq!(sizes.get_sample_count(), 2);
    assert_eq!(sizes.get_sample_sum(), 1024.0);
}

#[test]
fn test_empty_and_underscore_subsystems() {
    for subsystem in ["", "_"] {
        let registry = Registry::new();
        let metrics = MetricSet::new(&config_with_subsystem(subsystem)).unwrap();
        metrics.register(&registry).unwrap();
        metrics.observe(&observation(200, "/"));

        let output = gather_metrics(&registry).unwrap();
        assert!(output.contains("requests_total"));
    }
}

#[test]
fn test_duplicate_registration_fails() {
    let registry = Registry::new();
    let first = MetricSet::new(&config_with_subsystem("dup")).unwrap();
    let second = MetricSet::new(&config_with_subsystem("dup")).unwrap();

    first.register(&registry).unwrap();
    let result = second.register(&registry);
    assert!(matches!(result, Err(Error::Registration(_))));

    // A different subsystem can share the registry
    let other = MetricSet::new(&config_with_subsystem("other")).unwrap();
    assert!(other.register(&registry).is_ok());
}

#[test]
fn test_unregister_allows_reregistration() {
    let registry = Registry::new();
    let metrics = MetricSet::new(&config_with_subsystem("scoped")).unwrap();

    metrics.register(&registry).unwrap();
    metrics.unregister(&registry).unwrap();

    let again = MetricSet::new(&config_with_subsystem("scoped")).unwrap();
    assert!(again.register(&registry).is_ok());
}
