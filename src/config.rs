// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instrumentation configuration
//!
//! Configuration is fixed once a [`crate::Prometheus`] instance is built. Options can be
//! set directly, through [`crate::PrometheusBuilder`], or read from the environment.

use crate::types::Error;

/// Default path of the metrics endpoint
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Default metric name prefix
pub const DEFAULT_SUBSYSTEM: &str = "axum";

/// Default request duration buckets, in seconds
pub const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Default request/response size buckets, in bytes
pub const DEFAULT_SIZE_BUCKETS: &[f64] = &[
    100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0,
];

/// Prometheus instrumentation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PrometheusConfig {
    /// Path the metrics endpoint is registered under. May be empty.
    pub metrics_path: String,
    /// Prefix of every metric name. May be empty.
    pub subsystem: String,
    /// Bucket boundaries of the request duration histogram
    pub duration_buckets: Vec<f64>,
    /// Bucket boundaries of the request and response size histograms
    pub size_buckets: Vec<f64>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            subsystem: DEFAULT_SUBSYSTEM.to_string(),
            duration_buckets: DEFAULT_DURATION_BUCKETS.to_vec(),
            size_buckets: DEFAULT_SIZE_BUCKETS.to_vec(),
        }
    }
}

impl PrometheusConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `METRICS_PATH`: Metrics endpoint path (default: `/metrics`)
    /// - `METRICS_SUBSYSTEM`: Metric name prefix (default: `axum`)
    pub fn from_env() -> Self {
        let metrics_path =
            std::env::var("METRICS_PATH").unwrap_or_else(|_| DEFAULT_METRICS_PATH.to_string());

        let subsystem =
            std::env::var("METRICS_SUBSYSTEM").unwrap_or_else(|_| DEFAULT_SUBSYSTEM.to_string());

        Self {
            metrics_path,
            subsystem,
            ..Default::default()
        }
    }

    /// Path the metrics route is actually mounted at.
    ///
    /// The router rejects empty paths, so an empty metrics path is served from `/`.
    pub fn mount_path(&self) -> &str {
        crate::server::mount_path(&self.metrics_path)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Error> {
        if !self.metrics_path.is_empty() && !self.metrics_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "metrics_path must be empty or start with '/': {}",
                self.metrics_path
            )));
        }

        validate_buckets("duration_buckets", &self.duration_buckets)?;
        validate_buckets("size_buckets", &self.size_buckets)?;

        Ok(())
    }
}

fn validate_buckets(name: &str, buckets: &[f64]) -> Result<(), Error> {
    if buckets.is_empty() {
        return Err(Error::InvalidConfig(format!("{} must not be empty", name)));
    }

    if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(Error::InvalidConfig(format!(
            "{} must be strictly increasing",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PrometheusConfig::default();
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.subsystem, "axum");
        assert!(!config.duration_buckets.is_empty());
        assert!(!config.size_buckets.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let config = PrometheusConfig::default();
        assert!(config.validate().is_ok());

        let empty_path = PrometheusConfig {
            metrics_path: String::new(),
            ..Default::default()
        };
        assert!(empty_path.validate().is_ok());

        let invalid_config = PrometheusConfig {
            metrics_path: "metrics".to_string(),
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        let invalid_config = PrometheusConfig {
            duration_buckets: vec![],
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        let invalid_config = PrometheusConfig {
            size_buckets: vec![10.0, 10.0, 100.0],
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_mount_path() {
        let config = PrometheusConfig::default();
        assert_eq!(config.mount_path(), "/metrics");

        let config = PrometheusConfig {
            metrics_path: String::new(),
            ..Default::default()
        };
        assert_eq!(config.mount_path(), "/");
    }

    #[test]
    fn test_config_from_env() {
        // Test with no env vars set - should use defaults
        std::env::remove_var("METRICS_PATH");
        std::env::remove_var("METRICS_SUBSYSTEM");

        let config = PrometheusConfig::from_env();
        assert_eq!(config.metrics_path, DEFAULT_METRICS_PATH);
        assert_eq!(config.subsystem, DEFAULT_SUBSYSTEM);
    }
}
