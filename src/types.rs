// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common types and errors used throughout the routeprom library

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create metric: {0}")]
    Metric(prometheus::Error),

    #[error("Failed to register metric: {0}")]
    Registration(prometheus::Error),

    #[error("Failed to encode metrics: {0}")]
    Encode(prometheus::Error),

    #[error("Metrics output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let details = match &self {
            Error::Metric(e) | Error::Registration(e) | Error::Encode(e) => Some(format!("{:?}", e)),
            Error::InvalidConfig(_) | Error::Utf8(_) => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            details,
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
