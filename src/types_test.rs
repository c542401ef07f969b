// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for types module

use super::types::*;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[test]
fn test_error_response_serialization() {
    let response = ErrorResponse {
        error: "Test error".to_string(),
        details: Some("Details here".to_string()),
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("Test error"));
    assert!(json.contains("Details here"));
}

#[test]
fn test_error_response_without_details() {
    let response = ErrorResponse {
        error: "Test error".to_string(),
        details: None,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("Test error"));
    assert!(json.contains("null")); // None is serialized as null
}

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("size_buckets must not be empty".to_string());
    assert_eq!(
        error.to_string(),
        "Invalid configuration: size_buckets must not be empty"
    );

    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_registration_error() {
    let error = Error::Registration(prometheus::Error::AlreadyReg);
    assert!(error.to_string().starts_with("Failed to register metric"));

    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_utf8_error_conversion() {
    let invalid = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
    let error: Error = invalid.into();
    assert!(matches!(error, Error::Utf8(_)));
}
