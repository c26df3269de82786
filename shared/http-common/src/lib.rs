//! Shared HTTP utilities for the relationship vault.
//!
//! Provides error bodies, domain-error to status mapping and time formatting
//! used by the api-server. Kept framework-agnostic.

use chrono::{DateTime, SecondsFormat, Utc};
use domain::CoreError;
use std::time::SystemTime;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "invalid_id" => "Invalid record id",
        "conflict" => "Resource already exists",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Domain Error Mapping
// ============================================================================

/// HTTP status code for a domain error.
pub fn status_for(err: &CoreError) -> u16 {
    match err {
        CoreError::InvalidId(_) | CoreError::InvalidField { .. } => 400,
        CoreError::DuplicateReference(_) | CoreError::AlreadyExists => 409,
        CoreError::UnknownReference(_) => 422,
        CoreError::NotFound => 404,
        CoreError::Repository(_) => 500,
    }
}

/// Stable machine-readable code for a domain error.
pub fn code_for(err: &CoreError) -> &'static str {
    match err {
        CoreError::InvalidId(_) => "invalid_id",
        CoreError::InvalidField { .. } => "invalid_request",
        CoreError::DuplicateReference(_) => "duplicate_reference",
        CoreError::UnknownReference(_) => "unknown_reference",
        CoreError::AlreadyExists => "conflict",
        CoreError::NotFound => "not_found",
        CoreError::Repository(_) => "internal",
    }
}

/// Status and JSON body for a domain error. Store failures get a generic
/// message so internal details stay in the logs.
pub fn core_error_response(err: &CoreError) -> (u16, serde_json::Value) {
    let status = status_for(err);
    let body = match err {
        CoreError::Repository(_) => json_err("internal"),
        other => json_error_with_message(code_for(other), &other.to_string()),
    };
    (status, body)
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (seconds precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human-readable timestamp for HTML pages, e.g. `Tue Nov 14 2023 22:13 UTC`.
pub fn system_time_to_display(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.format("%a %b %d %Y %H:%M UTC").to_string()
}
