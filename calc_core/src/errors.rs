//! # Error Types
//!
//! Structured error types for calc_core. Each variant carries enough
//! context for a front-end to render a user-facing message and for an
//! operator to understand what went wrong from the logs.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult};
//!
//! fn parse_length(raw: &str) -> CalcResult<f64> {
//!     raw.trim()
//!         .parse()
//!         .map_err(|_| CalcError::invalid_numeric_input("length", raw, "not a number"))
//! }
//!
//! assert!(parse_length("4.2").is_ok());
//! assert_eq!(parse_length("vier").unwrap_err().error_code(), "INVALID_NUMERIC_INPUT");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for estimate, logging and contact operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// Material key is not in the catalog
    #[error("Invalid material: '{material}' is not in the catalog")]
    InvalidMaterial { material: String },

    /// A numeric form field could not be parsed or is out of range
    #[error("Invalid numeric input for '{field}': '{value}' - {reason}")]
    InvalidNumericInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Contact form submission rejected before dispatch
    #[error("Validation error on '{field}': {reason}")]
    ValidationError { field: String, reason: String },

    /// Mail transport rejected the message or could not be reached
    #[error("Delivery error: {reason}")]
    DeliveryError { reason: String },

    /// A structured log line could not be parsed
    #[error("Corrupt log entry in '{path}' at line {line}: {reason}")]
    CorruptLogEntry {
        path: String,
        line: usize,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON/CSV serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidMaterial error
    pub fn invalid_material(material: impl Into<String>) -> Self {
        CalcError::InvalidMaterial {
            material: material.into(),
        }
    }

    /// Create an InvalidNumericInput error
    pub fn invalid_numeric_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::InvalidNumericInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a ValidationError
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a DeliveryError
    pub fn delivery(reason: impl Into<String>) -> Self {
        CalcError::DeliveryError {
            reason: reason.into(),
        }
    }

    /// Create a CorruptLogEntry error. `line` is 1-based.
    pub fn corrupt_log_entry(path: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        CalcError::CorruptLogEntry {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CalcError::Internal {
            message: message.into(),
        }
    }

    /// True for failures the submitter can fix by correcting the form.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidMaterial { .. }
                | CalcError::InvalidNumericInput { .. }
                | CalcError::ValidationError { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidMaterial { .. } => "INVALID_MATERIAL",
            CalcError::InvalidNumericInput { .. } => "INVALID_NUMERIC_INPUT",
            CalcError::ValidationError { .. } => "VALIDATION_ERROR",
            CalcError::DeliveryError { .. } => "DELIVERY_ERROR",
            CalcError::CorruptLogEntry { .. } => "CORRUPT_LOG_ENTRY",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(e: serde_json::Error) -> Self {
        CalcError::SerializationError {
            reason: e.to_string(),
        }
    }
}

impl From<csv::Error> for CalcError {
    fn from(e: csv::Error) -> Self {
        CalcError::SerializationError {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::invalid_numeric_input("lengte", "abc", "not a number");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidNumericInput\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::invalid_material("onbekend").error_code(), "INVALID_MATERIAL");
        assert_eq!(CalcError::delivery("refused").error_code(), "DELIVERY_ERROR");
        assert_eq!(
            CalcError::corrupt_log_entry("a.jsonl", 3, "eof").error_code(),
            "CORRUPT_LOG_ENTRY"
        );
    }

    #[test]
    fn test_user_errors() {
        assert!(CalcError::invalid_material("x").is_user_error());
        assert!(CalcError::validation("email", "empty").is_user_error());
        assert!(!CalcError::delivery("timeout").is_user_error());
        assert!(!CalcError::file_error("append", "logs/x.csv", "denied").is_user_error());
    }

    #[test]
    fn test_display_includes_context() {
        let err = CalcError::corrupt_log_entry("logs/abc_20260101.jsonl", 2, "expected value");
        let msg = err.to_string();
        assert!(msg.contains("line 2"));
        assert!(msg.contains("abc_20260101.jsonl"));
    }
}
