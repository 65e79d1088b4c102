//! Error types for directory administration operations.
//!
//! This module provides the error type shared across the posixdir crates,
//! including stable error codes and a structured response representation
//! for front ends that serialize failures.

use serde::Serialize;
use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No candidate directory server accepted a connection
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Administrative bind was rejected
    #[error("Bind failed: {0}")]
    Auth(String),

    /// Directory search failed at the protocol level
    #[error("Search failed: {0}")]
    Search(String),

    /// A directory mutation primitive failed
    #[error("Directory {operation} failed: {message}")]
    Protocol {
        /// Primitive that failed (add, modify, delete, passwd)
        operation: String,
        /// Underlying protocol error message
        message: String,
    },

    /// A required field was blank or missing
    #[error("Validation error: {0}")]
    Validation(String),

    /// A caller-supplied identifier is not an integer
    #[error("Invalid identifier: {0}")]
    IdFormat(String),

    /// An identifier stored in the directory is not an integer
    #[error("Corrupt identifier in directory: {0}")]
    IdParse(String),

    /// Identifier outside the allowed allocation range
    #[error("Identifier {0} outside allowed range [10000, 60000)")]
    IdOutOfRange(i64),

    /// Identifier already attached to a live entry
    #[error("Identifier conflict: {0}")]
    IdConflict(String),

    /// Group deletion refused while members remain
    #[error("Group not empty: {0}")]
    GroupNotEmpty(String),

    /// Credential verification failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation accepted by the interface but not supported
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_FAILED",
            Self::Auth(_) => "AUTH_FAILED",
            Self::Search(_) => "SEARCH_FAILED",
            Self::Protocol { .. } => "PROTOCOL_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::IdFormat(_) => "ID_FORMAT",
            Self::IdParse(_) => "ID_PARSE",
            Self::IdOutOfRange(_) => "ID_OUT_OF_RANGE",
            Self::IdConflict(_) => "ID_CONFLICT",
            Self::GroupNotEmpty(_) => "GROUP_NOT_EMPTY",
            Self::Credential(_) => "CREDENTIAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: None,
            },
        }
    }

    /// Returns true if this error indicates directory corruption or a
    /// configuration problem rather than bad caller input.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::IdParse(_) | Self::Config(_) | Self::Protocol { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::Connection("test".to_string()).error_code(),
            "CONNECTION_FAILED"
        );
        assert_eq!(Error::Auth("test".to_string()).error_code(), "AUTH_FAILED");
        assert_eq!(
            Error::Search("test".to_string()).error_code(),
            "SEARCH_FAILED"
        );
        assert_eq!(
            Error::Protocol {
                operation: "add".to_string(),
                message: "msg".to_string()
            }
            .error_code(),
            "PROTOCOL_ERROR"
        );
        assert_eq!(
            Error::Validation("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            Error::IdFormat("test".to_string()).error_code(),
            "ID_FORMAT"
        );
        assert_eq!(Error::IdParse("test".to_string()).error_code(), "ID_PARSE");
        assert_eq!(Error::IdOutOfRange(42).error_code(), "ID_OUT_OF_RANGE");
        assert_eq!(
            Error::IdConflict("test".to_string()).error_code(),
            "ID_CONFLICT"
        );
        assert_eq!(
            Error::GroupNotEmpty("test".to_string()).error_code(),
            "GROUP_NOT_EMPTY"
        );
        assert_eq!(
            Error::Credential("test".to_string()).error_code(),
            "CREDENTIAL_ERROR"
        );
        assert_eq!(
            Error::Config("test".to_string()).error_code(),
            "CONFIG_ERROR"
        );
        assert_eq!(
            Error::NotImplemented("test".to_string()).error_code(),
            "NOT_IMPLEMENTED"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::Connection("no server reachable".to_string());
        assert_eq!(err.to_string(), "Connection failed: no server reachable");

        let err = Error::Protocol {
            operation: "delete".to_string(),
            message: "no such object".to_string(),
        };
        assert_eq!(err.to_string(), "Directory delete failed: no such object");

        let err = Error::IdOutOfRange(9999);
        assert_eq!(
            err.to_string(),
            "Identifier 9999 outside allowed range [10000, 60000)"
        );
    }

    #[test]
    fn test_into_error_response() {
        let err = Error::GroupNotEmpty("dev".to_string());
        let response = err.into_error_response();

        assert_eq!(response.error.code, "GROUP_NOT_EMPTY");
        assert_eq!(response.error.message, "Group not empty: dev");
    }

    #[test]
    fn test_error_response_serialization() {
        let response = Error::Validation("user name can not be empty".to_string())
            .into_error_response();

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("VALIDATION_ERROR"));
        assert!(json.contains("user name can not be empty"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_should_log() {
        assert!(Error::IdParse("bad".to_string()).should_log());
        assert!(Error::Config("bad".to_string()).should_log());
        assert!(Error::Protocol {
            operation: "add".to_string(),
            message: "msg".to_string()
        }
        .should_log());

        assert!(!Error::Validation("bad".to_string()).should_log());
        assert!(!Error::Credential("bad".to_string()).should_log());
    }

    #[test]
    fn test_error_clone_and_eq() {
        let err = Error::IdConflict("10001".to_string());
        let cloned = err.clone();
        assert_eq!(err, cloned);
        assert_ne!(err, Error::IdConflict("10002".to_string()));
    }
}
