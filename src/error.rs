//! Index error types with HTTP status code mapping.
//!
//! [`IndexError`] is the central error type for the crate. Each variant
//! maps to a numeric code and an HTTP status so the read API can render
//! it as a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::RecordKind;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid cursor: unknown record kind `foo`"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Errors raised by the pagination engine, the reconciler and the stores.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status               |
/// |-----------|-------------------|---------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request           |
/// | 2000–2999 | Not Found         | 404 Not Found             |
/// | 3000–3999 | Server / Storage  | 500 Internal Server Error |
/// | 4000–4999 | Reconciliation    | 409 Conflict              |
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Cursor token is malformed or was issued for another record kind.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// A cursor decoded fine but no longer resolves against the filter.
    #[error("{kind} record `{key}` not found")]
    RecordNotFound {
        /// Kind of record that was looked up.
        kind: RecordKind,
        /// Canonical encoding of the missing key.
        key: String,
    },

    /// A burn update overlapped the stored transaction set only in part.
    #[error(
        "partial burn update rejected for block {block_number}: \
         {overlap} of {incoming} transactions already applied"
    )]
    PartialBurnUpdateRejected {
        /// Block the burn belongs to.
        block_number: u64,
        /// Number of incoming transactions already in the ledger.
        overlap: usize,
        /// Number of transactions carried by the incoming update.
        incoming: usize,
    },

    /// Page size of zero was requested.
    #[error("invalid page size: count must not be zero")]
    InvalidPageSize,

    /// Filter could not be parsed or applied.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A primary key, hash or address failed to parse.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Block position does not fit the ordinal layout.
    #[error("ordinal overflow: {0}")]
    OrdinalOverflow(String),

    /// Underlying store failure, surfaced unmodified.
    #[error("storage error: {0}")]
    Storage(String),

    /// Record payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IndexError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidCursor(_) => 1001,
            Self::InvalidPageSize => 1002,
            Self::InvalidFilter(_) => 1003,
            Self::InvalidKey(_) => 1004,
            Self::OrdinalOverflow(_) => 1005,
            Self::RecordNotFound { .. } => 2001,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::Serialization(_) => 3002,
            Self::PartialBurnUpdateRejected { .. } => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCursor(_)
            | Self::InvalidPageSize
            | Self::InvalidFilter(_)
            | Self::InvalidKey(_)
            | Self::OrdinalOverflow(_) => StatusCode::BAD_REQUEST,
            Self::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            Self::PartialBurnUpdateRejected { .. } => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Builds a [`IndexError::RecordNotFound`] for the given kind and key.
    pub fn not_found(kind: RecordKind, key: impl Into<String>) -> Self {
        Self::RecordNotFound {
            kind,
            key: key.into(),
        }
    }
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for IndexError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(format!("migration failed: {err}"))
    }
}

impl IntoResponse for IndexError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_errors_are_bad_requests() {
        let err = IndexError::InvalidCursor("garbage".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
    }

    #[test]
    fn not_found_names_kind_and_key() {
        let err = IndexError::not_found(RecordKind::Epoch, "42");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "epoch record `42` not found");
    }

    #[test]
    fn partial_burn_is_conflict() {
        let err = IndexError::PartialBurnUpdateRejected {
            block_number: 10,
            overlap: 1,
            incoming: 2,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("block 10"));
    }
}
