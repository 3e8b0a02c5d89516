//! Error types for newsnode
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Database, Store, Source, Job)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for newsnode operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for newsnode
///
/// Component code favors "collect and continue"; this type is what crosses a
/// component boundary when an operation cannot produce a result at all.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "NEWSNODE_AI_URL")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Document or blob store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A store handle was used before it was opened
    #[error("store not initialized: {0}")]
    NotReady(String),

    /// Source fetch/parse failure
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Job state machine violation
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Input failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// AI backend call failed
    #[error("AI backend error: {0}")]
    Ai(String),

    /// Operation exceeded its deadline
    #[error("timed out: {0}")]
    Timeout(String),

    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Record already exists and overwrite was not requested
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Document and blob store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored document could not be decoded into its record type
    #[error("corrupt document {key} in store {store}: {reason}")]
    Corrupt {
        /// Store name
        store: String,
        /// Document key
        key: String,
        /// Decode failure
        reason: String,
    },

    /// No blob exists for the given content hash
    #[error("blob {0} not found")]
    BlobNotFound(String),

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

/// Per-source fetch pipeline errors
///
/// These are collected into `FetchResult::errors` and never abort a
/// multi-source fetch.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Endpoint answered with a non-2xx status
    #[error("{endpoint} returned HTTP {status}")]
    Http {
        /// Requested endpoint
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("request to {endpoint} failed: {reason}")]
    Request {
        /// Requested endpoint
        endpoint: String,
        /// Underlying failure
        reason: String,
    },

    /// Payload could not be parsed for the source type
    #[error("failed to parse payload from {endpoint}: {reason}")]
    Parse {
        /// Requested endpoint
        endpoint: String,
        /// Parser failure
        reason: String,
    },

    /// Parser did not yield an array of items
    #[error("payload from {endpoint} is not an array")]
    NotAnArray {
        /// Requested endpoint
        endpoint: String,
    },

    /// Source is disabled
    #[error("source {name} is disabled")]
    Disabled {
        /// Source name
        name: String,
    },

    /// No source registered under this name
    #[error("unknown source {name}")]
    UnknownSource {
        /// Source name
        name: String,
    },
}

/// Job tracker errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Status transition would move a job backwards
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Job id
        id: String,
        /// Current status
        from: String,
        /// Rejected status
        to: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: source bbc",
///     "details": { "source": "bbc" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Source(SourceError::UnknownSource { .. }) => 404,

            // 409 Conflict
            Error::Duplicate(_) => 409,
            Error::Job(_) => 409,
            Error::Source(SourceError::Disabled { .. }) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Store(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,
            Error::Source(_) => 502,
            Error::Ai(_) => 502,

            // 503 Service Unavailable
            Error::NotReady(_) => 503,
            Error::ShuttingDown => 503,

            // 504 Gateway Timeout
            Error::Timeout(_) => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Store(e) => match e {
                StoreError::Corrupt { .. } => "corrupt_document",
                StoreError::BlobNotFound(_) => "blob_not_found",
                StoreError::Backend(_) => "store_error",
            },
            Error::NotReady(_) => "not_ready",
            Error::Source(e) => match e {
                SourceError::Http { .. } => "source_http_error",
                SourceError::Request { .. } => "source_request_failed",
                SourceError::Parse { .. } => "source_parse_error",
                SourceError::NotAnArray { .. } => "source_not_an_array",
                SourceError::Disabled { .. } => "source_disabled",
                SourceError::UnknownSource { .. } => "source_not_found",
            },
            Error::Job(_) => "invalid_transition",
            Error::Validation(_) => "validation_error",
            Error::Ai(_) => "ai_error",
            Error::Timeout(_) => "timeout",
            Error::NotFound(_) => "not_found",
            Error::Duplicate(_) => "duplicate",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotReady(store) => Some(serde_json::json!({ "store": store })),
            Error::Source(SourceError::Http { endpoint, status }) => Some(serde_json::json!({
                "endpoint": endpoint,
                "status": status,
            })),
            Error::Source(SourceError::Disabled { name })
            | Error::Source(SourceError::UnknownSource { name }) => {
                Some(serde_json::json!({ "source": name }))
            }
            Error::Job(JobError::InvalidTransition { id, from, to }) => Some(serde_json::json!({
                "job_id": id,
                "from": from,
                "to": to,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
