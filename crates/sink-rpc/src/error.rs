//! # Error Types
//!
//! Error types for the receiver framework.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  Per call (become tonic::Status)                                       │
//! │  ├── ValidationError  - Malformed envelope / sync request              │
//! │  └── RpcError         - Validation, auth, sync queue, unimplemented    │
//! │                                                                         │
//! │  Startup (returned from bind/serve)                                    │
//! │  ├── ConfigError      - Invalid environment values                     │
//! │  └── ServerError      - Bind, transport, address failures              │
//! │                                                                         │
//! │  Sink errors are tonic::Status values and pass through untouched       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use tonic::Status;

// =============================================================================
// Validation Error
// =============================================================================

/// Structural problems with a request payload.
///
/// The display strings are part of the wire contract: agents log them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty database name")]
    EmptyDatabaseName,

    #[error("empty metric name")]
    EmptyMetricName,

    #[error("no data provided")]
    NoData,

    #[error("invalid operation type")]
    InvalidOperation,

    #[error("invalid sync request DBName can't be empty")]
    EmptySyncDatabaseName,
}

// =============================================================================
// RPC Error
// =============================================================================

/// Errors raised by the framework while handling a single call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Request failed structural validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Caller credentials do not match the server's.
    #[error("invalid username or password")]
    Unauthenticated,

    /// The sync queue stayed full for the whole admission window.
    #[error("timeout while trying to sync metric")]
    SyncTimeout,

    /// The sync queue was closed by its consumer.
    #[error("sync channel closed")]
    SyncClosed,

    /// The sink does not implement the named method.
    #[error("method {0} not implemented by this receiver")]
    Unimplemented(&'static str),
}

/// Convenience type alias for per-call results.
pub type RpcResult<T> = Result<T, RpcError>;

impl From<ValidationError> for Status {
    fn from(error: ValidationError) -> Self {
        Status::invalid_argument(error.to_string())
    }
}

impl From<RpcError> for Status {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Invalid(e) => e.into(),
            RpcError::Unauthenticated => Status::unauthenticated(error.to_string()),
            RpcError::SyncTimeout => Status::deadline_exceeded(error.to_string()),
            RpcError::SyncClosed => Status::unavailable(error.to_string()),
            RpcError::Unimplemented(_) => Status::unimplemented(error.to_string()),
        }
    }
}

// =============================================================================
// Startup Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

/// Errors that stop the server from binding or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

// =============================================================================
// Unit Tests
// =============================================================================
