//! # Validation Module
//!
//! Structural checks applied before any sink code runs.
//!
//! ## Validation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MeasurementEnvelope                                                    │
//! │       │                                                                 │
//! │       ├── db_name empty?      → "empty database name"                  │
//! │       ├── metric_name empty?  → "empty metric name"                    │
//! │       ├── data empty?         → "no data provided"                     │
//! │       └── OK → forwarded unchanged                                     │
//! │                                                                         │
//! │  SyncReq                                                                │
//! │       │                                                                 │
//! │       ├── operation not Add/Delete? → "invalid operation type"         │
//! │       ├── db_name empty?            → "... DBName can't be empty"      │
//! │       └── OK → (db_name, metric_name, op)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing check wins, so the same input always yields the same reason.

use crate::error::ValidationError;
use crate::proto::{MeasurementEnvelope, SyncOp, SyncReq};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a measurement envelope.
///
/// ## Example
/// ```rust
/// use sink_rpc::proto::MeasurementEnvelope;
/// use sink_rpc::validation::validate_envelope;
///
/// let envelope = MeasurementEnvelope::default();
/// assert_eq!(
///     validate_envelope(&envelope).unwrap_err().to_string(),
///     "empty database name"
/// );
/// ```
pub fn validate_envelope(envelope: &MeasurementEnvelope) -> ValidationResult<()> {
    if envelope.db_name.is_empty() {
        return Err(ValidationError::EmptyDatabaseName);
    }

    if envelope.metric_name.is_empty() {
        return Err(ValidationError::EmptyMetricName);
    }

    if envelope.data.is_empty() {
        return Err(ValidationError::NoData);
    }

    Ok(())
}

/// Validates a sync request and returns its decoded operation.
///
/// The operation is checked before the source name. `metric_name` may be empty.
pub fn validate_sync_request(req: &SyncReq) -> ValidationResult<SyncOp> {
    let op = match SyncOp::try_from(req.operation) {
        Ok(op @ (SyncOp::AddOp | SyncOp::DeleteOp)) => op,
        _ => return Err(ValidationError::InvalidOperation),
    };

    if req.db_name.is_empty() {
        return Err(ValidationError::EmptySyncDatabaseName);
    }

    Ok(op)
}

// =============================================================================
// Unit Tests
// =============================================================================
