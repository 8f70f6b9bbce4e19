//! # Interceptor Chain
//!
//! Ordered middleware that runs before a call reaches the sink.
//!
//! ## Standard Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  request ──► AuthInterceptor ──► ValidationInterceptor ──► Receiver    │
//! │                   │                       │                             │
//! │                   ▼                       ▼                             │
//! │            Unauthenticated         InvalidArgument                      │
//! │                                    (UpdateMeasurements only)            │
//! │                                                                         │
//! │  The first rejection wins; later interceptors and the sink never run.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use prost_types::Struct;
use tonic::metadata::MetadataMap;
use tracing::debug;

use crate::auth::AuthInterceptor;
use crate::config::ServerConfig;
use crate::error::RpcResult;
use crate::proto::{MeasurementEnvelope, SyncReq};
use crate::validation::validate_envelope;

// =============================================================================
// Call Description
// =============================================================================

/// RPC method being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    UpdateMeasurements,
    SyncMetric,
    DefineMetrics,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::UpdateMeasurements => "UpdateMeasurements",
            Method::SyncMetric => "SyncMetric",
            Method::DefineMetrics => "DefineMetrics",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of the request message.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Measurements(&'a MeasurementEnvelope),
    Sync(&'a SyncReq),
    MetricDefinitions(&'a Struct),
}

impl Payload<'_> {
    pub fn method(&self) -> Method {
        match self {
            Payload::Measurements(_) => Method::UpdateMeasurements,
            Payload::Sync(_) => Method::SyncMetric,
            Payload::MetricDefinitions(_) => Method::DefineMetrics,
        }
    }
}

/// Everything an interceptor may look at.
#[derive(Debug, Clone, Copy)]
pub struct CallInfo<'a> {
    pub metadata: &'a MetadataMap,
    pub payload: Payload<'a>,
}

impl<'a> CallInfo<'a> {
    pub fn new(metadata: &'a MetadataMap, payload: Payload<'a>) -> Self {
        CallInfo { metadata, payload }
    }

    pub fn method(&self) -> Method {
        self.payload.method()
    }
}

// =============================================================================
// Interceptor
// =============================================================================

/// A single link in the chain. Returns `Ok(())` to let the call through.
pub trait Interceptor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn intercept(&self, call: &CallInfo<'_>) -> RpcResult<()>;
}

/// Rejects structurally invalid measurement envelopes.
///
/// Sync requests are checked by the sync handler itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationInterceptor;

impl Interceptor for ValidationInterceptor {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn intercept(&self, call: &CallInfo<'_>) -> RpcResult<()> {
        if let Payload::Measurements(envelope) = call.payload {
            validate_envelope(envelope)?;
        }
        Ok(())
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Ordered list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Empty chain; every call passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Auth followed by validation.
    pub fn standard(config: &ServerConfig) -> Self {
        Self::new()
            .with(AuthInterceptor::new(config.credentials.clone()))
            .with(ValidationInterceptor)
    }

    /// Appends an interceptor to the end of the chain.
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Runs every interceptor in order, stopping at the first rejection.
    pub fn run(&self, call: &CallInfo<'_>) -> RpcResult<()> {
        for interceptor in &self.interceptors {
            if let Err(e) = interceptor.intercept(call) {
                debug!(
                    interceptor = interceptor.name(),
                    method = %call.method(),
                    error = %e,
                    "Call rejected"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::error::{RpcError, ValidationError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl Interceptor for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn intercept(&self, _call: &CallInfo<'_>) -> RpcResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn metadata(username: &str, password: &str) -> MetadataMap {
        let mut md = MetadataMap::new();
        md.insert("username", username.parse().unwrap());
        md.insert("password", password.parse().unwrap());
        md
    }

    fn secured() -> ServerConfig {
        ServerConfig::default().with_credentials(Credentials::new("pgwatch", "pgwatch"))
    }

    #[test]
    fn test_standard_order() {
        let chain = InterceptorChain::standard(&ServerConfig::default());
        assert_eq!(chain.names(), vec!["auth", "validation"]);
    }

    #[test]
    fn test_auth_runs_before_validation() {
        let chain = InterceptorChain::standard(&secured());
        let md = metadata("pgwatch", "wrong");
        let envelope = MeasurementEnvelope::default();

        let err = chain
            .run(&CallInfo::new(&md, Payload::Measurements(&envelope)))
            .unwrap_err();
        assert!(matches!(err, RpcError::Unauthenticated));
    }

    #[test]
    fn test_validation_after_auth_passes() {
        let chain = InterceptorChain::standard(&secured());
        let md = metadata("pgwatch", "pgwatch");
        let envelope = MeasurementEnvelope {
            metric_name: "cpu".to_string(),
            ..Default::default()
        };

        let err = chain
            .run(&CallInfo::new(&md, Payload::Measurements(&envelope)))
            .unwrap_err();
        assert!(matches!(err, RpcError::Invalid(ValidationError::EmptyDatabaseName)));
    }

    #[test]
    fn test_validation_skips_sync_requests() {
        let chain = InterceptorChain::standard(&ServerConfig::default());
        let md = MetadataMap::new();
        let req = SyncReq::default();

        assert!(chain.run(&CallInfo::new(&md, Payload::Sync(&req))).is_ok());
    }

    #[test]
    fn test_rejection_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = InterceptorChain::standard(&secured()).with(Counting(hits.clone()));
        let md = MetadataMap::new();
        let defs = Struct::default();

        assert!(chain
            .run(&CallInfo::new(&md, Payload::MetricDefinitions(&defs)))
            .is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let md = metadata("pgwatch", "pgwatch");
        assert!(chain
            .run(&CallInfo::new(&md, Payload::MetricDefinitions(&defs)))
            .is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
