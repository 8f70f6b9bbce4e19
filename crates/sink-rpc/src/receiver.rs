//! # Receiver Contract
//!
//! The capability set every sink implements.
//!
//! ## Capabilities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method               │ Default                                        │
//! │  ─────────────────────┼────────────────────────────────────────────────│
//! │  update_measurements  │ Unimplemented                                  │
//! │  sync_metric          │ sync_handler() queue, else Unimplemented       │
//! │  define_metrics       │ Unimplemented                                  │
//! │  sync_handler         │ None                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method has a default so a sink implementing only part of the
//! contract still answers each RPC with an explicit status.
//!
//! ## Example
//! ```rust,ignore
//! struct MySink {
//!     sync: Arc<SyncMetricHandler>,
//! }
//!
//! #[tonic::async_trait]
//! impl Receiver for MySink {
//!     async fn update_measurements(&self, envelope: MeasurementEnvelope) -> Result<Reply, Status> {
//!         // write envelope.data somewhere
//!         Ok(Reply::default())
//!     }
//!
//!     fn sync_handler(&self) -> Option<&SyncMetricHandler> {
//!         Some(&self.sync)
//!     }
//! }
//! ```

use prost_types::Struct;
use tonic::Status;

use crate::error::RpcError;
use crate::proto::{MeasurementEnvelope, Reply, SyncReq};
use crate::sync::SyncMetricHandler;

/// A pluggable storage back end.
///
/// Methods may be called concurrently from many in-flight RPCs. Errors
/// returned here reach the agent unchanged.
#[tonic::async_trait]
pub trait Receiver: Send + Sync + 'static {
    /// Persist or forward one validated batch of measurements.
    async fn update_measurements(&self, envelope: MeasurementEnvelope) -> Result<Reply, Status> {
        let _ = envelope;
        Err(RpcError::Unimplemented("UpdateMeasurements").into())
    }

    /// React to a source or metric being added to / removed from monitoring.
    ///
    /// The default queues the request on [`Receiver::sync_handler`] for the
    /// sink's drain loop. Override to answer synchronously instead.
    async fn sync_metric(&self, req: SyncReq) -> Result<Reply, Status> {
        match self.sync_handler() {
            Some(handler) => handler.sync_metric(req).await.map_err(Status::from),
            None => Err(RpcError::Unimplemented("SyncMetric").into()),
        }
    }

    /// Store the agent's metric definitions. Optional.
    async fn define_metrics(&self, definitions: Struct) -> Result<Reply, Status> {
        let _ = definitions;
        Err(RpcError::Unimplemented("DefineMetrics").into())
    }

    /// Sync queue backing the default `sync_metric`.
    fn sync_handler(&self) -> Option<&SyncMetricHandler> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::SyncOp;
    use tonic::Code;

    struct Bare;

    impl Receiver for Bare {}

    struct Queued {
        sync: SyncMetricHandler,
    }

    #[tonic::async_trait]
    impl Receiver for Queued {
        fn sync_handler(&self) -> Option<&SyncMetricHandler> {
            Some(&self.sync)
        }
    }

    fn add(db: &str) -> SyncReq {
        SyncReq {
            db_name: db.to_string(),
            metric_name: String::new(),
            operation: SyncOp::AddOp as i32,
        }
    }

    #[tokio::test]
    async fn test_missing_methods_are_unimplemented() {
        let sink = Bare;

        let status = sink
            .update_measurements(MeasurementEnvelope::default())
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unimplemented);

        let status = sink.sync_metric(add("db")).await.unwrap_err();
        assert_eq!(status.code(), Code::Unimplemented);

        let status = sink.define_metrics(Struct::default()).await.unwrap_err();
        assert_eq!(status.code(), Code::Unimplemented);
        assert!(status.message().contains("DefineMetrics"));
    }

    #[tokio::test]
    async fn test_default_sync_metric_uses_handler() {
        let sink = Queued {
            sync: SyncMetricHandler::new(4),
        };

        let reply = sink.sync_metric(add("orders")).await.unwrap();
        assert!(reply.logmsg.contains("DBName orders"));

        let queued = sink.sync.get_sync_channel_content().await.unwrap();
        assert_eq!(queued.db_name, "orders");

        let status = sink.sync_metric(add("")).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }
}
