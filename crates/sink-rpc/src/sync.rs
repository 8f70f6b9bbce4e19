//! # Sync Signal Bus
//!
//! Decouples "source/metric added or removed" notifications from whatever a
//! sink does in response (opening connections, creating topics, ...).
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SyncMetricHandler                                 │
//! │                                                                         │
//! │  SyncMetric RPC (many tasks)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_sync_request()  ── invalid ──► InvalidArgument               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  bounded mpsc queue (capacity C)        │                           │
//! │  │  send_timeout(5s)                       │── full for 5s ──►         │
//! │  └───────────────────┬─────────────────────┘   DeadlineExceeded        │
//! │                      │                         (request dropped)       │
//! │                      ▼                                                  │
//! │  get_sync_channel_content()  ◄── one drain loop per sink               │
//! │       │                                                                 │
//! │       ├── sink loop: open/close per-source resources                   │
//! │       └── handle_sync_metric(): discard                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! FIFO holds per producer. Concurrent `SyncMetric` calls land in whichever
//! order they win a queue slot; there is no cross-caller ordering.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::{watch, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{RpcError, RpcResult};
use crate::proto::{Reply, SyncReq};
use crate::validation::validate_sync_request;

// =============================================================================
// Constants
// =============================================================================

/// Queue capacity used when a sink asks for 0.
pub const DEFAULT_SYNC_QUEUE_CAPACITY: usize = 1024;

/// How long a producer waits for queue space before giving up.
pub const SYNC_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Sync Metric Handler
// =============================================================================

/// Bounded mailbox of sync requests, one per sink instance.
pub struct SyncMetricHandler {
    /// Producer side, used by the RPC entry point.
    sender: mpsc::Sender<SyncReq>,

    /// Consumer side. Locked by the single drain loop.
    receiver: Mutex<mpsc::Receiver<SyncReq>>,

    /// Flipped to `true` by `close()`.
    closed: watch::Sender<bool>,

    /// Configured capacity.
    capacity: usize,
}

impl SyncMetricHandler {
    /// Creates a handler with the given queue capacity (0 means the default).
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_SYNC_QUEUE_CAPACITY
        } else {
            capacity
        };
        let (sender, receiver) = mpsc::channel(capacity);
        let (closed, _) = watch::channel(false);

        SyncMetricHandler {
            sender,
            receiver: Mutex::new(receiver),
            closed,
            capacity,
        }
    }

    /// Validates and enqueues a sync request.
    ///
    /// Waits up to [`SYNC_ENQUEUE_TIMEOUT`] for a free slot. On timeout the
    /// request is dropped and the caller sees a deadline-exceeded error.
    pub async fn sync_metric(&self, req: SyncReq) -> RpcResult<Reply> {
        let op = validate_sync_request(&req)?;

        let logmsg = format!(
            "gRPC Receiver Synced: DBName {} MetricName {} Operation {}",
            req.db_name,
            req.metric_name,
            op.label()
        );

        let mut closed = self.closed.subscribe();
        let sent = tokio::select! {
            biased;
            // A producer still waiting for space when the bus closes is turned away
            _ = closed.wait_for(|closed| *closed) => return Err(RpcError::SyncClosed),
            sent = self.sender.send_timeout(req, SYNC_ENQUEUE_TIMEOUT) => sent,
        };

        match sent {
            Ok(()) => {
                debug!(%logmsg, "Sync request queued");
                Ok(Reply { logmsg })
            }
            Err(SendTimeoutError::Timeout(dropped)) => {
                warn!(
                    db_name = %dropped.db_name,
                    metric_name = %dropped.metric_name,
                    capacity = self.capacity,
                    "Sync queue full, dropping request"
                );
                Err(RpcError::SyncTimeout)
            }
            Err(SendTimeoutError::Closed(_)) => Err(RpcError::SyncClosed),
        }
    }

    /// Waits for the next sync request.
    ///
    /// Returns `None` once the queue has been closed and fully drained.
    pub async fn get_sync_channel_content(&self) -> Option<SyncReq> {
        let mut receiver = self.receiver.lock().await;
        let mut closed = self.closed.subscribe();

        tokio::select! {
            biased;
            req = receiver.recv() => req,
            // Once closed, hand out what is left without waiting for more
            _ = closed.wait_for(|closed| *closed) => receiver.try_recv().ok(),
        }
    }

    /// Default drain loop: empties the queue and ignores every request.
    ///
    /// Sinks without per-source resources spawn this so producers never
    /// stall on a full queue:
    /// ```rust,ignore
    /// let handler = Arc::new(SyncMetricHandler::new(0));
    /// tokio::spawn({
    ///     let handler = handler.clone();
    ///     async move { handler.handle_sync_metric().await }
    /// });
    /// ```
    pub async fn handle_sync_metric(&self) {
        while let Some(req) = self.get_sync_channel_content().await {
            trace!(db_name = %req.db_name, metric_name = %req.metric_name, "Discarding sync request");
        }
        debug!("Sync queue closed, drain loop exiting");
    }

    /// Stops accepting new requests, including producers already waiting for
    /// space. Queued requests can still be drained.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Configured queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of requests currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SyncMetricHandler {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_QUEUE_CAPACITY)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::proto::SyncOp;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn req(db: &str, metric: &str, op: SyncOp) -> SyncReq {
        SyncReq {
            db_name: db.to_string(),
            metric_name: metric.to_string(),
            operation: op as i32,
        }
    }

    #[test]
    fn test_capacity() {
        assert_eq!(SyncMetricHandler::new(16).capacity(), 16);
        assert_eq!(SyncMetricHandler::new(0).capacity(), DEFAULT_SYNC_QUEUE_CAPACITY);
        assert_eq!(SyncMetricHandler::default().capacity(), DEFAULT_SYNC_QUEUE_CAPACITY);
    }

    #[tokio::test]
    async fn test_valid_requests_reply() {
        let handler = SyncMetricHandler::new(1024);

        let cases = [
            req("test", "test", SyncOp::AddOp),
            req("test", "test", SyncOp::DeleteOp),
            req("test", "", SyncOp::AddOp),
            req("test", "", SyncOp::DeleteOp),
        ];

        for case in cases {
            let op = SyncOp::try_from(case.operation).unwrap();
            let expected = format!(
                "gRPC Receiver Synced: DBName {} MetricName {} Operation {}",
                case.db_name,
                case.metric_name,
                op.label()
            );
            let reply = handler.sync_metric(case).await.unwrap();
            assert_eq!(reply.logmsg, expected);
        }

        assert_eq!(handler.len(), 4);
    }

    #[tokio::test]
    async fn test_whole_source_reply() {
        let handler = SyncMetricHandler::new(4);
        let reply = handler.sync_metric(req("orders", "", SyncOp::AddOp)).await.unwrap();
        assert!(reply.logmsg.contains("DBName orders MetricName  Operation Add"));
    }

    #[tokio::test]
    async fn test_invalid_requests_not_queued() {
        let handler = SyncMetricHandler::new(8);

        let err = handler.sync_metric(req("", "test", SyncOp::AddOp)).await.unwrap_err();
        assert!(matches!(err, RpcError::Invalid(ValidationError::EmptySyncDatabaseName)));

        let err = handler.sync_metric(req("test", "test", SyncOp::InvalidOp)).await.unwrap_err();
        assert!(matches!(err, RpcError::Invalid(ValidationError::InvalidOperation)));

        let err = handler.sync_metric(req("", "", SyncOp::InvalidOp)).await.unwrap_err();
        assert!(matches!(err, RpcError::Invalid(ValidationError::InvalidOperation)));

        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_single_producer() {
        let handler = SyncMetricHandler::new(8);
        for db in ["a", "b", "c"] {
            handler.sync_metric(req(db, "", SyncOp::AddOp)).await.unwrap();
        }

        for db in ["a", "b", "c"] {
            let next = handler.get_sync_channel_content().await.unwrap();
            assert_eq!(next.db_name, db);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_times_out() {
        let handler = SyncMetricHandler::new(2);
        handler.sync_metric(req("a", "", SyncOp::AddOp)).await.unwrap();
        handler.sync_metric(req("b", "", SyncOp::AddOp)).await.unwrap();

        let started = Instant::now();
        let err = handler.sync_metric(req("c", "", SyncOp::AddOp)).await.unwrap_err();

        assert!(matches!(err, RpcError::SyncTimeout));
        assert!(started.elapsed() >= SYNC_ENQUEUE_TIMEOUT);
        // The timed out request must not linger in the queue
        assert_eq!(handler.len(), 2);
        assert_eq!(handler.get_sync_channel_content().await.unwrap().db_name, "a");
        assert_eq!(handler.get_sync_channel_content().await.unwrap().db_name, "b");
        assert!(handler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_producer_admitted_when_space_frees() {
        let handler = Arc::new(SyncMetricHandler::new(1));
        handler.sync_metric(req("a", "", SyncOp::AddOp)).await.unwrap();

        let producer = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.sync_metric(req("b", "", SyncOp::AddOp)).await })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handler.get_sync_channel_content().await.unwrap().db_name, "a");

        assert!(producer.await.unwrap().is_ok());
        assert_eq!(handler.get_sync_channel_content().await.unwrap().db_name, "b");
    }

    #[tokio::test]
    async fn test_default_drain_loop_empties_queue() {
        let handler = Arc::new(SyncMetricHandler::new(1024));
        let drain = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.handle_sync_metric().await })
        };

        for _ in 0..10 {
            handler.sync_metric(req("test", "m", SyncOp::AddOp)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(handler.is_empty());
        }

        handler.close();
        drain.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let handler = SyncMetricHandler::new(4);
        handler.sync_metric(req("a", "", SyncOp::DeleteOp)).await.unwrap();
        handler.close();

        let err = handler.sync_metric(req("b", "", SyncOp::AddOp)).await.unwrap_err();
        assert!(matches!(err, RpcError::SyncClosed));

        assert_eq!(handler.get_sync_channel_content().await.unwrap().db_name, "a");
        assert!(handler.get_sync_channel_content().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_turns_away_waiting_producer() {
        let handler = Arc::new(SyncMetricHandler::new(1));
        handler.sync_metric(req("a", "", SyncOp::AddOp)).await.unwrap();

        let producer = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.sync_metric(req("b", "", SyncOp::AddOp)).await })
        };

        // Producer is parked on the full queue
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!producer.is_finished());

        handler.close();

        let err = producer.await.unwrap().unwrap_err();
        assert!(matches!(err, RpcError::SyncClosed));

        assert_eq!(handler.get_sync_channel_content().await.unwrap().db_name, "a");
        assert!(handler.get_sync_channel_content().await.is_none());
        assert!(handler.is_empty());
    }
}
