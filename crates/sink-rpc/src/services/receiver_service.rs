//! Receiver gRPC service implementation.
//!
//! Adapts a [`Receiver`] sink to the generated tonic service trait, running
//! the interceptor chain before every dispatch.

use std::sync::Arc;

use prost_types::Struct;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use crate::interceptor::{CallInfo, InterceptorChain, Payload};
use crate::proto::{receiver_server, MeasurementEnvelope, Reply, SyncReq};
use crate::receiver::Receiver;

/// Receiver service implementation.
pub struct ReceiverServiceImpl<R> {
    receiver: Arc<R>,
    chain: Arc<InterceptorChain>,
}

impl<R: Receiver> ReceiverServiceImpl<R> {
    /// Create a new receiver service.
    pub fn new(receiver: Arc<R>, chain: InterceptorChain) -> Self {
        ReceiverServiceImpl {
            receiver,
            chain: Arc::new(chain),
        }
    }

    /// Runs the chain and hands back the message if every interceptor agreed.
    fn admit<T>(
        &self,
        request: Request<T>,
        payload: impl FnOnce(&T) -> Payload<'_>,
    ) -> Result<T, Status> {
        let (metadata, _extensions, message) = request.into_parts();
        self.chain
            .run(&CallInfo::new(&metadata, payload(&message)))
            .map_err(Status::from)?;
        Ok(message)
    }
}

#[tonic::async_trait]
impl<R: Receiver> receiver_server::Receiver for ReceiverServiceImpl<R> {
    async fn update_measurements(
        &self,
        request: Request<MeasurementEnvelope>,
    ) -> Result<Response<Reply>, Status> {
        let envelope = self.admit(request, |e| Payload::Measurements(e))?;

        debug!(
            db_name = %envelope.db_name,
            metric_name = %envelope.metric_name,
            rows = envelope.data.len(),
            "Dispatching measurements"
        );

        self.receiver
            .update_measurements(envelope)
            .await
            .map(Response::new)
            .inspect_err(|status| {
                warn!(code = ?status.code(), message = %status.message(), "UpdateMeasurements failed")
            })
    }

    async fn sync_metric(&self, request: Request<SyncReq>) -> Result<Response<Reply>, Status> {
        let req = self.admit(request, |r| Payload::Sync(r))?;

        debug!(
            db_name = %req.db_name,
            metric_name = %req.metric_name,
            operation = req.operation,
            "Dispatching sync request"
        );

        self.receiver.sync_metric(req).await.map(Response::new)
    }

    async fn define_metrics(&self, request: Request<Struct>) -> Result<Response<Reply>, Status> {
        let definitions = self.admit(request, |d| Payload::MetricDefinitions(d))?;

        debug!(metrics = definitions.fields.len(), "Dispatching metric definitions");

        self.receiver.define_metrics(definitions).await.map(Response::new)
    }
}
