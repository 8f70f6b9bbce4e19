//! Generated gRPC code for the receiver protocol.
//!
//! This module includes the Rust code generated from `proto/receiver.proto`.
//!
//! ## Items Available
//! - `MeasurementEnvelope`, `SyncReq`, `SyncOp`, `Reply` - wire messages
//! - `receiver_server::ReceiverServer` - server wrapper used by `RpcServer`
//! - `receiver_client::ReceiverClient` - client stub for agents and tests

tonic::include_proto!("pgwatch");

impl SyncOp {
    /// Human readable name used in replies and logs.
    pub fn label(self) -> &'static str {
        match self {
            SyncOp::AddOp => "Add",
            SyncOp::DeleteOp => "Delete",
            SyncOp::InvalidOp => "Invalid",
        }
    }
}
