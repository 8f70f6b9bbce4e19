//! # sink-rpc
//!
//! Shared gRPC framework for measurement sinks.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Receiver Framework                              │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ RpcServer      │  │ Interceptors   │  │ Receiver (trait)           ││
//! │  │                │  │                │  │                            ││
//! │  │ • bind         │─►│ • Auth         │─►│ • update_measurements      ││
//! │  │ • TLS fallback │  │ • Validation   │  │ • sync_metric              ││
//! │  │ • serve        │  │                │  │ • define_metrics           ││
//! │  └────────────────┘  └────────────────┘  └─────────────┬──────────────┘│
//! │                                                         │               │
//! │                                                         ▼               │
//! │                                          ┌────────────────────────────┐│
//! │                                          │ SyncMetricHandler          ││
//! │                                          │ bounded queue, 5s timeout  ││
//! │                                          │ ───► sink drain loop       ││
//! │                                          └────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `PGWATCH_RPC_SERVER_USERNAME` - Required caller username (unset: any)
//! - `PGWATCH_RPC_SERVER_PASSWORD` - Required caller password (unset: any)
//! - `PGWATCH_RPC_SERVER_CERT` - TLS certificate PEM path
//! - `PGWATCH_RPC_SERVER_KEY` - TLS private key PEM path
//! - `PGWATCH_RPC_SERVER_HOST` - Listen host (default: 0.0.0.0)
//! - `PGWATCH_RPC_SERVER_PORT` - Listen port (default: 9999)

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod json;
pub mod proto;
pub mod receiver;
pub mod server;
pub mod services;
pub mod sync;
pub mod tls;
pub mod validation;

// Re-exports
pub use config::{Credentials, ServerConfig};
pub use error::{RpcError, ServerError, ValidationError};
pub use proto::{MeasurementEnvelope, Reply, SyncOp, SyncReq};
pub use receiver::Receiver;
pub use server::{listen_and_serve, RpcServer};
pub use sync::SyncMetricHandler;
