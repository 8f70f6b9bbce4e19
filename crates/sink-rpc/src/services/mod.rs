//! gRPC service implementations.
//!
//! This module contains the tonic service that fronts every sink.

pub mod receiver_service;

pub use receiver_service::ReceiverServiceImpl;
