//! # Dummy Client
//!
//! Stands in for the monitoring agent when testing a sink by hand.
//!
//! ## Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SyncMetric(Add)                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UpdateMeasurements × count   (every `interval`)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncMetric(Delete)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call carries `username` / `password` metadata.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use prost_types::{value::Kind, Struct, Value};
use sink_rpc::client::CredentialsInterceptor;
use sink_rpc::proto::receiver_client::ReceiverClient;
use sink_rpc::{MeasurementEnvelope, SyncOp, SyncReq};
use tonic::transport::{Certificate, ClientTlsConfig, Endpoint};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "dummy-client", version)]
struct Args {
    /// Receiver endpoint, `http://` or `https://`
    #[arg(long, default_value = "http://127.0.0.1:9999")]
    address: String,

    #[arg(long, env = "PGWATCH_RPC_CLIENT_USERNAME", default_value = "")]
    username: String,

    #[arg(long, env = "PGWATCH_RPC_CLIENT_PASSWORD", default_value = "")]
    password: String,

    /// CA certificate to verify the receiver with; enables TLS
    #[arg(long)]
    ca_file: Option<PathBuf>,

    /// Server name to verify when using TLS
    #[arg(long, default_value = "localhost")]
    domain: String,

    /// Source name reported in every envelope
    #[arg(long, default_value = "dummy_db")]
    db_name: String,

    #[arg(long, default_value = "cpu_load")]
    metric_name: String,

    /// Number of envelopes to send
    #[arg(long, default_value_t = 5)]
    count: u32,

    /// Delay between envelopes in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

fn number(n: f64) -> Value {
    Value {
        kind: Some(Kind::NumberValue(n)),
    }
}

fn envelope(args: &Args, seq: u32) -> MeasurementEnvelope {
    let mut record = Struct::default();
    let epoch_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    record.fields.insert("epoch_ns".to_string(), number(epoch_ns as f64));
    record.fields.insert("seq".to_string(), number(f64::from(seq)));
    record.fields.insert(
        "load_1min".to_string(),
        number(f64::from(seq % 10) / 10.0),
    );

    MeasurementEnvelope {
        db_name: args.db_name.clone(),
        metric_name: args.metric_name.clone(),
        custom_tags: [("source".to_string(), "dummy-client".to_string())].into(),
        data: vec![record],
    }
}

fn sync_req(args: &Args, op: SyncOp) -> SyncReq {
    SyncReq {
        db_name: args.db_name.clone(),
        metric_name: args.metric_name.clone(),
        operation: op as i32,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut endpoint = Endpoint::from_shared(args.address.clone())
        .with_context(|| format!("invalid address {}", args.address))?;
    if let Some(ca_file) = &args.ca_file {
        let ca = tokio::fs::read(ca_file)
            .await
            .with_context(|| format!("cannot read {}", ca_file.display()))?;
        endpoint = endpoint.tls_config(
            ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(ca))
                .domain_name(args.domain.clone()),
        )?;
    }

    let channel = endpoint
        .connect()
        .await
        .with_context(|| format!("cannot connect to {}", args.address))?;
    let mut client = ReceiverClient::with_interceptor(
        channel,
        CredentialsInterceptor::new(args.username.clone(), args.password.clone()),
    );
    info!(address = %args.address, tls = args.ca_file.is_some(), "Connected");

    match client.sync_metric(sync_req(&args, SyncOp::AddOp)).await {
        Ok(reply) => info!(reply = %reply.into_inner().logmsg, "Add sync"),
        Err(status) => error!(code = ?status.code(), message = status.message(), "Add sync failed"),
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    for seq in 0..args.count {
        ticker.tick().await;
        match client.update_measurements(envelope(&args, seq)).await {
            Ok(reply) => info!(seq, reply = %reply.into_inner().logmsg, "Measurements sent"),
            Err(status) => error!(seq, code = ?status.code(), message = status.message(), "Measurements rejected"),
        }
    }

    match client.sync_metric(sync_req(&args, SyncOp::DeleteOp)).await {
        Ok(reply) => info!(reply = %reply.into_inner().logmsg, "Delete sync"),
        Err(status) => error!(code = ?status.code(), message = status.message(), "Delete sync failed"),
    }

    Ok(())
}
