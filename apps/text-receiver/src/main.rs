//! # Text Receiver
//!
//! Reference sink: writes every measurement batch to a text file per source.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Text Receiver                                  │
//! │                                                                         │
//! │  Agent ───► gRPC (9999) ───► Auth ───► Validation ───► TextReceiver    │
//! │                                                             │           │
//! │                                                             ▼           │
//! │                                                    <root>/<db>.txt     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod receiver;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sink_rpc::sync::DEFAULT_SYNC_QUEUE_CAPACITY;
use sink_rpc::{listen_and_serve, ServerConfig};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::receiver::TextReceiver;

/// Measurement sink that appends batches to text files.
#[derive(Debug, Parser)]
#[command(name = "text-receiver", version)]
struct Args {
    /// Port to listen on (overrides PGWATCH_RPC_SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Folder the per-source text files are written to
    #[arg(long, env = "TEXT_RECEIVER_ROOT_FOLDER", default_value = ".")]
    root_folder: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::from_env().context("invalid receiver configuration")?;
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    tokio::fs::create_dir_all(&args.root_folder)
        .await
        .with_context(|| format!("cannot create {}", args.root_folder.display()))?;

    info!(
        address = %config.listen_address(),
        root_folder = %args.root_folder.display(),
        auth = !config.credentials.is_open(),
        "Starting text receiver"
    );
    let config_json = serde_json::to_string(&config)?;
    debug!(config = %config_json, "Receiver configuration");

    let receiver = Arc::new(TextReceiver::new(
        args.root_folder,
        DEFAULT_SYNC_QUEUE_CAPACITY,
    ));

    let drain = tokio::spawn({
        let receiver = receiver.clone();
        async move { receiver.run_sync_loop().await }
    });

    listen_and_serve(receiver.clone(), &config).await?;

    receiver.close();
    drain.await?;

    info!("Text receiver stopped");
    Ok(())
}
