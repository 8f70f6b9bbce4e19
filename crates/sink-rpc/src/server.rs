//! # Server Bootstrap
//!
//! Composes the interceptor chain and a sink into a listening gRPC service.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ServerConfig::from_env()                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RpcServer::bind(sink, &config)                                        │
//! │       ├── TcpListener::bind(host:port)                                 │
//! │       ├── server_builder(tls)   ── cert/key missing ──► plaintext      │
//! │       └── InterceptorChain::standard  (Auth → Validation)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  local_addr()  ← only externally visible side effect                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  serve() / serve_with_shutdown(signal)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::proto::receiver_server::ReceiverServer;
use crate::receiver::Receiver;
use crate::services::ReceiverServiceImpl;
use crate::tls::server_builder;

/// A bound, not yet serving, receiver server.
pub struct RpcServer<R: Receiver> {
    receiver: Arc<R>,
    chain: InterceptorChain,
    builder: Server,
    listener: TcpListener,
    tls_enabled: bool,
}

impl<R: Receiver> RpcServer<R> {
    /// Binds the listener and prepares transport security and middleware.
    pub async fn bind(receiver: Arc<R>, config: &ServerConfig) -> Result<Self, ServerError> {
        let address = config.listen_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| match e.kind() {
            ErrorKind::InvalidInput => ServerError::InvalidAddress(format!("{}: {}", address, e)),
            _ => ServerError::Io(e),
        })?;

        let (builder, tls_enabled) = server_builder(config.tls.as_ref()).await;

        Ok(RpcServer {
            receiver,
            chain: InterceptorChain::standard(config),
            builder,
            listener,
            tls_enabled,
        })
    }

    /// Appends a sink-specific interceptor after the standard ones.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.chain = self.chain.with(interceptor);
        self
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Whether connections will be encrypted.
    pub fn is_tls(&self) -> bool {
        self.tls_enabled
    }

    /// Serves until Ctrl+C or SIGTERM.
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serves until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.local_addr()?;
        info!(%addr, tls = self.tls_enabled, interceptors = ?self.chain, "Registered Receiver");

        let service = ReceiverServer::new(ReceiverServiceImpl::new(self.receiver, self.chain));
        let mut builder = self.builder;

        builder
            .add_service(service)
            .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), signal)
            .await?;

        info!(%addr, "Receiver shut down");
        Ok(())
    }
}

/// Binds with `config` and serves `receiver` until process termination.
pub async fn listen_and_serve<R: Receiver>(
    receiver: Arc<R>,
    config: &ServerConfig,
) -> Result<(), ServerError> {
    RpcServer::bind(receiver, config).await?.serve().await
}

/// Graceful shutdown signal handler.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
