//! Transport security.
//!
//! A sink serves TLS when a readable certificate/key pair is configured and
//! plaintext otherwise. Failing to load the pair is logged, never fatal, so
//! deployments without certificates keep working.

use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{info, warn};

use crate::config::TlsPaths;

/// Reads the PEM pair into a TLS config. `None` when either file is unreadable.
pub async fn load_tls_config(paths: &TlsPaths) -> Option<ServerTlsConfig> {
    let cert = match tokio::fs::read(&paths.cert_path).await {
        Ok(cert) => cert,
        Err(e) => {
            warn!(path = %paths.cert_path.display(), error = %e, "Cannot read TLS certificate, serving plaintext");
            return None;
        }
    };

    let key = match tokio::fs::read(&paths.key_path).await {
        Ok(key) => key,
        Err(e) => {
            warn!(path = %paths.key_path.display(), error = %e, "Cannot read TLS key, serving plaintext");
            return None;
        }
    };

    Some(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
}

/// Builds the tonic server, encrypted if possible.
///
/// Returns the builder and whether TLS ended up enabled.
pub async fn server_builder(paths: Option<&TlsPaths>) -> (Server, bool) {
    let Some(paths) = paths else {
        info!("No TLS certificate configured, serving plaintext");
        return (Server::builder(), false);
    };

    let Some(tls) = load_tls_config(paths).await else {
        return (Server::builder(), false);
    };

    // Rejected PEM material surfaces here, not when the files are read
    match Server::builder().tls_config(tls) {
        Ok(builder) => {
            info!(cert = %paths.cert_path.display(), "Valid cert/key pair detected, enabling TLS");
            (builder, true)
        }
        Err(e) => {
            warn!(error = %e, "Invalid TLS certificate/key pair, serving plaintext");
            (Server::builder(), false)
        }
    }
}
