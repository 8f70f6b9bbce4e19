//! Receiver server configuration module.
//!
//! Configuration is loaded once from environment variables at startup and
//! passed by reference into the middleware chain. Nothing reads the
//! environment after that.

use serde::Serialize;
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default listen port for a sink.
pub const DEFAULT_PORT: u16 = 9999;

/// Default listen host (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const ENV_USERNAME: &str = "PGWATCH_RPC_SERVER_USERNAME";
pub const ENV_PASSWORD: &str = "PGWATCH_RPC_SERVER_PASSWORD";
pub const ENV_CERT: &str = "PGWATCH_RPC_SERVER_CERT";
pub const ENV_KEY: &str = "PGWATCH_RPC_SERVER_KEY";
pub const ENV_HOST: &str = "PGWATCH_RPC_SERVER_HOST";
pub const ENV_PORT: &str = "PGWATCH_RPC_SERVER_PORT";

/// Credentials a caller must present.
///
/// `None` means the field is not enforced. The password never appears in
/// serialized output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: Option<String>,

    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: non_empty(username.into()),
            password: non_empty(password.into()),
        }
    }

    /// Checks caller-supplied credentials byte for byte. Unset server fields
    /// act as wildcards.
    pub fn is_authenticated(&self, username: impl AsRef<[u8]>, password: impl AsRef<[u8]>) -> bool {
        let matches = |expected: &Option<String>, given: &[u8]| {
            expected.as_deref().map_or(true, |e| e.as_bytes() == given)
        };
        matches(&self.username, username.as_ref()) && matches(&self.password, password.as_ref())
    }

    /// True when neither field is enforced.
    pub fn is_open(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Certificate and private key locations for the TLS transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsPaths {
    /// PEM certificate chain
    pub cert_path: PathBuf,

    /// PEM private key
    pub key_path: PathBuf,
}

/// Receiver server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,

    /// gRPC listen port (0 picks an ephemeral port)
    pub port: u16,

    /// Credentials callers must present
    pub credentials: Credentials,

    /// TLS material; `None` serves plaintext
    pub tls: Option<TlsPaths>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            credentials: Credentials::default(),
            tls: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let port = match get(ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_PORT.to_string()))?,
            None => DEFAULT_PORT,
        };

        // A lone cert or key is as good as none: the transport falls back to plaintext
        let tls = match (get(ENV_CERT), get(ENV_KEY)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        Ok(ServerConfig {
            host: get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            credentials: Credentials {
                username: get(ENV_USERNAME),
                password: get(ENV_PASSWORD),
            },
            tls,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_tls(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsPaths {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        });
        self
    }

    /// `host:port` string used for binding.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
