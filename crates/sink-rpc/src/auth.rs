//! Credential authentication module.
//!
//! Callers send `username` / `password` as gRPC metadata on every call. The
//! server compares them with the credentials from [`ServerConfig`]; unset
//! server fields are not checked.
//!
//! [`ServerConfig`]: crate::config::ServerConfig

use tonic::metadata::MetadataMap;

use crate::config::Credentials;
use crate::error::{RpcError, RpcResult};
use crate::interceptor::{CallInfo, Interceptor};

/// Metadata key carrying the caller's username.
pub const USERNAME_KEY: &str = "username";

/// Metadata key carrying the caller's password.
pub const PASSWORD_KEY: &str = "password";

/// Rejects calls whose credentials do not match the server's.
#[derive(Debug, Clone)]
pub struct AuthInterceptor {
    credentials: Credentials,
}

impl AuthInterceptor {
    pub fn new(credentials: Credentials) -> Self {
        AuthInterceptor { credentials }
    }

    /// Checks the credentials carried in request metadata.
    pub fn authenticate(&self, metadata: &MetadataMap) -> RpcResult<()> {
        let username = metadata_bytes(metadata, USERNAME_KEY);
        let password = metadata_bytes(metadata, PASSWORD_KEY);

        if self.credentials.is_authenticated(username, password) {
            Ok(())
        } else {
            Err(RpcError::Unauthenticated)
        }
    }
}

impl Interceptor for AuthInterceptor {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn intercept(&self, call: &CallInfo<'_>) -> RpcResult<()> {
        self.authenticate(call.metadata)
    }
}

/// Raw bytes of a metadata value. A missing key reads as empty.
///
/// Header values may carry bytes above 0x7f, so UTF-8 credentials arrive
/// intact and are compared as bytes.
pub fn metadata_bytes<'a>(metadata: &'a MetadataMap, key: &str) -> &'a [u8] {
    metadata.get(key).map(|v| v.as_bytes()).unwrap_or_default()
}
