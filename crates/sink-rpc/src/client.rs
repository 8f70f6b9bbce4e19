//! Client-side helpers for talking to a receiver.
//!
//! Used by the dummy agent and the integration tests.
//!
//! ## Example
//! ```rust,ignore
//! let channel = Endpoint::from_static("http://127.0.0.1:9999").connect().await?;
//! let mut client = ReceiverClient::with_interceptor(
//!     channel,
//!     CredentialsInterceptor::new("pgwatch", "secret"),
//! );
//! client.update_measurements(envelope).await?;
//! ```

use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};

use crate::auth::{PASSWORD_KEY, USERNAME_KEY};

/// Attaches `username` / `password` metadata to every outgoing request.
#[derive(Clone)]
pub struct CredentialsInterceptor {
    username: String,
    password: String,
}

impl CredentialsInterceptor {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Interceptor for CredentialsInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let username: MetadataValue<Ascii> = self
            .username
            .parse()
            .map_err(|_| Status::invalid_argument("Username is not a valid metadata value"))?;
        let password: MetadataValue<Ascii> = self
            .password
            .parse()
            .map_err(|_| Status::invalid_argument("Password is not a valid metadata value"))?;

        request.metadata_mut().insert(USERNAME_KEY, username);
        request.metadata_mut().insert(PASSWORD_KEY, password);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::metadata_bytes;

    #[test]
    fn test_credentials_attached() {
        let mut interceptor = CredentialsInterceptor::new("pgwatch", "secret");
        let request = interceptor.call(Request::new(())).unwrap();

        assert_eq!(metadata_bytes(request.metadata(), USERNAME_KEY), b"pgwatch");
        assert_eq!(metadata_bytes(request.metadata(), PASSWORD_KEY), b"secret");
    }

    #[test]
    fn test_non_ascii_sent_as_utf8() {
        let mut interceptor = CredentialsInterceptor::new("pgwatch", "pässword");
        let request = interceptor.call(Request::new(())).unwrap();

        assert_eq!(metadata_bytes(request.metadata(), PASSWORD_KEY), "pässword".as_bytes());
    }

    #[test]
    fn test_control_characters_rejected() {
        let mut interceptor = CredentialsInterceptor::new("pgwatch", "pass\nword");
        let status = interceptor.call(Request::new(())).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
