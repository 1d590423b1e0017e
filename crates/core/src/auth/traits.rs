use async_trait::async_trait;
use thiserror::Error;

use crate::transport::{Transport, TransportRequest};

use super::types::{AuthMode, Session, SessionGrant};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The tracker rejected the credentials. Never retried automatically.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A human has to finish a two-factor challenge.
    #[error("Manual step required: {0}")]
    ManualStepRequired(String),

    #[error("Malformed login response: {0}")]
    ParseFailure(String),

    #[error("Login transport failed: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// One credential mode's handshake and request signing.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run the handshake against `base_url` and return what it yielded.
    async fn login(
        &self,
        transport: &dyn Transport,
        base_url: &str,
    ) -> Result<SessionGrant, AuthError>;

    /// Attach the session's credentials to an outgoing request.
    fn authorize(&self, session: &Session, request: &mut TransportRequest);

    fn mode(&self) -> AuthMode;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str {
        self.mode().as_str()
    }
}
