//! API key authentication.

use async_trait::async_trait;

use crate::config::{HeaderTemplate, LengthBounds};
use crate::transport::{Transport, TransportRequest};

use super::{AuthError, AuthMode, Authenticator, Session, SessionGrant};

/// Authenticator for trackers where the key itself is the session.
///
/// The key is sent on every request through a header template, e.g.
/// `Authorization: token {value}`. There is no login exchange.
pub struct ApiKeyAuthenticator {
    key: String,
    header: HeaderTemplate,
}

impl ApiKeyAuthenticator {
    pub fn new(
        key: String,
        header: HeaderTemplate,
        bounds: Option<LengthBounds>,
    ) -> Result<Self, AuthError> {
        if key.is_empty() {
            return Err(AuthError::ConfigurationError(
                "api key cannot be empty".to_string(),
            ));
        }
        if let Some(bounds) = bounds {
            if !bounds.contains(key.len()) {
                return Err(AuthError::ConfigurationError(format!(
                    "api key must be {}..={} characters, got {}",
                    bounds.min,
                    bounds.max,
                    key.len()
                )));
            }
        }
        Ok(Self { key, header })
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn login(
        &self,
        _transport: &dyn Transport,
        _base_url: &str,
    ) -> Result<SessionGrant, AuthError> {
        Ok(SessionGrant {
            token: self.key.clone(),
            ..Default::default()
        })
    }

    fn authorize(&self, session: &Session, request: &mut TransportRequest) {
        if let Some(token) = session.token() {
            request
                .headers
                .push((self.header.name.clone(), self.header.render(token)));
        }
    }

    fn mode(&self) -> AuthMode {
        AuthMode::ApiKey
    }
}
