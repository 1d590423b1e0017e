//! Two-factor gated login.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::LoginLayout;
use crate::transport::{Transport, TransportRequest};

use super::password::authorize_with_layout;
use super::{AuthError, AuthMode, Authenticator, Session, SessionGrant};

/// Authenticator for accounts behind a two-factor challenge.
///
/// The challenge cannot be answered headlessly. A session cookie copied from
/// a browser can be supplied once; when it is absent or has already been
/// rejected, every handshake returns [`AuthError::ManualStepRequired`].
pub struct TwoFactorAuthenticator {
    username: String,
    cookie: Option<String>,
    cookie_spent: AtomicBool,
    layout: LoginLayout,
}

impl TwoFactorAuthenticator {
    pub fn new(username: String, cookie: Option<String>, layout: LoginLayout) -> Self {
        Self {
            username,
            cookie: cookie.filter(|c| !c.trim().is_empty()),
            cookie_spent: AtomicBool::new(false),
            layout,
        }
    }

    /// Whether a usable manual cookie is still available.
    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some() && !self.cookie_spent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for TwoFactorAuthenticator {
    async fn login(
        &self,
        _transport: &dyn Transport,
        _base_url: &str,
    ) -> Result<SessionGrant, AuthError> {
        if let Some(cookie) = &self.cookie {
            if !self.cookie_spent.swap(true, Ordering::SeqCst) {
                info!(user = %self.username, "Using manually supplied session cookie");
                return Ok(SessionGrant {
                    token: cookie.clone(),
                    ..Default::default()
                });
            }
            warn!(user = %self.username, "Manual session cookie was rejected");
        }

        Err(AuthError::ManualStepRequired(format!(
            "account '{}' needs a two-factor login in a browser; supply its session cookie",
            self.username
        )))
    }

    fn authorize(&self, session: &Session, request: &mut TransportRequest) {
        authorize_with_layout(&self.layout, session, request);
    }

    fn mode(&self) -> AuthMode {
        AuthMode::TwoFactor
    }
}
