//! Per-tracker session lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::transport::{MirrorSet, Transport, TransportRequest};

use super::{AuthError, AuthMode, Authenticator, Session};

/// Owns one tracker's session and runs the handshake on demand.
///
/// The lock is held across the handshake, so concurrent callers that find
/// the session expired wait for a single login instead of racing their own.
pub struct SessionManager {
    tracker: String,
    authenticator: Box<dyn Authenticator>,
    transport: Arc<dyn Transport>,
    mirrors: Arc<MirrorSet>,
    session: Mutex<Session>,
    two_factor_required: AtomicBool,
}

impl SessionManager {
    pub fn new(
        tracker: impl Into<String>,
        authenticator: Box<dyn Authenticator>,
        transport: Arc<dyn Transport>,
        mirrors: Arc<MirrorSet>,
        passkey: Option<String>,
    ) -> Self {
        let mode = authenticator.mode();
        Self {
            tracker: tracker.into(),
            authenticator,
            transport,
            mirrors,
            session: Mutex::new(Session::new(mode, passkey)),
            two_factor_required: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.authenticator.mode()
    }

    /// Return an authenticated session, running the handshake if needed.
    pub async fn ensure_authenticated(&self) -> Result<Session, AuthError> {
        let mut session = self.session.lock().await;
        if session.is_authenticated() {
            return Ok(session.clone());
        }

        let base_url = self.mirrors.active();
        let relogin = session.generation > 0;
        debug!(tracker = %self.tracker, base_url = %base_url, relogin, "Running login handshake");

        match self
            .authenticator
            .login(&self.mirrors.over(self.transport.as_ref()), &base_url)
            .await
        {
            Ok(grant) => {
                session.establish(grant);
                self.two_factor_required.store(false, Ordering::SeqCst);
                metrics::LOGIN_ATTEMPTS
                    .with_label_values(&[self.tracker.as_str(), "success"])
                    .inc();
                if relogin {
                    metrics::RELOGINS.with_label_values(&[self.tracker.as_str()]).inc();
                }
                info!(
                    tracker = %self.tracker,
                    mode = self.authenticator.method_name(),
                    generation = session.generation,
                    "Authenticated"
                );
                Ok(session.clone())
            }
            Err(e) => {
                let result = match &e {
                    AuthError::InvalidCredentials(_) => "invalid_credentials",
                    AuthError::ManualStepRequired(_) => {
                        self.two_factor_required.store(true, Ordering::SeqCst);
                        "manual_step_required"
                    }
                    AuthError::ParseFailure(_) => "parse_failure",
                    AuthError::Transport(_) => "transport",
                    AuthError::ConfigurationError(_) => "configuration",
                };
                metrics::LOGIN_ATTEMPTS
                    .with_label_values(&[self.tracker.as_str(), result])
                    .inc();
                warn!(tracker = %self.tracker, error = %e, "Login failed");
                Err(e)
            }
        }
    }

    /// Forget the current token; static credentials are kept.
    pub async fn invalidate(&self) {
        self.session.lock().await.clear();
        debug!(tracker = %self.tracker, "Session invalidated");
    }

    /// Mark `seen` as expired unless a newer session already replaced it.
    ///
    /// Returns whether the session was invalidated.
    pub async fn invalidate_stale(&self, seen: &Session) -> bool {
        let mut session = self.session.lock().await;
        if session.generation == seen.generation && session.is_authenticated() {
            session.expire();
            debug!(tracker = %self.tracker, generation = seen.generation, "Session suspected expired");
            true
        } else {
            false
        }
    }

    /// Whether the last handshake stopped at a two-factor challenge.
    pub fn is_two_factor_required(&self) -> bool {
        self.two_factor_required.load(Ordering::SeqCst)
    }

    /// Snapshot of the current session.
    pub async fn current(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub fn authorize(&self, session: &Session, request: &mut TransportRequest) {
        self.authenticator.authorize(session, request);
    }
}
