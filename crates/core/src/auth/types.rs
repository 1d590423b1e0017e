use serde::{Deserialize, Serialize};

/// Static credentials for one tracker. The mode is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Credentials {
    /// The key itself is the session; no login exchange.
    ApiKey { key: String },
    /// Username/password login exchange.
    Password { username: String, password: String },
    /// Login gated by a two-factor challenge a human must complete.
    ///
    /// `cookie` holds a session obtained manually in a browser, if any.
    /// No password is taken; the challenge is never answered here.
    TwoFactor {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cookie: Option<String>,
    },
}

impl Credentials {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credentials::ApiKey { .. } => AuthMode::ApiKey,
            Credentials::Password { .. } => AuthMode::Password,
            Credentials::TwoFactor { .. } => AuthMode::TwoFactor,
        }
    }
}

/// Which credential mode a session was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    ApiKey,
    Password,
    TwoFactor,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::ApiKey => "api_key",
            AuthMode::Password => "password",
            AuthMode::TwoFactor => "two_factor",
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    /// A request signalled invalidation; the next use runs the handshake again.
    SuspectedExpired,
}

/// What a successful handshake yields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionGrant {
    /// Opaque token or cookie sent with every request.
    pub token: String,
    pub passkey: Option<String>,
    pub authkey: Option<String>,
}

impl std::fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGrant")
            .field("token", &"<redacted>")
            .field("passkey", &self.passkey.as_ref().map(|_| "<redacted>"))
            .field("authkey", &self.authkey.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Snapshot of a tracker session.
///
/// Callers receive clones; the authoritative copy lives inside the
/// [`SessionManager`](super::SessionManager).
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub mode: AuthMode,
    pub state: SessionState,
    token: Option<String>,
    /// Last-seen-valid hint, not a TTL.
    pub expires_hint: bool,
    /// Secondary secret used only in download URLs.
    pub passkey: Option<String>,
    pub authkey: Option<String>,
    /// Incremented on every successful handshake.
    pub generation: u64,
}

impl Session {
    pub fn new(mode: AuthMode, passkey: Option<String>) -> Self {
        Self {
            mode,
            state: SessionState::Unauthenticated,
            token: None,
            expires_hint: false,
            passkey,
            authkey: None,
            generation: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated && self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Apply a successful handshake. A grant without a passkey keeps the
    /// statically configured one.
    pub(crate) fn establish(&mut self, grant: SessionGrant) {
        self.token = Some(grant.token);
        if grant.passkey.is_some() {
            self.passkey = grant.passkey;
        }
        if grant.authkey.is_some() {
            self.authkey = grant.authkey;
        }
        self.state = SessionState::Authenticated;
        self.expires_hint = true;
        self.generation += 1;
    }

    /// Forget the token without a failure signal.
    pub(crate) fn clear(&mut self) {
        self.token = None;
        self.state = SessionState::Unauthenticated;
        self.expires_hint = false;
    }

    /// Drop the token but keep static secrets.
    pub(crate) fn expire(&mut self) {
        self.token = None;
        self.state = SessionState::SuspectedExpired;
        self.expires_hint = false;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("expires_hint", &self.expires_hint)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_deserialize_by_mode() {
        let creds: Credentials = toml::from_str(
            r#"
mode = "password"
username = "alice"
password = "hunter2"
"#,
        )
        .unwrap();
        assert_eq!(creds.mode(), AuthMode::Password);

        let creds: Credentials = toml::from_str(
            r#"
mode = "two_factor"
username = "alice"
"#,
        )
        .unwrap();
        assert!(matches!(creds, Credentials::TwoFactor { cookie: None, .. }));

        let creds: Credentials = toml::from_str(
            r#"
mode = "two_factor"
username = "alice"
cookie = "session=browser"
"#,
        )
        .unwrap();
        assert_eq!(
            creds,
            Credentials::TwoFactor {
                username: "alice".to_string(),
                cookie: Some("session=browser".to_string()),
            }
        );
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new(AuthMode::Password, Some("static-pass".to_string()));
        assert!(!session.is_authenticated());
        assert_eq!(session.generation, 0);

        session.establish(SessionGrant {
            token: "session=abc".to_string(),
            passkey: None,
            authkey: Some("auth".to_string()),
        });
        assert!(session.is_authenticated());
        assert!(session.expires_hint);
        assert_eq!(session.generation, 1);
        assert_eq!(session.passkey.as_deref(), Some("static-pass"));

        session.expire();
        assert_eq!(session.state, SessionState::SuspectedExpired);
        assert!(session.token().is_none());
        assert!(!session.expires_hint);
        assert_eq!(session.passkey.as_deref(), Some("static-pass"));
        assert_eq!(session.authkey.as_deref(), Some("auth"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut session = Session::new(AuthMode::ApiKey, None);
        session.establish(SessionGrant {
            token: "super-secret".to_string(),
            ..Default::default()
        });
        let printed = format!("{:?}", session);
        assert!(!printed.contains("super-secret"));
    }
}
