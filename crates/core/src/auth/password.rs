//! Username/password login exchange.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{LoginLayout, TokenSource};
use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

use super::{AuthError, AuthMode, Authenticator, Session, SessionGrant};

/// Authenticator that posts a login form and keeps the returned
/// cookie or token.
pub struct PasswordAuthenticator {
    username: String,
    password: String,
    layout: LoginLayout,
}

impl PasswordAuthenticator {
    pub fn new(username: String, password: String, layout: LoginLayout) -> Self {
        Self {
            username,
            password,
            layout,
        }
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn login(
        &self,
        transport: &dyn Transport,
        base_url: &str,
    ) -> Result<SessionGrant, AuthError> {
        let response = submit_login(
            transport,
            base_url,
            &self.layout,
            &self.username,
            &self.password,
        )
        .await?;
        parse_login_response(&self.layout, &response)
    }

    fn authorize(&self, session: &Session, request: &mut TransportRequest) {
        authorize_with_layout(&self.layout, session, request);
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Password
    }
}

pub(crate) fn authorize_with_layout(
    layout: &LoginLayout,
    session: &Session,
    request: &mut TransportRequest,
) {
    if let Some(token) = session.token() {
        let header = &layout.session_header;
        request
            .headers
            .push((header.name.clone(), header.render(token)));
    }
}

pub(crate) async fn submit_login(
    transport: &dyn Transport,
    base_url: &str,
    layout: &LoginLayout,
    username: &str,
    password: &str,
) -> Result<TransportResponse, AuthError> {
    let mut request = TransportRequest::post(layout.path.as_str())
        .with_form(layout.username_field.as_str(), username)
        .with_form(layout.password_field.as_str(), password);
    for (name, value) in &layout.extra_fields {
        request = request.with_form(name.as_str(), value.as_str());
    }

    debug!(path = %layout.path, "Submitting login form");

    transport
        .send(base_url, &request)
        .await
        .map_err(|e| match e {
            TransportError::Timeout => AuthError::Transport("login timed out".to_string()),
            other => AuthError::Transport(other.to_string()),
        })
}

/// Interpret a login response.
///
/// Rejections are checked before the token so a tracker that sets a
/// throwaway cookie on a failed login is still reported as a rejection.
pub(crate) fn parse_login_response(
    layout: &LoginLayout,
    response: &TransportResponse,
) -> Result<SessionGrant, AuthError> {
    let body = response.text();
    let body_lower = body.to_lowercase();

    if response.status == 401 || response.status == 403 {
        return Err(AuthError::InvalidCredentials(format!(
            "login rejected with HTTP {}",
            response.status
        )));
    }
    if response.status >= 500 {
        return Err(AuthError::Transport(format!(
            "login failed with HTTP {}",
            response.status
        )));
    }

    let location = response.location().unwrap_or_default().to_lowercase();
    if let Some(marker) = layout
        .two_factor_markers
        .iter()
        .find(|m| contains_marker(&body_lower, m) || contains_marker(&location, m))
    {
        return Err(AuthError::ManualStepRequired(format!(
            "tracker asked for a two-factor code ({})",
            marker
        )));
    }

    if let Some(marker) = layout
        .failure_markers
        .iter()
        .find(|m| contains_marker(&body_lower, m))
    {
        return Err(AuthError::InvalidCredentials(marker.clone()));
    }

    let json: Option<Value> = serde_json::from_str(&body).ok();

    let token = match &layout.token {
        TokenSource::Cookie { name } => find_cookie(response, name),
        TokenSource::Json { pointer } => json
            .as_ref()
            .and_then(|v| v.pointer(pointer))
            .and_then(value_as_string),
    };

    let Some(token) = token else {
        warn!(status = response.status, "Login response carried no session token");
        return Err(AuthError::ParseFailure(
            "no session token in login response".to_string(),
        ));
    };

    let lookup = |pointer: &Option<String>| {
        pointer
            .as_deref()
            .and_then(|p| json.as_ref().and_then(|v| v.pointer(p)))
            .and_then(value_as_string)
    };

    Ok(SessionGrant {
        token,
        passkey: lookup(&layout.passkey_pointer),
        authkey: lookup(&layout.authkey_pointer),
    })
}

fn contains_marker(haystack: &str, marker: &str) -> bool {
    !marker.is_empty() && haystack.contains(&marker.to_lowercase())
}

/// `name=value` of the named `Set-Cookie`, skipping deletions.
fn find_cookie(response: &TransportResponse, name: &str) -> Option<String> {
    response.headers_named("set-cookie").find_map(|header| {
        let pair = header.split(';').next()?.trim();
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name && !value.is_empty() && value != "deleted" {
            Some(format!("{}={}", key.trim(), value))
        } else {
            None
        }
    })
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
