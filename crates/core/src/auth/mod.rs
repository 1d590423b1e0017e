mod api_key;
mod password;
mod session;
mod traits;
mod two_factor;
mod types;

pub use api_key::*;
pub use password::PasswordAuthenticator;
pub use session::*;
pub use traits::*;
pub use two_factor::*;
pub use types::*;

use crate::config::AuthLayout;

/// Factory function to create the authenticator for a credential mode
pub fn create_authenticator(
    credentials: &Credentials,
    layout: &AuthLayout,
) -> Result<Box<dyn Authenticator>, AuthError> {
    match credentials {
        Credentials::ApiKey { key } => Ok(Box::new(ApiKeyAuthenticator::new(
            key.clone(),
            layout.api_key_header.clone(),
            layout.api_key_length,
        )?)),
        Credentials::Password { username, password } => {
            if username.is_empty() {
                return Err(AuthError::ConfigurationError(
                    "username must be set for password login".to_string(),
                ));
            }
            Ok(Box::new(PasswordAuthenticator::new(
                username.clone(),
                password.clone(),
                layout.login.clone(),
            )))
        }
        Credentials::TwoFactor { username, cookie } => Ok(Box::new(TwoFactorAuthenticator::new(
            username.clone(),
            cookie.clone(),
            layout.login.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_authenticator_api_key() {
        let creds = Credentials::ApiKey {
            key: "secret-key".to_string(),
        };
        let auth = create_authenticator(&creds, &AuthLayout::default()).unwrap();
        assert_eq!(auth.method_name(), "api_key");
    }

    #[test]
    fn test_create_authenticator_password() {
        let creds = Credentials::Password {
            username: "alice".to_string(),
            password: "pw".to_string(),
        };
        let auth = create_authenticator(&creds, &AuthLayout::default()).unwrap();
        assert_eq!(auth.mode(), AuthMode::Password);
    }

    #[test]
    fn test_create_authenticator_two_factor() {
        let creds = Credentials::TwoFactor {
            username: "alice".to_string(),
            cookie: None,
        };
        let auth = create_authenticator(&creds, &AuthLayout::default()).unwrap();
        assert_eq!(auth.method_name(), "two_factor");
    }

    #[test]
    fn test_create_authenticator_empty_key() {
        let creds = Credentials::ApiKey { key: String::new() };
        let result = create_authenticator(&creds, &AuthLayout::default());
        assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
    }
}
