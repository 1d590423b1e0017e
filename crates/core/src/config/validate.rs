use std::collections::HashSet;

use crate::auth::Credentials;

use super::{
    types::{Config, DiscountScheme, TrackerConfig},
    ConfigError,
};

/// Longest allowed gap between requests to one tracker.
const MAX_REQUEST_DELAY_MS: u64 = 60_000;

/// Validate configuration
/// Currently validates:
/// - Tracker ids are non-empty and unique
/// - Each tracker has at least one base URL and a category table
/// - API keys fit the configured length bounds
/// - Discount factors are finite and non-negative
/// - Request delay is at most a minute
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for tracker in &config.trackers {
        validate_tracker(tracker)?;
        if !seen.insert(tracker.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate tracker id '{}'",
                tracker.id
            )));
        }
    }
    Ok(())
}

/// Validate a single tracker section.
pub fn validate_tracker(tracker: &TrackerConfig) -> Result<(), ConfigError> {
    let fail = |msg: String| Err(ConfigError::ValidationError(msg));

    if tracker.id.trim().is_empty() {
        return fail("tracker id cannot be empty".to_string());
    }
    let id = &tracker.id;

    if tracker.base_urls.is_empty() {
        return fail(format!("{}: base_urls cannot be empty", id));
    }
    for url in &tracker.base_urls {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return fail(format!("{}: base URL '{}' must be http(s)", id, url));
        }
    }

    if tracker.categories.is_empty() {
        return fail(format!("{}: category table cannot be empty", id));
    }

    if tracker.min_request_delay_ms > MAX_REQUEST_DELAY_MS {
        return fail(format!(
            "{}: min_request_delay_ms cannot exceed {}",
            id, MAX_REQUEST_DELAY_MS
        ));
    }

    if tracker.timeout_secs == 0 {
        return fail(format!("{}: timeout_secs cannot be 0", id));
    }

    match &tracker.credentials {
        Credentials::ApiKey { key } => {
            if key.is_empty() {
                return fail(format!("{}: api key cannot be empty", id));
            }
            if let Some(bounds) = tracker.auth.api_key_length {
                if !bounds.contains(key.len()) {
                    return fail(format!(
                        "{}: api key length {} outside {}..={}",
                        id,
                        key.len(),
                        bounds.min,
                        bounds.max
                    ));
                }
            }
        }
        Credentials::Password { username, .. } | Credentials::TwoFactor { username, .. } => {
            if username.is_empty() {
                return fail(format!("{}: username cannot be empty", id));
            }
        }
    }

    if let DiscountScheme::Code { codes, .. } = &tracker.discount {
        for code in codes {
            for factor in [code.download, code.upload] {
                if !factor.is_finite() || factor < 0.0 {
                    return fail(format!(
                        "{}: discount code '{}' has invalid factor {}",
                        id, code.code, factor
                    ));
                }
            }
        }
    }

    if let Some(ratio) = tracker.minimum_ratio {
        if !ratio.is_finite() || ratio < 0.0 {
            return fail(format!("{}: minimum_ratio must be non-negative", id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscountCode, LengthBounds};
    use crate::tracker::{Category, CategoryEntry};

    fn tracker(id: &str) -> TrackerConfig {
        let toml = format!(
            r#"
id = "{}"
base_urls = ["https://{}.example"]
credentials = {{ mode = "api_key", key = "0123456789" }}
categories = [{{ native = "1", category = 2000 }}]
"#,
            id, id
        );
        toml::from_str(&toml).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config {
            trackers: vec![tracker("a"), tracker("b")],
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let config = Config {
            trackers: vec![tracker("a"), tracker("a")],
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_no_base_urls_fails() {
        let mut t = tracker("a");
        t.base_urls.clear();
        assert!(matches!(
            validate_tracker(&t),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_non_http_base_url_fails() {
        let mut t = tracker("a");
        t.base_urls = vec!["ftp://a.example".to_string()];
        assert!(validate_tracker(&t).is_err());
    }

    #[test]
    fn test_empty_category_table_fails() {
        let mut t = tracker("a");
        t.categories.clear();
        assert!(validate_tracker(&t).is_err());

        t.categories.push(CategoryEntry::new("5", Category::TV, "TV"));
        assert!(validate_tracker(&t).is_ok());
    }

    #[test]
    fn test_api_key_length_bounds() {
        let mut t = tracker("a");
        t.auth.api_key_length = Some(LengthBounds { min: 32, max: 32 });
        assert!(validate_tracker(&t).is_err());

        t.auth.api_key_length = Some(LengthBounds { min: 8, max: 12 });
        assert!(validate_tracker(&t).is_ok());
    }

    #[test]
    fn test_negative_discount_fails() {
        let mut t = tracker("a");
        t.discount = DiscountScheme::Code {
            field: "/free".to_string(),
            codes: vec![DiscountCode {
                code: "x".to_string(),
                download: -1.0,
                upload: 1.0,
            }],
        };
        assert!(validate_tracker(&t).is_err());
    }

    #[test]
    fn test_excessive_delay_fails() {
        let mut t = tracker("a");
        t.min_request_delay_ms = 120_000;
        assert!(validate_tracker(&t).is_err());
    }
}
