//! Immutable per-tracker settings resolved from configuration.

use std::time::Duration;

use crate::auth::Credentials;
use crate::config::{
    validate_tracker, AuthLayout, ConfigError, DefaultPolicies, DiscountScheme, QueryLayout,
    ResponseLayout, TimestampFormat, TokenConfig, TrackerConfig,
};

use super::categories::CategoryMapper;

/// Everything the client needs to talk to one tracker.
///
/// Built once from a validated [`TrackerConfig`] and never mutated.
#[derive(Debug, Clone)]
pub struct TrackerProfile {
    pub id: String,
    pub name: String,
    pub base_urls: Vec<String>,
    pub credentials: Credentials,
    pub passkey: Option<String>,
    pub min_request_delay: Duration,
    pub timeout: Duration,
    pub auth: AuthLayout,
    pub tokens: TokenConfig,
    pub query: QueryLayout,
    pub response: ResponseLayout,
    pub discount: DiscountScheme,
    pub timestamps: TimestampFormat,
    pub policies: DefaultPolicies,
    pub ids_in_tags: bool,
    pub match_query: bool,
    pub categories: CategoryMapper,
    pub all_categories: Vec<String>,
    pub minimum_ratio: Option<f64>,
    pub minimum_seed_time_secs: Option<u64>,
}

impl TrackerProfile {
    pub fn from_config(config: &TrackerConfig) -> Result<Self, ConfigError> {
        validate_tracker(config)?;

        Ok(Self {
            id: config.id.clone(),
            name: config.display_name().to_string(),
            base_urls: config.base_urls.clone(),
            credentials: config.credentials.clone(),
            passkey: config.passkey.clone().filter(|p| !p.is_empty()),
            min_request_delay: Duration::from_millis(config.min_request_delay_ms),
            timeout: Duration::from_secs(config.timeout_secs as u64),
            auth: config.auth.clone(),
            tokens: config.tokens.clone(),
            query: config.query.clone(),
            response: config.response.clone(),
            discount: config.discount.clone(),
            timestamps: config.timestamps.clone(),
            policies: config.policies.clone(),
            ids_in_tags: config.ids_in_tags,
            match_query: config.match_query,
            categories: CategoryMapper::new(config.categories.clone()),
            all_categories: config.all_categories.clone(),
            minimum_ratio: config.minimum_ratio,
            minimum_seed_time_secs: config.minimum_seed_time_secs,
        })
    }

    /// Host of the primary base URL. Clients of the same site share request
    /// timing even when they are configured under different ids.
    pub fn site(&self) -> String {
        self.base_urls
            .first()
            .and_then(|url| host_of(url))
            .unwrap_or_else(|| self.id.clone())
    }

    /// Whether download URLs should carry the token marker for a release
    /// with this download factor.
    pub fn can_use_token(&self, download_factor: f64) -> bool {
        self.tokens.supported && self.tokens.enabled && download_factor != 0.0
    }
}

fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}
