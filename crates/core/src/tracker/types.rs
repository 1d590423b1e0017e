//! Types for the tracker client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;

use super::categories::Category;

/// A normalized search request. Immutable once built for a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search term.
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub categories: Vec<Category>,
    /// `tt0123456` or bare digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u64>,
    /// Season number, or a four-digit year for daily shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    /// Episode number, or `MM/DD` for daily shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default)]
    pub freeleech_only: bool,
}

impl SearchQuery {
    pub fn text(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_episode(mut self, season: impl Into<String>, episode: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self.episode = Some(episode.into());
        self
    }

    pub fn with_page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Whether an external id drives this search.
    pub fn has_external_id(&self) -> bool {
        self.imdb_id.as_deref().is_some_and(|s| !s.trim().is_empty()) || self.tvdb_id.is_some()
    }
}

/// A normalized torrent listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tracker: String,
    /// Native torrent id.
    pub torrent_id: String,
    /// Never empty.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    pub download_url: String,
    pub categories: BTreeSet<Category>,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    pub peers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grabs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<u32>,
    pub publish_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub douban_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Share of downloaded bytes counted against the account (0 = freeleech).
    pub download_factor: f64,
    /// Share of uploaded bytes credited to the account.
    pub upload_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_seed_time_secs: Option<u64>,
}

impl Release {
    pub fn is_freeleech(&self) -> bool {
        self.download_factor == 0.0
    }
}

/// Which step of a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    Auth,
    Query,
    Parse,
    Download,
}

impl std::fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPhase::Auth => write!(f, "auth"),
            ErrorPhase::Query => write!(f, "query"),
            ErrorPhase::Parse => write!(f, "parse"),
            ErrorPhase::Download => write!(f, "download"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackerErrorKind {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Manual step required: {0}")]
    ManualStepRequired(String),

    #[error("Session expired after relogin")]
    SessionExpired,

    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(", retry in {}s", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Tracker API error: {0}")]
    Api(String),

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TrackerErrorKind {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TrackerErrorKind::InvalidCredentials(_) => "invalid_credentials",
            TrackerErrorKind::ManualStepRequired(_) => "manual_step_required",
            TrackerErrorKind::SessionExpired => "session_expired",
            TrackerErrorKind::RateLimited { .. } => "rate_limited",
            TrackerErrorKind::MalformedResponse(_) => "malformed_response",
            TrackerErrorKind::Api(_) => "api",
            TrackerErrorKind::Http { .. } => "http",
            TrackerErrorKind::Transport(_) => "transport",
            TrackerErrorKind::Timeout => "timeout",
            TrackerErrorKind::Cancelled => "cancelled",
            TrackerErrorKind::Configuration(_) => "configuration",
        }
    }
}

impl From<AuthError> for TrackerErrorKind {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials(msg) => TrackerErrorKind::InvalidCredentials(msg),
            AuthError::ManualStepRequired(msg) => TrackerErrorKind::ManualStepRequired(msg),
            AuthError::ParseFailure(msg) => TrackerErrorKind::MalformedResponse(msg),
            AuthError::Transport(msg) => TrackerErrorKind::Transport(msg),
            AuthError::ConfigurationError(msg) => TrackerErrorKind::Configuration(msg),
        }
    }
}

/// A call-level failure with the tracker and phase it happened in.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{tracker}: {phase} failed: {kind}")]
pub struct TrackerError {
    pub tracker: String,
    pub phase: ErrorPhase,
    pub kind: TrackerErrorKind,
}

impl TrackerError {
    pub fn new(tracker: impl Into<String>, phase: ErrorPhase, kind: TrackerErrorKind) -> Self {
        Self {
            tracker: tracker.into(),
            phase,
            kind,
        }
    }

    /// Whether the caller may retry the whole call later.
    ///
    /// Nothing here is retried inside the client beyond the single relogin.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TrackerErrorKind::RateLimited { .. }
                | TrackerErrorKind::Transport(_)
                | TrackerErrorKind::Timeout
        )
    }
}

/// Why a single row could not be normalized.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowFailure {
    #[error("unparsable timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("row is not an object")]
    NotAnObject,
}

/// Why a row was left out without being an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum SkipReason {
    /// A required field (title, category, download URL, size, seeders) is absent.
    MissingField(String),
    EmptyTitle,
    /// The post-parse hook discarded the row.
    HookDiscard,
    /// The title lacks one of the query terms.
    QueryMismatch,
    /// The row filter hook rejected the raw row.
    AdapterSkip,
    /// Freeleech-only search and the release is not free.
    NotFreeleech,
    UnknownCategory,
}

impl SkipReason {
    pub fn missing(field: &str) -> Self {
        SkipReason::MissingField(field.to_string())
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing {}", field),
            SkipReason::EmptyTitle => write!(f, "empty title"),
            SkipReason::HookDiscard => write!(f, "discarded by hook"),
            SkipReason::QueryMismatch => write!(f, "title does not match query"),
            SkipReason::AdapterSkip => write!(f, "skipped by row filter"),
            SkipReason::NotFreeleech => write!(f, "not freeleech"),
            SkipReason::UnknownCategory => write!(f, "unknown category"),
        }
    }
}

/// A per-row issue tagged with its position in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport<T> {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent_id: Option<String>,
    pub detail: T,
}

/// One page of results from one tracker.
///
/// An empty `releases` list is a successful search that matched nothing.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub tracker: String,
    pub releases: Vec<Release>,
    pub row_failures: Vec<RowReport<RowFailure>>,
    pub skipped: Vec<RowReport<SkipReason>>,
    pub duration_ms: u64,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

/// A searchable tracker.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Stable tracker id, used for logging and metrics.
    fn id(&self) -> &str;

    /// Run one search and return one page of normalized releases.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, TrackerError>;

    /// Fetch a torrent file through the authenticated session.
    async fn download(&self, url: &str) -> Result<Vec<u8>, TrackerError>;
}
