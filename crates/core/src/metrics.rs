//! Prometheus metrics for the tracker client.
//!
//! This module provides metrics for:
//! - Searches and downloads per tracker
//! - Session handshakes and relogins
//! - Row normalization outcomes
//! - Throttle waits

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Searches
// =============================================================================

/// Searches total by tracker and result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trackline_searches_total", "Total tracker searches"),
        &["tracker", "result"], // "success", "empty", or the error kind
    )
    .unwrap()
});

/// Search duration in seconds, including auth and throttling.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "trackline_search_duration_seconds",
            "Duration of tracker searches",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["tracker"],
    )
    .unwrap()
});

/// Raw rows by normalization outcome.
pub static ROWS_MAPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trackline_rows_total", "Raw result rows by outcome"),
        &["tracker", "outcome"], // "release", "skipped", "failed"
    )
    .unwrap()
});

// =============================================================================
// Sessions
// =============================================================================

/// Login handshakes by tracker and result.
pub static LOGIN_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trackline_login_attempts_total", "Total login handshakes"),
        &["tracker", "result"],
    )
    .unwrap()
});

/// Handshakes after an expired session.
pub static RELOGINS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trackline_relogins_total", "Logins after session expiry"),
        &["tracker"],
    )
    .unwrap()
});

// =============================================================================
// Downloads
// =============================================================================

/// Torrent file downloads by tracker and result.
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("trackline_downloads_total", "Total torrent file downloads"),
        &["tracker", "result"],
    )
    .unwrap()
});

/// Freeleech token use by tracker and result.
pub static TOKEN_DOWNLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "trackline_token_downloads_total",
            "Downloads that tried to spend a freeleech token",
        ),
        &["tracker", "result"], // "spent", "fallback"
    )
    .unwrap()
});

// =============================================================================
// Throttling
// =============================================================================

/// Time spent waiting for the per-tracker request slot.
pub static THROTTLE_WAIT: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "trackline_throttle_wait_seconds",
            "Time spent waiting on the per-site rate limit",
        )
        .buckets(vec![0.0, 0.1, 0.5, 1.0, 2.0, 3.0, 6.0, 10.0]),
        &["site"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Searches
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(ROWS_MAPPED.clone()),
        // Sessions
        Box::new(LOGIN_ATTEMPTS.clone()),
        Box::new(RELOGINS.clone()),
        // Downloads
        Box::new(DOWNLOADS_TOTAL.clone()),
        Box::new(TOKEN_DOWNLOADS.clone()),
        // Throttling
        Box::new(THROTTLE_WAIT.clone()),
    ]
}
