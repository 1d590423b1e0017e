//! Minimum-delay request throttling, one throttle per site.
//!
//! Each site gets its own [`RequestThrottle`]; waiting on one never holds
//! a lock another site needs. Callers for the same site are released in
//! arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::metrics::THROTTLE_WAIT;

/// The wait was abandoned because the caller cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Throttle wait cancelled")]
pub struct WaitCancelled;

/// Enforces a minimum delay between consecutive requests to one site.
#[derive(Debug)]
pub struct RequestThrottle {
    site: String,
    min_delay: Duration,
    /// When the last request was released. The mutex is fair, so queued
    /// callers are served FIFO.
    last_release: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(site: impl Into<String>, min_delay: Duration) -> Self {
        Self {
            site: site.into(),
            min_delay,
            last_release: Mutex::new(None),
        }
    }

    /// Wait until at least `min_delay` has passed since the previous release.
    ///
    /// Returns how long the caller was held back. Dropping the future while
    /// it sleeps leaves the previous release time untouched.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        let mut last = self.last_release.lock().await;

        if let Some(previous) = *last {
            let deadline = previous + self.min_delay;
            if deadline > Instant::now() {
                tokio::time::sleep_until(deadline).await;
            }
        }

        *last = Some(Instant::now());
        let waited = started.elapsed();
        THROTTLE_WAIT
            .with_label_values(&[self.site.as_str()])
            .observe(waited.as_secs_f64());
        waited
    }

    /// Like [`acquire`](Self::acquire) but aborts as soon as `cancel` fires.
    pub async fn acquire_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Duration, WaitCancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WaitCancelled),
            waited = self.acquire() => Ok(waited),
        }
    }
}

/// Throttles keyed by site.
///
/// The map lock is only held to look up the throttle, never while waiting,
/// so unrelated sites do not serialize each other.
#[derive(Debug, Default)]
pub struct ThrottlePool {
    throttles: RwLock<HashMap<String, Arc<RequestThrottle>>>,
}

impl ThrottlePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the throttle for a site, creating it on first use.
    ///
    /// An existing throttle keeps its original delay.
    pub async fn throttle_for(&self, site: &str, min_delay: Duration) -> Arc<RequestThrottle> {
        if let Some(existing) = self.throttles.read().await.get(site) {
            return Arc::clone(existing);
        }
        let mut throttles = self.throttles.write().await;
        Arc::clone(
            throttles
                .entry(site.to_string())
                .or_insert_with(|| Arc::new(RequestThrottle::new(site, min_delay))),
        )
    }
}
