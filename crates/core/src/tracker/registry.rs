//! Every configured tracker behind one handle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::transport::{HttpTransport, Transport};

use super::client::TrackerClient;
use super::hooks::AdapterHooks;
use super::profile::TrackerProfile;
use super::rate_limiter::ThrottlePool;
use super::types::{ErrorPhase, SearchQuery, SearchResult, Tracker, TrackerError, TrackerErrorKind};

/// Outcome of a fan-out search.
///
/// Trackers that failed are reported in `errors`; the others still return
/// their results.
#[derive(Debug, Default, Serialize)]
pub struct MultiSearchResult {
    pub results: Vec<SearchResult>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: HashMap<String, TrackerError>,
    pub duration_ms: u64,
}

impl MultiSearchResult {
    pub fn release_count(&self) -> usize {
        self.results.iter().map(|r| r.releases.len()).sum()
    }
}

fn serialize_errors<S>(errors: &HashMap<String, TrackerError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let as_text: BTreeMap<&String, String> =
        errors.iter().map(|(id, e)| (id, e.to_string())).collect();
    as_text.serialize(serializer)
}

/// Trackers keyed by id. Throttles are pooled by site, so two ids pointing
/// at the same host share request timing.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: BTreeMap<String, Arc<dyn Tracker>>,
    throttles: ThrottlePool,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client per configured tracker over a real HTTP transport.
    pub async fn from_config(config: &Config) -> Result<Self, TrackerError> {
        let mut registry = Self::new();
        for tracker in &config.trackers {
            let profile = TrackerProfile::from_config(tracker).map_err(|e| {
                TrackerError::new(
                    &tracker.id,
                    ErrorPhase::Auth,
                    TrackerErrorKind::Configuration(e.to_string()),
                )
            })?;
            let transport = HttpTransport::new(profile.timeout).map_err(|e| {
                TrackerError::new(
                    &tracker.id,
                    ErrorPhase::Query,
                    TrackerErrorKind::Transport(e.to_string()),
                )
            })?;
            registry
                .add_client(profile, Arc::new(transport), AdapterHooks::default())
                .await?;
        }
        Ok(registry)
    }

    /// Create a client for `profile`, sharing timing with any other client of
    /// the same site.
    pub async fn add_client(
        &mut self,
        profile: TrackerProfile,
        transport: Arc<dyn Transport>,
        hooks: AdapterHooks,
    ) -> Result<Arc<TrackerClient>, TrackerError> {
        let throttle = self
            .throttles
            .throttle_for(&profile.site(), profile.min_request_delay)
            .await;
        let client = Arc::new(
            TrackerClient::new(profile, transport)?
                .with_throttle(throttle)
                .with_hooks(hooks),
        );
        self.register(Arc::clone(&client) as Arc<dyn Tracker>);
        Ok(client)
    }

    /// Add any tracker implementation. Replaces one with the same id.
    pub fn register(&mut self, tracker: Arc<dyn Tracker>) {
        let id = tracker.id().to_string();
        if self.trackers.insert(id.clone(), tracker).is_some() {
            warn!(tracker = %id, "Replaced registered tracker");
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Tracker>> {
        self.trackers.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.trackers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Search every registered tracker concurrently.
    pub async fn search_all(&self, query: &SearchQuery) -> MultiSearchResult {
        let ids: Vec<String> = self.ids();
        self.search_some(&ids, query).await
    }

    /// Search the named trackers concurrently. Unknown ids are reported as
    /// configuration errors.
    pub async fn search_some(&self, ids: &[String], query: &SearchQuery) -> MultiSearchResult {
        let start = Instant::now();
        let mut outcome = MultiSearchResult::default();

        let mut searches = Vec::with_capacity(ids.len());
        for id in ids {
            match self.trackers.get(id) {
                Some(tracker) => {
                    let tracker = Arc::clone(tracker);
                    searches.push(async move {
                        let result = tracker.search(query).await;
                        (tracker.id().to_string(), result)
                    });
                }
                None => {
                    outcome.errors.insert(id.clone(), unknown_tracker(id));
                }
            }
        }

        for (id, result) in futures::future::join_all(searches).await {
            match result {
                Ok(found) => outcome.results.push(found),
                Err(e) => {
                    warn!(tracker = %id, error = %e, "Tracker search failed");
                    outcome.errors.insert(id, e);
                }
            }
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            trackers = ids.len(),
            releases = outcome.release_count(),
            failed = outcome.errors.len(),
            duration_ms = outcome.duration_ms,
            "Fan-out search complete"
        );
        outcome
    }

    pub async fn download(&self, tracker_id: &str, url: &str) -> Result<Vec<u8>, TrackerError> {
        let tracker = self
            .trackers
            .get(tracker_id)
            .ok_or_else(|| unknown_tracker(tracker_id))?;
        tracker.download(url).await
    }
}

impl std::fmt::Debug for TrackerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerRegistry")
            .field("trackers", &self.trackers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unknown_tracker(id: &str) -> TrackerError {
    TrackerError::new(
        id,
        ErrorPhase::Query,
        TrackerErrorKind::Configuration(format!("unknown tracker '{}'", id)),
    )
}
