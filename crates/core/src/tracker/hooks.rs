//! Per-tracker override hooks.
//!
//! Site adapters specialize the shared client with plain closures injected
//! once at construction. Every hook is optional.

use std::sync::Arc;

use serde_json::Value;

use super::types::Release;

/// Inspect or rewrite a mapped release. Returning `false` discards the row.
pub type PostParseHook = Arc<dyn Fn(&Value, &mut Release) -> bool + Send + Sync>;

/// Build the download URL from a torrent id and whether a token may be spent.
pub type DownloadUrlHook = Arc<dyn Fn(&str, bool) -> String + Send + Sync>;

/// Returning `true` drops a raw row before it is mapped.
pub type ShouldSkipHook = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct AdapterHooks {
    pub post_parse: Option<PostParseHook>,
    pub download_url: Option<DownloadUrlHook>,
    pub should_skip: Option<ShouldSkipHook>,
}

impl AdapterHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post_parse<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &mut Release) -> bool + Send + Sync + 'static,
    {
        self.post_parse = Some(Arc::new(hook));
        self
    }

    pub fn with_download_url<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, bool) -> String + Send + Sync + 'static,
    {
        self.download_url = Some(Arc::new(hook));
        self
    }

    pub fn with_should_skip<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.should_skip = Some(Arc::new(hook));
        self
    }

    pub(crate) fn skips(&self, raw: &Value) -> bool {
        self.should_skip.as_ref().is_some_and(|hook| hook(raw))
    }
}

impl std::fmt::Debug for AdapterHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterHooks")
            .field("post_parse", &self.post_parse.is_some())
            .field("download_url", &self.download_url.is_some())
            .field("should_skip", &self.should_skip.is_some())
            .finish()
    }
}
