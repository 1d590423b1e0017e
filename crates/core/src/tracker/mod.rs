//! Tracker-family client and its building blocks.
//!
//! A [`TrackerClient`] is built from a [`TrackerProfile`] and a
//! [`Transport`](crate::transport::Transport). It owns the session for one
//! tracker, throttles requests, translates [`SearchQuery`] values into native
//! parameters and maps response rows into [`Release`] values.

pub mod categories;
mod client;
pub mod discount;
mod hooks;
pub mod mapper;
mod profile;
pub mod query;
mod rate_limiter;
mod registry;
mod types;

pub use categories::{Category, CategoryEntry, CategoryMapper};
pub use client::TrackerClient;
pub use discount::Discount;
pub use hooks::{AdapterHooks, DownloadUrlHook, PostParseHook, ShouldSkipHook};
pub use mapper::{MapOutcome, MappedRows};
pub use profile::TrackerProfile;
pub use rate_limiter::{RequestThrottle, ThrottlePool, WaitCancelled};
pub use registry::{MultiSearchResult, TrackerRegistry};
pub use types::*;
