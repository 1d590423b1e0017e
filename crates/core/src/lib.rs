pub mod auth;
pub mod config;
pub mod metrics;
pub mod testing;
pub mod tracker;
pub mod transport;

pub use auth::{create_authenticator, AuthError, AuthMode, Authenticator, Credentials, Session};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    TrackerConfig,
};
pub use tracker::{
    Category, ErrorPhase, MultiSearchResult, Release, SearchQuery, SearchResult, Tracker,
    TrackerClient, TrackerError, TrackerErrorKind, TrackerProfile, TrackerRegistry,
};
pub use transport::{HttpTransport, Transport, TransportError};
