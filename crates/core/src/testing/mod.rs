//! Testing utilities: a scripted transport and tracker fixtures.
//!
//! Lets the whole client run end to end without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use trackline_core::testing::{fixtures, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.on("login.php", fixtures::login_ok());
//! transport.on("ajax.php", fixtures::search_response(vec![/* groups */]));
//!
//! let profile = TrackerProfile::from_config(&fixtures::gazelle_config("t", "https://t.example"))?;
//! let client = TrackerClient::new(profile, transport.clone())?;
//! ```

mod mock_transport;

pub use mock_transport::{MockTransport, RecordedRequest, Reply};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::auth::Credentials;
    use crate::config::{
        AuthLayout, DefaultPolicies, DiscountScheme, QueryLayout, ResponseLayout,
        TimestampFormat, TokenConfig, TrackerConfig,
    };
    use crate::tracker::{Category, CategoryEntry};
    use crate::transport::TransportResponse;

    /// Authkey returned by [`login_ok`].
    pub const AUTHKEY: &str = "AUTH";
    /// Passkey returned by [`login_ok`].
    pub const PASSKEY: &str = "PASS";

    /// A music tracker of the family with password login and no request delay.
    ///
    /// Native categories: `1` music (plus MP3 and lossless), `2` applications,
    /// `3` e-books.
    pub fn gazelle_config(id: &str, base_url: &str) -> TrackerConfig {
        let mut auth = AuthLayout::default();
        auth.login.authkey_pointer = Some("/authkey".to_string());
        auth.login.passkey_pointer = Some("/passkey".to_string());

        TrackerConfig {
            id: id.to_string(),
            name: None,
            base_urls: vec![base_url.to_string()],
            credentials: Credentials::Password {
                username: "alice".to_string(),
                password: "hunter2".to_string(),
            },
            passkey: None,
            min_request_delay_ms: 0,
            timeout_secs: 10,
            auth,
            tokens: TokenConfig::default(),
            query: QueryLayout::default(),
            response: ResponseLayout::default(),
            discount: DiscountScheme::default(),
            timestamps: TimestampFormat::default(),
            policies: DefaultPolicies::default(),
            ids_in_tags: false,
            match_query: true,
            categories: vec![
                CategoryEntry::new("1", Category::AUDIO, "Music"),
                CategoryEntry::new("1", Category::AUDIO_MP3, "Music"),
                CategoryEntry::new("1", Category::AUDIO_LOSSLESS, "Music"),
                CategoryEntry::new("2", Category::PC, "Applications"),
                CategoryEntry::new("3", Category::BOOKS, "E-Books"),
            ],
            all_categories: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            minimum_ratio: None,
            minimum_seed_time_secs: None,
        }
    }

    /// Same layout, authenticated with a static API key and passkey.
    pub fn api_key_config(id: &str, base_url: &str) -> TrackerConfig {
        let mut config = gazelle_config(id, base_url);
        config.credentials = Credentials::ApiKey {
            key: "0123456789abcdef0123456789abcdef".to_string(),
        };
        config.passkey = Some(PASSKEY.to_string());
        config.response.download_template =
            "torrents.php?action=download&id={id}&torrent_pass={passkey}".to_string();
        config
    }

    /// Successful login: session cookie plus authkey and passkey in the body.
    pub fn login_ok() -> TransportResponse {
        TransportResponse::new(
            200,
            json!({"status": "success", "authkey": AUTHKEY, "passkey": PASSKEY}).to_string(),
        )
        .with_header("Set-Cookie", "session=s1; path=/; HttpOnly")
    }

    /// A redirect to the login page, the usual expired-session signal.
    pub fn login_redirect() -> TransportResponse {
        TransportResponse::new(302, "").with_header("Location", "login.php")
    }

    /// One lossless CD torrent, not freeleech.
    pub fn gazelle_torrent(torrent_id: u64) -> Value {
        json!({
            "torrentId": torrent_id,
            "format": "FLAC",
            "encoding": "Lossless",
            "media": "CD",
            "size": 314_572_800u64,
            "seeders": 20,
            "leechers": 2,
            "snatches": 150,
            "fileCount": 12,
            "time": "2024-01-15 12:00:00",
            "isFreeleech": false,
            "isNeutralLeech": false,
            "isPersonalFreeleech": false
        })
    }

    /// A release group holding `torrents`.
    pub fn gazelle_group(group_id: u64, name: &str, torrents: Vec<Value>) -> Value {
        json!({
            "groupId": group_id,
            "groupName": name,
            "artist": "The Beatles",
            "groupYear": 1969,
            "category": "1",
            "tags": ["rock", "pop"],
            "torrents": torrents
        })
    }

    /// A single torrent already merged with its group (group id 10).
    pub fn flat_torrent_row(torrent_id: u64, name: &str) -> Value {
        let mut row = gazelle_group(10, name, Vec::new());
        let Value::Object(fields) = &mut row else {
            unreachable!("group fixture is an object");
        };
        fields.remove("torrents");
        if let Value::Object(torrent) = gazelle_torrent(torrent_id) {
            fields.extend(torrent);
        }
        row
    }

    /// A successful browse response.
    pub fn search_response(groups: Vec<Value>) -> TransportResponse {
        TransportResponse::new(
            200,
            json!({
                "status": "success",
                "response": {"currentPage": 1, "pages": 1, "results": groups}
            })
            .to_string(),
        )
    }
}
