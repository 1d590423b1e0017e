//! Tracker client lifecycle integration tests.
//!
//! These tests drive a `TrackerClient` end to end over a scripted transport:
//! login -> throttled query -> expiry detection -> relogin -> row mapping

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;

use trackline_core::{
    auth::Credentials,
    testing::{fixtures, MockTransport},
    tracker::{AdapterHooks, SkipReason, TrackerRegistry},
    transport::{TransportError, TransportResponse},
    ErrorPhase, SearchQuery, TrackerClient, TrackerConfig, TrackerErrorKind, TrackerProfile,
};

/// A client wired to a mock transport.
struct TestHarness {
    transport: Arc<MockTransport>,
    client: TrackerClient,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(fixtures::gazelle_config("orpheus", "https://orpheus.example"))
    }

    fn with_config(config: TrackerConfig) -> Self {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        let profile = TrackerProfile::from_config(&config).expect("fixture config is valid");
        let client =
            TrackerClient::new(profile, transport.clone()).expect("Failed to create client");
        Self { transport, client }
    }

    fn respond_with_groups(&self, groups: Vec<serde_json::Value>) {
        self.transport
            .on("ajax.php", fixtures::search_response(groups));
    }

    fn sent_search_param(&self, name: &str) -> Option<String> {
        self.transport
            .requests()
            .iter()
            .rev()
            .find(|r| r.route() == "ajax.php")
            .and_then(|r| r.request.query_value(name).map(str::to_string))
    }
}

fn login_with_cookie(cookie: &str) -> TransportResponse {
    TransportResponse::new(200, json!({"authkey": "AUTH", "passkey": "PASS"}).to_string())
        .with_header("Set-Cookie", format!("session={}; path=/", cookie))
}

#[tokio::test]
async fn test_always_expired_session_gives_up_after_one_relogin() {
    let h = TestHarness::new();
    h.transport.on("ajax.php", fixtures::login_redirect());

    let err = h
        .client
        .search(&SearchQuery::text("abbey road"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, TrackerErrorKind::SessionExpired);
    assert_eq!(err.phase, ErrorPhase::Auth);
    assert_eq!(err.tracker, "orpheus");
    assert_eq!(h.transport.requests_to("ajax.php"), 2);
    // Initial login plus exactly one relogin.
    assert_eq!(h.transport.requests_to("login.php"), 2);
}

#[tokio::test]
async fn test_relogin_recovers_expired_session() {
    let h = TestHarness::new();
    h.transport.on_sequence(
        "ajax.php",
        vec![
            Ok(fixtures::login_redirect()),
            Ok(fixtures::search_response(vec![fixtures::gazelle_group(
                1,
                "Abbey Road",
                vec![fixtures::gazelle_torrent(11)],
            )])),
        ],
    );

    let result = h.client.search(&SearchQuery::text("abbey road")).await.unwrap();

    assert_eq!(result.releases.len(), 1);
    assert_eq!(h.transport.requests_to("login.php"), 2);
    assert_eq!(h.client.session().current().await.generation, 2);
}

#[tokio::test]
async fn test_expiry_status_and_body_marker_trigger_relogin() {
    for expired in [
        TransportResponse::new(401, ""),
        TransportResponse::new(200, json!({"status": "failure", "error": "Not logged in"}).to_string()),
    ] {
        let h = TestHarness::new();
        h.transport.on_sequence(
            "ajax.php",
            vec![Ok(expired), Ok(fixtures::search_response(Vec::new()))],
        );

        let result = h.client.search(&SearchQuery::text("x")).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(h.transport.requests_to("login.php"), 2);
    }
}

#[tokio::test]
async fn test_concurrent_expired_callers_share_one_relogin() {
    let h = TestHarness::new();
    h.transport.on_sequence(
        "login.php",
        vec![Ok(login_with_cookie("s1")), Ok(login_with_cookie("s2"))],
    );
    h.transport.set_handler(|_, request| {
        if request.path != "ajax.php" {
            return None;
        }
        if request.header_value("Cookie") == Some("session=s1") {
            Some(Ok(fixtures::login_redirect()))
        } else {
            Some(Ok(fixtures::search_response(Vec::new())))
        }
    });

    // Establish the first session.
    h.client.session().ensure_authenticated().await.unwrap();

    let query = SearchQuery::text("x");
    let (a, b) = tokio::join!(h.client.search(&query), h.client.search(&query));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(h.transport.requests_to("login.php"), 2);
}

#[tokio::test]
async fn test_token_never_spent_on_free_release() {
    let mut config = fixtures::gazelle_config("orpheus", "https://orpheus.example");
    config.tokens.supported = true;
    config.tokens.enabled = true;
    let h = TestHarness::with_config(config);

    let mut free = fixtures::gazelle_torrent(1);
    free["isFreeleech"] = json!(true);
    let paid = fixtures::gazelle_torrent(2);
    h.respond_with_groups(vec![fixtures::gazelle_group(1, "Abbey Road", vec![free, paid])]);

    let result = h.client.search(&SearchQuery::text("abbey road")).await.unwrap();
    assert_eq!(result.releases.len(), 2);

    let free = &result.releases[0];
    assert!(free.is_freeleech());
    assert!(!free.download_url.contains("usetoken"));

    let paid = &result.releases[1];
    assert_eq!(paid.download_factor, 1.0);
    assert!(paid.download_url.contains("usetoken=1"));
}

#[tokio::test]
async fn test_token_download_falls_back_when_tokens_run_out() {
    let mut config = fixtures::gazelle_config("orpheus", "https://orpheus.example");
    config.tokens.supported = true;
    config.tokens.enabled = true;
    let h = TestHarness::with_config(config);
    h.transport.set_handler(|_, request| {
        if !request.path.starts_with("torrents.php") {
            return None;
        }
        if request.path.contains("usetoken=1") {
            Some(Ok(TransportResponse::new(
                200,
                "<p>You do not have any freeleech tokens left.</p>",
            )))
        } else {
            Some(Ok(TransportResponse::new(200, "d8:announce3:urle")))
        }
    });

    let body = h
        .client
        .download("https://orpheus.example/torrents.php?action=download&id=2&usetoken=1")
        .await
        .unwrap();

    assert_eq!(body, b"d8:announce3:urle");
    assert_eq!(h.transport.requests_to("torrents.php"), 2);
}

#[tokio::test]
async fn test_foreign_download_host_gets_no_credentials() {
    for config in [
        fixtures::gazelle_config("orpheus", "https://orpheus.example"),
        fixtures::api_key_config("redacted", "https://redacted.example"),
    ] {
        let h = TestHarness::with_config(config);
        h.respond_with_groups(Vec::new());
        h.transport
            .on("grab.php", TransportResponse::new(200, "d8:announce3:urle"));
        h.client.search(&SearchQuery::text("x")).await.unwrap();

        let body = h
            .client
            .download("https://attacker.example/grab.php?id=1")
            .await
            .unwrap();
        assert_eq!(body, b"d8:announce3:urle");

        let requests = h.transport.requests();
        let search = requests.iter().find(|r| r.route() == "ajax.php").unwrap();
        assert!(
            search.request.header_value("Cookie").is_some()
                || search.request.header_value("Authorization").is_some()
        );
        let grab = requests.iter().find(|r| r.route() == "grab.php").unwrap();
        assert_eq!(grab.request.header_value("Cookie"), None);
        assert_eq!(grab.request.header_value("Authorization"), None);
    }
}

#[tokio::test]
async fn test_mirror_download_keeps_credentials() {
    let h = TestHarness::new();
    h.transport
        .on("torrents.php", TransportResponse::new(200, "d8:announce3:urle"));

    h.client
        .download("https://orpheus.example/torrents.php?action=download&id=7")
        .await
        .unwrap();

    let requests = h.transport.requests();
    let download = requests.iter().find(|r| r.route() == "torrents.php").unwrap();
    assert_eq!(download.base_url, "https://orpheus.example");
    assert_eq!(download.request.header_value("Cookie"), Some("session=s1"));
}

#[tokio::test]
async fn test_bad_row_does_not_fail_the_page() {
    let h = TestHarness::new();
    let mut torrents: Vec<_> = (1..=10).map(fixtures::gazelle_torrent).collect();
    torrents[3]["time"] = json!("31/31/2024 99:99");
    h.respond_with_groups(vec![fixtures::gazelle_group(1, "Abbey Road", torrents)]);

    let result = h.client.search(&SearchQuery::text("abbey road")).await.unwrap();

    assert_eq!(result.releases.len(), 9);
    assert_eq!(result.row_failures.len(), 1);
    assert_eq!(result.row_failures[0].torrent_id.as_deref(), Some("4"));
}

#[tokio::test]
async fn test_titles_must_contain_every_query_term() {
    let h = TestHarness::new();
    let mut group = fixtures::gazelle_group(1, "My Kitchen Rules S12E02", vec![fixtures::gazelle_torrent(1)]);
    group["artist"] = json!(null);
    h.respond_with_groups(vec![group]);

    let query = SearchQuery::text("love island").with_episode("4", "19");
    let result = h.client.search(&query).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].detail, SkipReason::QueryMismatch);
    assert_eq!(
        h.sent_search_param("searchstr").as_deref(),
        Some("love island S04E19")
    );
}

#[tokio::test]
async fn test_daily_episode_rewritten_to_date() {
    let h = TestHarness::new();
    h.respond_with_groups(Vec::new());

    let query = SearchQuery::text("the daily show").with_episode("2024", "03/15");
    h.client.search(&query).await.unwrap();

    assert_eq!(
        h.sent_search_param("searchstr").as_deref(),
        Some("the daily show 2024-03-15")
    );
}

#[tokio::test]
async fn test_offset_maps_to_native_page() {
    let h = TestHarness::new();
    h.respond_with_groups(Vec::new());

    h.client
        .search(&SearchQuery::text("x").with_page(100, 50))
        .await
        .unwrap();

    assert_eq!(h.sent_search_param("page").as_deref(), Some("3"));
}

#[tokio::test]
async fn test_unreachable_base_fails_over_to_mirror() {
    let mut config = fixtures::gazelle_config("orpheus", "https://down.example");
    config.base_urls.push("https://mirror.example".to_string());
    let h = TestHarness::with_config(config);
    h.transport.fail_base(
        "https://down.example",
        TransportError::Connect("connection refused".to_string()),
    );
    h.respond_with_groups(vec![fixtures::gazelle_group(1, "Abbey Road", vec![fixtures::gazelle_torrent(1)])]);

    let result = h.client.search(&SearchQuery::text("abbey")).await.unwrap();

    assert_eq!(h.client.active_base_url(), "https://mirror.example");
    assert!(result.releases[0]
        .download_url
        .starts_with("https://mirror.example/"));

    h.transport.clear_requests();
    h.client.search(&SearchQuery::text("abbey")).await.unwrap();
    assert!(h
        .transport
        .requests()
        .iter()
        .all(|r| r.base_url == "https://mirror.example"));
}

#[tokio::test]
async fn test_two_factor_account_without_cookie() {
    let mut config = fixtures::gazelle_config("orpheus", "https://orpheus.example");
    config.credentials = Credentials::TwoFactor {
        username: "alice".to_string(),
        cookie: None,
    };
    let h = TestHarness::with_config(config);

    let err = h.client.search(&SearchQuery::text("x")).await.unwrap_err();

    assert!(matches!(err.kind, TrackerErrorKind::ManualStepRequired(_)));
    assert_eq!(err.phase, ErrorPhase::Auth);
    assert!(!err.is_retryable());
    assert!(h.client.session().is_two_factor_required());
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn test_two_factor_cookie_used_until_rejected() {
    let mut config = fixtures::gazelle_config("orpheus", "https://orpheus.example");
    config.credentials = Credentials::TwoFactor {
        username: "alice".to_string(),
        cookie: Some("session=browser".to_string()),
    };
    config.passkey = Some("PASS".to_string());
    config.response.download_template =
        "torrents.php?action=download&id={id}&torrent_pass={passkey}".to_string();
    let h = TestHarness::with_config(config);
    h.transport.on_sequence(
        "ajax.php",
        vec![Ok(fixtures::search_response(Vec::new())), Ok(fixtures::login_redirect())],
    );

    h.client.search(&SearchQuery::text("x")).await.unwrap();
    let first = &h.transport.requests()[0];
    assert_eq!(first.request.header_value("Cookie"), Some("session=browser"));

    let err = h.client.search(&SearchQuery::text("x")).await.unwrap_err();
    assert!(matches!(err.kind, TrackerErrorKind::ManualStepRequired(_)));
    assert_eq!(h.transport.requests_to("login.php"), 0);
}

#[tokio::test]
async fn test_api_key_needs_no_login() {
    let config = fixtures::api_key_config("redacted", "https://redacted.example");
    let h = TestHarness::with_config(config);
    h.respond_with_groups(vec![fixtures::gazelle_group(1, "Abbey Road", vec![fixtures::gazelle_torrent(7)])]);

    let result = h.client.search(&SearchQuery::text("abbey")).await.unwrap();

    assert_eq!(h.transport.requests_to("login.php"), 0);
    let sent = &h.transport.requests()[0];
    assert_eq!(
        sent.request.header_value("Authorization"),
        Some("0123456789abcdef0123456789abcdef")
    );
    assert_eq!(
        result.releases[0].download_url,
        "https://redacted.example/torrents.php?action=download&id=7&torrent_pass=PASS"
    );
}

#[tokio::test]
async fn test_hooks_shape_results() {
    let h = TestHarness::new();
    let client = h.client.with_hooks(
        AdapterHooks::new()
            .with_should_skip(|raw| raw["media"] == json!("Cassette"))
            .with_post_parse(|_, release| {
                release.title = release.title.to_uppercase();
                true
            }),
    );
    let mut cassette = fixtures::gazelle_torrent(2);
    cassette["media"] = json!("Cassette");
    h.transport.on(
        "ajax.php",
        fixtures::search_response(vec![fixtures::gazelle_group(
            1,
            "Abbey Road",
            vec![fixtures::gazelle_torrent(1), cassette],
        )]),
    );

    let result = client.search(&SearchQuery::text("abbey road")).await.unwrap();

    assert_eq!(result.releases.len(), 1);
    assert!(result.releases[0].title.starts_with("THE BEATLES"));
    assert_eq!(result.skipped[0].detail, SkipReason::AdapterSkip);
}

#[tokio::test]
async fn test_requests_are_spaced_by_min_delay() {
    let mut config = fixtures::gazelle_config("orpheus", "https://orpheus.example");
    config.min_request_delay_ms = 100;
    let h = TestHarness::with_config(config);
    h.respond_with_groups(Vec::new());

    let started = Instant::now();
    for _ in 0..3 {
        h.client.search(&SearchQuery::text("x")).await.unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_cancel_aborts_throttle_wait() {
    let mut config = fixtures::gazelle_config("orpheus", "https://orpheus.example");
    config.min_request_delay_ms = 60_000;
    let h = TestHarness::with_config(config);
    h.respond_with_groups(Vec::new());

    h.client.search(&SearchQuery::text("x")).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = h
        .client
        .search_cancellable(&SearchQuery::text("x"), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind, TrackerErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(h.transport.requests_to("ajax.php"), 1);
}

#[tokio::test]
async fn test_registry_fans_out_and_isolates_failures() {
    let transport = Arc::new(MockTransport::new());
    transport.on("login.php", fixtures::login_ok());
    transport.on(
        "ajax.php",
        fixtures::search_response(vec![fixtures::gazelle_group(
            1,
            "Abbey Road",
            vec![fixtures::gazelle_torrent(1)],
        )]),
    );
    transport.fail_base(
        "https://broken.example",
        TransportError::Connect("refused".to_string()),
    );

    let mut registry = TrackerRegistry::new();
    for (id, base) in [
        ("orpheus", "https://orpheus.example"),
        ("redacted", "https://redacted.example"),
        ("broken", "https://broken.example"),
    ] {
        let profile = TrackerProfile::from_config(&fixtures::gazelle_config(id, base)).unwrap();
        registry
            .add_client(profile, transport.clone(), AdapterHooks::default())
            .await
            .unwrap();
    }

    let outcome = registry.search_all(&SearchQuery::text("abbey")).await;

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.release_count(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors["broken"].is_retryable());
}
