use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::tracker::CategoryEntry;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub trackers: Vec<TrackerConfig>,
}

/// One tracker of the family.
///
/// Every layout section defaults to the Gazelle JSON API conventions, so a
/// typical member needs only an id, base URLs, credentials and categories.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base URL followed by fallback mirrors, tried in order.
    pub base_urls: Vec<String>,
    pub credentials: Credentials,
    /// Static passkey for download URLs, if the tracker doesn't return one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
    #[serde(default = "default_min_request_delay_ms")]
    pub min_request_delay_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub auth: AuthLayout,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub query: QueryLayout,
    #[serde(default)]
    pub response: ResponseLayout,
    #[serde(default)]
    pub discount: DiscountScheme,
    #[serde(default)]
    pub timestamps: TimestampFormat,
    #[serde(default)]
    pub policies: DefaultPolicies,
    /// Scan tags for IMDb ids (`tt0123456`).
    #[serde(default)]
    pub ids_in_tags: bool,
    /// Drop rows whose title lacks any query term.
    #[serde(default = "default_true")]
    pub match_query: bool,
    pub categories: Vec<CategoryEntry>,
    /// Native codes sent when the requested categories resolve to nothing.
    #[serde(default)]
    pub all_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_seed_time_secs: Option<u64>,
}

impl TrackerConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn default_min_request_delay_ms() -> u64 {
    2000
}

fn default_timeout() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// A header whose value is rendered from a secret.
///
/// `{value}` in `format` is replaced with the key or session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderTemplate {
    pub name: String,
    #[serde(default = "default_header_format")]
    pub format: String,
}

impl HeaderTemplate {
    pub fn new(name: &str, format: &str) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
        }
    }

    pub fn render(&self, value: &str) -> String {
        self.format.replace("{value}", value)
    }
}

fn default_header_format() -> String {
    "{value}".to_string()
}

/// Inclusive length bounds for an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub fn contains(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

/// How credentials reach the tracker and how it signals trouble.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthLayout {
    #[serde(default = "default_api_key_header")]
    pub api_key_header: HeaderTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_length: Option<LengthBounds>,
    #[serde(default)]
    pub login: LoginLayout,
    #[serde(default)]
    pub expiry: ExpiryMarkers,
    /// Body fragments meaning "slow down" on an otherwise normal response.
    #[serde(default = "default_rate_limit_markers")]
    pub rate_limit_markers: Vec<String>,
}

impl Default for AuthLayout {
    fn default() -> Self {
        Self {
            api_key_header: default_api_key_header(),
            api_key_length: None,
            login: LoginLayout::default(),
            expiry: ExpiryMarkers::default(),
            rate_limit_markers: default_rate_limit_markers(),
        }
    }
}

fn default_api_key_header() -> HeaderTemplate {
    HeaderTemplate::new("Authorization", "{value}")
}

fn default_rate_limit_markers() -> Vec<String> {
    vec!["rate limit exceeded".to_string()]
}

/// Where the session token comes from in a login response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum TokenSource {
    /// A `Set-Cookie` header with this cookie name; the token is `name=value`.
    Cookie { name: String },
    /// A string at this JSON pointer in the body.
    Json { pointer: String },
}

/// The password login exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginLayout {
    #[serde(default = "default_login_path")]
    pub path: String,
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default = "default_password_field")]
    pub password_field: String,
    #[serde(default = "default_login_extra_fields")]
    pub extra_fields: BTreeMap<String, String>,
    #[serde(default = "default_token_source")]
    pub token: TokenSource,
    /// How the token is attached to later requests.
    #[serde(default = "default_session_header")]
    pub session_header: HeaderTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passkey_pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authkey_pointer: Option<String>,
    /// Body fragments meaning the credentials were rejected.
    #[serde(default = "default_failure_markers")]
    pub failure_markers: Vec<String>,
    /// Body or redirect fragments meaning a two-factor step is pending.
    #[serde(default = "default_two_factor_markers")]
    pub two_factor_markers: Vec<String>,
}

impl Default for LoginLayout {
    fn default() -> Self {
        Self {
            path: default_login_path(),
            username_field: default_username_field(),
            password_field: default_password_field(),
            extra_fields: default_login_extra_fields(),
            token: default_token_source(),
            session_header: default_session_header(),
            passkey_pointer: None,
            authkey_pointer: None,
            failure_markers: default_failure_markers(),
            two_factor_markers: default_two_factor_markers(),
        }
    }
}

fn default_login_path() -> String {
    "login.php".to_string()
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

fn default_login_extra_fields() -> BTreeMap<String, String> {
    BTreeMap::from([("keeplogged".to_string(), "1".to_string())])
}

fn default_token_source() -> TokenSource {
    TokenSource::Cookie {
        name: "session".to_string(),
    }
}

fn default_session_header() -> HeaderTemplate {
    HeaderTemplate::new("Cookie", "{value}")
}

fn default_failure_markers() -> Vec<String> {
    vec![
        "your username or password was incorrect".to_string(),
        "bad credentials".to_string(),
    ]
}

fn default_two_factor_markers() -> Vec<String> {
    vec!["2fa".to_string(), "two-factor".to_string()]
}

/// Signals that the session is no longer valid.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExpiryMarkers {
    /// Redirect targets containing any of these mean "log in again".
    #[serde(default = "default_redirect_markers")]
    pub redirect_markers: Vec<String>,
    #[serde(default = "default_expiry_statuses")]
    pub statuses: Vec<u16>,
    /// Checked against error payloads and non-JSON bodies, never against
    /// successful result sets.
    #[serde(default = "default_expiry_body_markers")]
    pub body_markers: Vec<String>,
}

impl Default for ExpiryMarkers {
    fn default() -> Self {
        Self {
            redirect_markers: default_redirect_markers(),
            statuses: default_expiry_statuses(),
            body_markers: default_expiry_body_markers(),
        }
    }
}

fn default_redirect_markers() -> Vec<String> {
    vec!["login".to_string()]
}

fn default_expiry_statuses() -> Vec<u16> {
    vec![401]
}

fn default_expiry_body_markers() -> Vec<String> {
    vec!["not authorized".to_string(), "not logged in".to_string()]
}

/// Freeleech-token economics for one tracker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Whether the tracker has a token redemption mechanism at all.
    #[serde(default)]
    pub supported: bool,
    /// Whether the user wants tokens spent on downloads.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_token_param")]
    pub param: String,
    #[serde(default = "default_token_value")]
    pub value: String,
    /// Download response fragments meaning the token could not be spent.
    #[serde(default = "default_token_failure_markers")]
    pub failure_markers: Vec<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            supported: false,
            enabled: false,
            param: default_token_param(),
            value: default_token_value(),
            failure_markers: default_token_failure_markers(),
        }
    }
}

fn default_token_param() -> String {
    "usetoken".to_string()
}

fn default_token_value() -> String {
    "1".to_string()
}

fn default_token_failure_markers() -> Vec<String> {
    vec![
        "you do not have any freeleech tokens left".to_string(),
        "no freeleech tokens".to_string(),
    ]
}

/// How requested categories appear in the query string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum CategoryParam {
    /// One parameter per code, named from a template: `filter_cat[{code}]=1`.
    Indexed { name: String, value: String },
    /// The same parameter repeated: `cat=1&cat=2`.
    Repeated { name: String },
    /// One parameter with joined codes: `cats=1,2`.
    Joined { name: String, separator: String },
}

impl Default for CategoryParam {
    fn default() -> Self {
        CategoryParam::Indexed {
            name: "filter_cat[{code}]".to_string(),
            value: "1".to_string(),
        }
    }
}

/// Native freeleech-only filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FreeleechFilter {
    Param { name: String, value: String },
    /// Extra native category codes that restrict to freeleech.
    Categories { codes: Vec<String> },
}

/// How the native page parameter is derived from offset/limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `offset / limit + 1`
    #[default]
    OneBasedPage,
    /// `offset / limit`
    ZeroBasedPage,
    /// The raw offset.
    Offset,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationLayout {
    #[serde(default = "default_page_param")]
    pub param: String,
    #[serde(default)]
    pub style: PaginationStyle,
    /// Page size assumed when the query has no limit.
    #[serde(default = "default_page_size")]
    pub default_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_param: Option<String>,
}

impl Default for PaginationLayout {
    fn default() -> Self {
        Self {
            param: default_page_param(),
            style: PaginationStyle::default(),
            default_limit: default_page_size(),
            limit_param: None,
        }
    }
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_page_size() -> u32 {
    50
}

/// Where external ids go when a query carries them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdSearchLayout {
    /// Parameter for the IMDb id; `None` puts it in the term parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_param: Option<String>,
    /// Send `123456` instead of `tt0123456`.
    #[serde(default)]
    pub imdb_numeric: bool,
    /// Secondary parameter for free text when an id took the primary field.
    /// `None` drops the free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text_param: Option<String>,
}

/// How a normalized query becomes request parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryLayout {
    #[serde(default = "default_search_path")]
    pub path: String,
    #[serde(default = "default_fixed_params")]
    pub fixed_params: BTreeMap<String, String>,
    #[serde(default = "default_term_param")]
    pub term_param: String,
    #[serde(default)]
    pub ids: IdSearchLayout,
    /// Season/episode parameters; when absent they are written into the
    /// term as `S01E02`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_param: Option<String>,
    #[serde(default = "default_genre_param")]
    pub genre_param: Option<String>,
    #[serde(default = "default_artist_param")]
    pub artist_param: Option<String>,
    #[serde(default = "default_album_param")]
    pub album_param: Option<String>,
    #[serde(default = "default_year_param")]
    pub year_param: Option<String>,
    #[serde(default)]
    pub categories: CategoryParam,
    #[serde(default = "default_freeleech_filter")]
    pub freeleech: Option<FreeleechFilter>,
    #[serde(default)]
    pub pagination: PaginationLayout,
}

impl Default for QueryLayout {
    fn default() -> Self {
        Self {
            path: default_search_path(),
            fixed_params: default_fixed_params(),
            term_param: default_term_param(),
            ids: IdSearchLayout::default(),
            season_param: None,
            episode_param: None,
            genre_param: default_genre_param(),
            artist_param: default_artist_param(),
            album_param: default_album_param(),
            year_param: default_year_param(),
            categories: CategoryParam::default(),
            freeleech: default_freeleech_filter(),
            pagination: PaginationLayout::default(),
        }
    }
}

fn default_search_path() -> String {
    "ajax.php".to_string()
}

fn default_fixed_params() -> BTreeMap<String, String> {
    BTreeMap::from([("action".to_string(), "browse".to_string())])
}

fn default_term_param() -> String {
    "searchstr".to_string()
}

fn default_genre_param() -> Option<String> {
    Some("taglist".to_string())
}

fn default_artist_param() -> Option<String> {
    Some("artistname".to_string())
}

fn default_album_param() -> Option<String> {
    Some("groupname".to_string())
}

fn default_year_param() -> Option<String> {
    Some("year".to_string())
}

fn default_freeleech_filter() -> Option<FreeleechFilter> {
    Some(FreeleechFilter::Param {
        name: "freetorrent".to_string(),
        value: "1".to_string(),
    })
}

/// Fields joined into one title fragment.
///
/// Present, non-empty fields are joined with `separator`; the result is
/// wrapped in `prefix`/`suffix`. A segment with no present field is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TitleSegment {
    pub fields: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl TitleSegment {
    pub fn field(pointer: &str) -> Self {
        Self {
            fields: vec![pointer.to_string()],
            separator: default_separator(),
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    pub fn wrapped(mut self, prefix: &str, suffix: &str) -> Self {
        self.prefix = prefix.to_string();
        self.suffix = suffix.to_string();
        self
    }
}

fn default_separator() -> String {
    " ".to_string()
}

/// JSON pointers, relative to one (flattened) row, for each release field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldMap {
    #[serde(default = "default_id_field")]
    pub id: String,
    #[serde(default = "default_title_segments")]
    pub title: Vec<TitleSegment>,
    #[serde(default = "default_category_field")]
    pub category: String,
    #[serde(default = "default_size_field")]
    pub size: String,
    #[serde(default = "default_seeders_field")]
    pub seeders: String,
    #[serde(default = "default_leechers_field")]
    pub leechers: String,
    #[serde(default = "default_grabs_field")]
    pub grabs: Option<String>,
    #[serde(default = "default_files_field")]
    pub files: Option<String>,
    #[serde(default = "default_publish_date_field")]
    pub publish_date: Option<String>,
    #[serde(default = "default_tags_field")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub douban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: default_id_field(),
            title: default_title_segments(),
            category: default_category_field(),
            size: default_size_field(),
            seeders: default_seeders_field(),
            leechers: default_leechers_field(),
            grabs: default_grabs_field(),
            files: default_files_field(),
            publish_date: default_publish_date_field(),
            tags: default_tags_field(),
            imdb: None,
            tvdb: None,
            tmdb: None,
            douban: None,
            info_hash: None,
        }
    }
}

fn default_id_field() -> String {
    "/torrentId".to_string()
}

fn default_title_segments() -> Vec<TitleSegment> {
    vec![
        TitleSegment::field("/artist").wrapped("", " -"),
        TitleSegment::field("/groupName"),
        TitleSegment::field("/groupYear").wrapped("[", "]"),
        TitleSegment {
            fields: vec![
                "/format".to_string(),
                "/encoding".to_string(),
                "/media".to_string(),
            ],
            separator: " / ".to_string(),
            prefix: "[".to_string(),
            suffix: "]".to_string(),
        },
    ]
}

fn default_category_field() -> String {
    "/category".to_string()
}

fn default_size_field() -> String {
    "/size".to_string()
}

fn default_seeders_field() -> String {
    "/seeders".to_string()
}

fn default_leechers_field() -> String {
    "/leechers".to_string()
}

fn default_grabs_field() -> Option<String> {
    Some("/snatches".to_string())
}

fn default_files_field() -> Option<String> {
    Some("/fileCount".to_string())
}

fn default_publish_date_field() -> Option<String> {
    Some("/time".to_string())
}

fn default_tags_field() -> Option<String> {
    Some("/tags".to_string())
}

/// Shape of a search response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseLayout {
    #[serde(default = "default_status_pointer")]
    pub status_pointer: Option<String>,
    #[serde(default = "default_success_value")]
    pub success_value: String,
    #[serde(default = "default_error_pointer")]
    pub error_pointer: Option<String>,
    #[serde(default = "default_rows_pointer")]
    pub rows_pointer: String,
    /// Key of a nested row array (torrents inside groups). Nested rows
    /// inherit the parent's fields and override them on conflict.
    #[serde(default = "default_nested_rows_key")]
    pub nested_rows_key: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
    /// Relative to the active base URL. Placeholders: `{id}`, `{passkey}`,
    /// `{authkey}` and any top-level row key.
    #[serde(default = "default_download_template")]
    pub download_template: String,
    #[serde(default = "default_details_template")]
    pub details_template: String,
}

impl Default for ResponseLayout {
    fn default() -> Self {
        Self {
            status_pointer: default_status_pointer(),
            success_value: default_success_value(),
            error_pointer: default_error_pointer(),
            rows_pointer: default_rows_pointer(),
            nested_rows_key: default_nested_rows_key(),
            fields: FieldMap::default(),
            download_template: default_download_template(),
            details_template: default_details_template(),
        }
    }
}

fn default_status_pointer() -> Option<String> {
    Some("/status".to_string())
}

fn default_success_value() -> String {
    "success".to_string()
}

fn default_error_pointer() -> Option<String> {
    Some("/error".to_string())
}

fn default_rows_pointer() -> String {
    "/response/results".to_string()
}

fn default_nested_rows_key() -> Option<String> {
    Some("torrents".to_string())
}

fn default_download_template() -> String {
    "torrents.php?action=download&id={id}&authkey={authkey}&torrent_pass={passkey}".to_string()
}

fn default_details_template() -> String {
    "torrents.php?id={groupId}&torrentid={id}".to_string()
}

/// Download/upload accounting factors for one discount code.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiscountCode {
    pub code: String,
    pub download: f64,
    pub upload: f64,
}

/// How a row's freeleech state is expressed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountScheme {
    /// No discount information; every release is 1/1.
    None,
    /// Boolean flags. Any truthy `free` flag means download 0; any truthy
    /// `neutral` flag means download 0 and upload 0.
    Flags {
        #[serde(default = "default_free_flags")]
        free: Vec<String>,
        #[serde(default = "default_neutral_flags")]
        neutral: Vec<String>,
        #[serde(default)]
        double_upload: Vec<String>,
    },
    /// One field holding an enumerated code. Unknown codes count as 1/1.
    Code {
        field: String,
        codes: Vec<DiscountCode>,
    },
}

impl Default for DiscountScheme {
    fn default() -> Self {
        DiscountScheme::Flags {
            free: default_free_flags(),
            neutral: default_neutral_flags(),
            double_upload: Vec::new(),
        }
    }
}

fn default_free_flags() -> Vec<String> {
    vec!["/isFreeleech".to_string(), "/isPersonalFreeleech".to_string()]
}

fn default_neutral_flags() -> Vec<String> {
    vec!["/isNeutralLeech".to_string()]
}

/// Native timestamp format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimestampFormat {
    /// chrono format for string timestamps; epoch seconds and RFC 3339 are
    /// always accepted.
    #[serde(default = "default_timestamp_pattern")]
    pub pattern: String,
    /// Offset of the tracker's local time from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: default_timestamp_pattern(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_timestamp_pattern() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

/// What to do with a row whose timestamp is missing or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Report a row failure and drop the row.
    #[default]
    Drop,
    /// Publish the row stamped with the current time.
    Now,
}

/// What to do with a native category code missing from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    #[default]
    Uncategorized,
    Drop,
}

/// Named per-field fallbacks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefaultPolicies {
    #[serde(default)]
    pub publish_date: DatePolicy,
    #[serde(default)]
    pub unknown_category: UnknownCategoryPolicy,
    /// Native code assumed for rows without a category; `None` skips them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_category: Option<String>,
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub trackers: Vec<SanitizedTrackerConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTrackerConfig {
    pub id: String,
    pub name: String,
    pub base_urls: Vec<String>,
    pub auth_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub secret_configured: bool,
    pub passkey_configured: bool,
    pub min_request_delay_ms: u64,
    pub timeout_secs: u32,
    pub tokens_supported: bool,
    pub tokens_enabled: bool,
    pub categories: usize,
}

impl From<&TrackerConfig> for SanitizedTrackerConfig {
    fn from(config: &TrackerConfig) -> Self {
        let (username, secret_configured) = match &config.credentials {
            Credentials::ApiKey { key } => (None, !key.is_empty()),
            Credentials::Password { username, password } => {
                (Some(username.clone()), !password.is_empty())
            }
            Credentials::TwoFactor { username, cookie } => (
                Some(username.clone()),
                cookie.as_deref().is_some_and(|c| !c.is_empty()),
            ),
        };
        Self {
            id: config.id.clone(),
            name: config.display_name().to_string(),
            base_urls: config.base_urls.clone(),
            auth_mode: config.credentials.mode().as_str().to_string(),
            username,
            secret_configured,
            passkey_configured: config.passkey.as_deref().is_some_and(|p| !p.is_empty()),
            min_request_delay_ms: config.min_request_delay_ms,
            timeout_secs: config.timeout_secs,
            tokens_supported: config.tokens.supported,
            tokens_enabled: config.tokens.enabled,
            categories: config.categories.len(),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            trackers: config.trackers.iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Category;

    const MINIMAL: &str = r#"
[[trackers]]
id = "orpheus"
base_urls = ["https://orpheus.example/"]

[trackers.credentials]
mode = "api_key"
key = "0123456789abcdef"

[[trackers.categories]]
native = "1"
category = 3000
description = "Music"
"#;

    #[test]
    fn test_minimal_tracker_gets_family_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let tracker = &config.trackers[0];

        assert_eq!(tracker.display_name(), "orpheus");
        assert_eq!(tracker.min_request_delay_ms, 2000);
        assert_eq!(tracker.timeout_secs, 30);
        assert!(tracker.match_query);
        assert!(!tracker.tokens.supported);
        assert_eq!(tracker.query.path, "ajax.php");
        assert_eq!(tracker.query.term_param, "searchstr");
        assert_eq!(
            tracker.query.fixed_params.get("action").map(String::as_str),
            Some("browse")
        );
        assert_eq!(tracker.response.rows_pointer, "/response/results");
        assert_eq!(tracker.response.nested_rows_key.as_deref(), Some("torrents"));
        assert!(matches!(tracker.discount, DiscountScheme::Flags { .. }));
        assert_eq!(tracker.categories[0].category, Category::AUDIO);
    }

    #[test]
    fn test_discount_code_scheme() {
        let toml = r#"
kind = "code"
field = "/freeType"
codes = [
    { code = "1", download = 0.0, upload = 1.0 },
    { code = "2", download = 0.5, upload = 1.0 },
]
"#;
        let scheme: DiscountScheme = toml::from_str(toml).unwrap();
        match scheme {
            DiscountScheme::Code { field, codes } => {
                assert_eq!(field, "/freeType");
                assert_eq!(codes.len(), 2);
                assert_eq!(codes[1].download, 0.5);
            }
            other => panic!("unexpected scheme: {:?}", other),
        }
    }

    #[test]
    fn test_category_param_styles() {
        let param: CategoryParam =
            toml::from_str("style = \"repeated\"\nname = \"cat\"").unwrap();
        assert_eq!(
            param,
            CategoryParam::Repeated {
                name: "cat".to_string()
            }
        );
    }

    #[test]
    fn test_token_source_json() {
        let source: TokenSource =
            toml::from_str("from = \"json\"\npointer = \"/data/token\"").unwrap();
        assert_eq!(
            source,
            TokenSource::Json {
                pointer: "/data/token".to_string()
            }
        );
    }

    #[test]
    fn test_header_template_render() {
        let header = HeaderTemplate::new("Authorization", "token {value}");
        assert_eq!(header.render("abc"), "token abc");
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(!json.contains("0123456789abcdef"));
        assert_eq!(sanitized.trackers[0].auth_mode, "api_key");
        assert!(sanitized.trackers[0].secret_configured);
        assert!(!sanitized.trackers[0].passkey_configured);
        assert_eq!(sanitized.trackers[0].categories, 1);
    }

    #[test]
    fn test_sanitized_two_factor_hides_cookie() {
        let mut tracker = crate::testing::fixtures::gazelle_config("orpheus", "https://orpheus.example");
        tracker.credentials = Credentials::TwoFactor {
            username: "alice".to_string(),
            cookie: Some("session=browser".to_string()),
        };
        let sanitized = SanitizedTrackerConfig::from(&tracker);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(!json.contains("session=browser"));
        assert_eq!(sanitized.auth_mode, "two_factor");
        assert_eq!(sanitized.username.as_deref(), Some("alice"));
        assert!(sanitized.secret_configured);
    }

    #[test]
    fn test_missing_credentials_fails() {
        let toml = r#"
[[trackers]]
id = "x"
base_urls = ["https://x.example"]
categories = []
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
