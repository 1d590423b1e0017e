//! Raw tracker rows to normalized releases.
//!
//! Every row is mapped on its own. A row that cannot be normalized becomes a
//! [`RowFailure`] or a [`SkipReason`]; neither aborts the rest of the batch.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{Map, Value};

use crate::auth::Session;
use crate::config::{DatePolicy, TimestampFormat, TitleSegment, UnknownCategoryPolicy};
use crate::transport::join_url;

use super::categories::Category;
use super::discount::{self, scalar_string};
use super::hooks::AdapterHooks;
use super::profile::TrackerProfile;
use super::query::normalize_imdb;
use super::types::{Release, RowFailure, RowReport, SearchQuery, SkipReason};

static IMDB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"tt(\d{7,9})").unwrap());
static DOUBAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"subject/(\d+)").unwrap());
static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\d.,]+)\s*(b|bytes?|[kmgtp]i?b)$").unwrap());

/// Inputs shared by every row of one response.
pub struct MapContext<'a> {
    pub profile: &'a TrackerProfile,
    pub hooks: &'a AdapterHooks,
    pub session: &'a Session,
    /// Base URL that served the response; relative URLs resolve against it.
    pub base_url: &'a str,
    pub query: &'a SearchQuery,
}

/// Result of mapping one row.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Release(Box<Release>),
    Skip(SkipReason),
    Failed(RowFailure),
}

/// Result of mapping a batch.
#[derive(Debug, Clone, Default)]
pub struct MappedRows {
    pub releases: Vec<Release>,
    pub failures: Vec<RowReport<RowFailure>>,
    pub skipped: Vec<RowReport<SkipReason>>,
}

/// Map every row, isolating failures per row.
pub fn map_rows(ctx: &MapContext<'_>, rows: &[Value]) -> MappedRows {
    let mut mapped = MappedRows::default();
    for (index, raw) in rows.iter().enumerate() {
        let torrent_id = raw
            .pointer(&ctx.profile.response.fields.id)
            .and_then(scalar_string);
        match map_row(ctx, raw) {
            MapOutcome::Release(release) => mapped.releases.push(*release),
            MapOutcome::Skip(detail) => mapped.skipped.push(RowReport {
                index,
                torrent_id,
                detail,
            }),
            MapOutcome::Failed(detail) => mapped.failures.push(RowReport {
                index,
                torrent_id,
                detail,
            }),
        }
    }
    mapped
}

/// Map one raw row.
pub fn map_row(ctx: &MapContext<'_>, raw: &Value) -> MapOutcome {
    let profile = ctx.profile;
    let fields = &profile.response.fields;

    if !raw.is_object() {
        return MapOutcome::Failed(RowFailure::NotAnObject);
    }
    if ctx.hooks.skips(raw) {
        return MapOutcome::Skip(SkipReason::AdapterSkip);
    }

    let Some(torrent_id) = string_at(raw, &fields.id) else {
        return MapOutcome::Skip(SkipReason::missing("id"));
    };

    let native_category = string_at(raw, &fields.category)
        .or_else(|| profile.policies.missing_category.clone());
    let Some(native_category) = native_category else {
        return MapOutcome::Skip(SkipReason::missing("category"));
    };
    if !profile.categories.knows(&native_category)
        && profile.policies.unknown_category == UnknownCategoryPolicy::Drop
    {
        return MapOutcome::Skip(SkipReason::UnknownCategory);
    }
    let categories: BTreeSet<Category> = profile.categories.to_abstract(&native_category);

    let size_bytes = match raw.pointer(&fields.size) {
        None | Some(Value::Null) => return MapOutcome::Skip(SkipReason::missing("size")),
        Some(value) => match parse_size(value) {
            Some(size) => size,
            None => return invalid_number("size", value),
        },
    };

    let seeders = match raw.pointer(&fields.seeders) {
        None | Some(Value::Null) => return MapOutcome::Skip(SkipReason::missing("seeders")),
        Some(value) => match parse_count(value) {
            Some(n) => n,
            None => return invalid_number("seeders", value),
        },
    };
    let leechers = match raw.pointer(&fields.leechers) {
        None | Some(Value::Null) => 0,
        Some(value) => match parse_count(value) {
            Some(n) => n,
            None => return invalid_number("leechers", value),
        },
    };
    let optional_count = |pointer: &Option<String>| {
        pointer
            .as_deref()
            .and_then(|p| raw.pointer(p))
            .and_then(parse_count)
    };

    let publish_date = match publish_date(raw, profile) {
        Ok(date) => date,
        Err(failure) => return MapOutcome::Failed(failure),
    };

    let discount = discount::evaluate(&profile.discount, raw);
    let can_use_token = profile.can_use_token(discount.download);

    let download_url = match &ctx.hooks.download_url {
        Some(hook) => hook(&torrent_id, can_use_token),
        None => {
            let Some(url) = render_url(ctx, &profile.response.download_template, raw, &torrent_id)
            else {
                return MapOutcome::Skip(SkipReason::missing("download_url"));
            };
            if can_use_token {
                append_param(&url, &profile.tokens.param, &profile.tokens.value)
            } else {
                url
            }
        }
    };
    if download_url.trim().is_empty() {
        return MapOutcome::Skip(SkipReason::missing("download_url"));
    }
    let details_url = render_url(ctx, &profile.response.details_template, raw, &torrent_id);

    let tags = fields
        .tags
        .as_deref()
        .and_then(|p| raw.pointer(p))
        .map(parse_tags)
        .unwrap_or_default();

    let mut imdb_id = fields
        .imdb
        .as_deref()
        .and_then(|p| raw.pointer(p))
        .and_then(extract_imdb);
    if imdb_id.is_none() && profile.ids_in_tags {
        imdb_id = tags.iter().find_map(|t| extract_imdb(&Value::String(t.clone())));
    }
    let numeric_id = |pointer: &Option<String>| {
        pointer
            .as_deref()
            .and_then(|p| raw.pointer(p))
            .and_then(parse_u64)
            .filter(|n| *n > 0)
    };

    let mut release = Release {
        tracker: profile.id.clone(),
        torrent_id,
        title: build_title(&fields.title, raw),
        details_url,
        download_url,
        categories,
        size_bytes,
        seeders,
        leechers,
        peers: seeders.saturating_add(leechers),
        grabs: optional_count(&fields.grabs),
        files: optional_count(&fields.files),
        publish_date,
        imdb_id,
        tvdb_id: numeric_id(&fields.tvdb),
        tmdb_id: numeric_id(&fields.tmdb),
        douban_id: fields
            .douban
            .as_deref()
            .and_then(|p| raw.pointer(p))
            .and_then(extract_douban),
        info_hash: fields
            .info_hash
            .as_deref()
            .and_then(|p| string_at(raw, p))
            .map(|h| h.to_ascii_lowercase()),
        tags,
        download_factor: discount.download,
        upload_factor: discount.upload,
        minimum_ratio: profile.minimum_ratio,
        minimum_seed_time_secs: profile.minimum_seed_time_secs,
    };

    if let Some(hook) = &ctx.hooks.post_parse {
        if !hook(raw, &mut release) {
            return MapOutcome::Skip(SkipReason::HookDiscard);
        }
    }

    release.title = collapse_whitespace(&release.title);
    if release.title.is_empty() {
        return MapOutcome::Skip(SkipReason::EmptyTitle);
    }

    if profile.match_query
        && !ctx.query.has_external_id()
        && !matches_query(&release.title, &ctx.query.term)
    {
        return MapOutcome::Skip(SkipReason::QueryMismatch);
    }

    if ctx.query.freeleech_only && !release.is_freeleech() {
        return MapOutcome::Skip(SkipReason::NotFreeleech);
    }

    MapOutcome::Release(Box::new(release))
}

/// Expand grouped rows into one row per torrent.
///
/// Each child inherits the group's fields; the child's own fields win.
/// Rows without the nested key pass through unchanged.
pub fn flatten_rows(rows: &[Value], nested_key: Option<&str>) -> Vec<Value> {
    let Some(key) = nested_key else {
        return rows.to_vec();
    };

    let mut flat = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(Value::Array(children)) = row.get(key) else {
            flat.push(row.clone());
            continue;
        };
        let mut group: Map<String, Value> = row.as_object().cloned().unwrap_or_default();
        group.remove(key);

        for child in children {
            match child {
                Value::Object(fields) => {
                    let mut merged = group.clone();
                    for (k, v) in fields {
                        merged.insert(k.clone(), v.clone());
                    }
                    flat.push(Value::Object(merged));
                }
                other => flat.push(other.clone()),
            }
        }
    }
    flat
}

/// Whether every query term appears in `title` as a whole word.
///
/// Case-insensitive; punctuation around terms is ignored. An empty query
/// matches everything.
pub fn matches_query(title: &str, term: &str) -> bool {
    let title = title.to_lowercase();
    term.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .all(|t| contains_word(&title, &t))
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Assemble the title from its segments.
pub fn build_title(segments: &[TitleSegment], raw: &Value) -> String {
    let parts: Vec<String> = segments
        .iter()
        .filter_map(|segment| {
            let values: Vec<String> = segment
                .fields
                .iter()
                .filter_map(|p| raw.pointer(p))
                .filter_map(title_value)
                .collect();
            if values.is_empty() {
                return None;
            }
            Some(format!(
                "{}{}{}",
                segment.prefix,
                values.join(&segment.separator),
                segment.suffix
            ))
        })
        .collect();
    collapse_whitespace(&decode_entities(&parts.join(" ")))
}

fn title_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Array(items) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => obj.get("name").and_then(scalar_string),
                    other => scalar_string(other),
                })
                .collect();
            names.join(", ")
        }
        Value::Bool(_) => return None,
        other => scalar_string(other)?,
    };
    let text = text.trim().to_string();
    if text.is_empty() || text == "0" {
        None
    } else {
        Some(text)
    }
}

/// Bytes from a number or a human-readable size like `1.5 GB`.
pub fn parse_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<u64>() {
                return Some(n);
            }
            let caps = SIZE_RE.captures(s)?;
            let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
            let unit = caps.get(2)?.as_str().to_ascii_uppercase();
            let multiplier = match unit.trim_end_matches("IB").trim_end_matches('B') {
                "" | "BYTE" | "BYTES" => 1.0,
                "K" => 1024.0,
                "M" => 1024.0 * 1024.0,
                "G" => 1024.0 * 1024.0 * 1024.0,
                "T" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
                "P" => 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0,
                _ => return None,
            };
            Some((number * multiplier) as u64)
        }
        _ => None,
    }
}

fn parse_count(value: &Value) -> Option<u32> {
    parse_u64(value).map(|n| n.min(u32::MAX as u64) as u32)
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn invalid_number(field: &str, value: &Value) -> MapOutcome {
    MapOutcome::Failed(RowFailure::InvalidNumber {
        field: field.to_string(),
        value: display_value(value),
    })
}

fn publish_date(raw: &Value, profile: &TrackerProfile) -> Result<DateTime<Utc>, RowFailure> {
    let Some(pointer) = profile.response.fields.publish_date.as_deref() else {
        return Ok(Utc::now());
    };
    let value = raw.pointer(pointer);
    if let Some(date) = value.and_then(|v| parse_timestamp(v, &profile.timestamps)) {
        return Ok(date);
    }
    match profile.policies.publish_date {
        DatePolicy::Now => Ok(Utc::now()),
        DatePolicy::Drop => Err(RowFailure::InvalidTimestamp {
            value: value.map(display_value).unwrap_or_default(),
        }),
    }
}

/// Normalize a native timestamp to UTC.
///
/// Accepts epoch seconds (number or numeric string), RFC 3339, or a string
/// in the tracker's pattern and local offset.
pub fn parse_timestamp(value: &Value, format: &TimestampFormat) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp(secs, 0)
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(secs) = s.parse::<i64>() {
                return DateTime::from_timestamp(secs, 0);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            let naive = NaiveDateTime::parse_from_str(s, &format.pattern)
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, &format.pattern)
                        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })?;
            let offset = FixedOffset::east_opt(format.utc_offset_minutes * 60)?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    }
}

/// `tt`-prefixed IMDb id from a number, bare digits, `tt…` or a URL.
pub fn extract_imdb(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| normalize_imdb(&n.to_string())),
        Value::String(s) => match IMDB_RE.captures(s) {
            Some(caps) => caps.get(1).and_then(|m| normalize_imdb(m.as_str())),
            None => normalize_imdb(s),
        },
        _ => None,
    }
}

/// Douban subject id from a number, bare digits or a subject URL.
pub fn extract_douban(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().filter(|n| *n > 0).map(|n| n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            if let Some(caps) = DOUBAN_RE.captures(s) {
                return caps.get(1).map(|m| m.as_str().to_string());
            }
            (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then(|| s.to_string())
        }
        _ => None,
    }
}

fn parse_tags(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        Value::String(s) => s.split([',', ' ']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fill `{placeholder}`s and resolve against the base URL.
///
/// `None` when any placeholder has no value.
fn render_url(
    ctx: &MapContext<'_>,
    template: &str,
    raw: &Value,
    torrent_id: &str,
) -> Option<String> {
    let passkey = ctx.session.passkey.as_deref();
    let authkey = ctx.session.authkey.as_deref();
    let rendered = render_template(template, |name| match name {
        "id" => Some(torrent_id.to_string()),
        "passkey" => passkey.map(str::to_string),
        "authkey" => authkey.map(str::to_string),
        other => raw.get(other).and_then(scalar_string),
    })?;
    if rendered.starts_with("http://") || rendered.starts_with("https://") {
        Some(rendered)
    } else {
        Some(join_url(ctx.base_url, &rendered))
    }
}

pub(crate) fn render_template(
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let value = lookup(&after[..end]).filter(|v| !v.is_empty())?;
        out.push_str(&urlencoding::encode(&value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

pub(crate) fn append_param(url: &str, name: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        url,
        separator,
        urlencoding::encode(name),
        urlencoding::encode(value)
    )
}

fn string_at(raw: &Value, pointer: &str) -> Option<String> {
    raw.pointer(pointer)
        .and_then(scalar_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
