//! Normalized query to native request parameters.
//!
//! Translation is pure: the same profile and query always produce the same
//! request, parameter order included.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::{CategoryParam, FreeleechFilter, PaginationStyle, QueryLayout};
use crate::transport::TransportRequest;

use super::profile::TrackerProfile;
use super::types::SearchQuery;

/// Build the search request for `query`.
pub fn build(profile: &TrackerProfile, query: &SearchQuery) -> TransportRequest {
    let layout = &profile.query;
    let mut params: Vec<(String, String)> = layout
        .fixed_params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    // Free text plus anything that has to ride along in the term.
    let mut text = vec![collapse(&query.term)];

    match daily_episode(query) {
        Some(date) => text.push(date),
        None => episode_params(layout, query, &mut params, &mut text),
    }

    for (value, param) in [
        (&query.artist, &layout.artist_param),
        (&query.album, &layout.album_param),
    ] {
        let Some(value) = value.as_deref().map(collapse).filter(|v| !v.is_empty()) else {
            continue;
        };
        match param {
            Some(name) => params.push((name.clone(), value)),
            None => text.push(value),
        }
    }

    if let (Some(genre), Some(name)) = (&query.genre, &layout.genre_param) {
        let genre = collapse(genre);
        if !genre.is_empty() {
            params.push((name.clone(), genre));
        }
    }

    if let (Some(year), Some(name)) = (query.year, &layout.year_param) {
        params.push((name.clone(), year.to_string()));
    }

    let text = join_nonempty(&text);
    let term = match id_params(layout, query, &mut params) {
        Some(id_term) => {
            if let Some(name) = &layout.ids.free_text_param {
                if !text.is_empty() {
                    params.push((name.clone(), text));
                }
            }
            id_term
        }
        None => text,
    };
    params.push((layout.term_param.clone(), term));

    let mut codes = if query.categories.is_empty() {
        BTreeSet::new()
    } else {
        profile.categories.to_native(&query.categories)
    };
    if codes.is_empty() {
        codes.extend(profile.all_categories.iter().cloned());
    }

    if query.freeleech_only {
        match &layout.freeleech {
            Some(FreeleechFilter::Param { name, value }) => {
                params.push((name.clone(), value.clone()))
            }
            Some(FreeleechFilter::Categories { codes: extra }) => {
                codes.extend(extra.iter().cloned())
            }
            None => {}
        }
    }
    category_params(&layout.categories, &codes, &mut params);

    let pagination = &layout.pagination;
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(pagination.default_limit)
        .max(1);
    let page = match pagination.style {
        PaginationStyle::OneBasedPage => query.offset / limit + 1,
        PaginationStyle::ZeroBasedPage => query.offset / limit,
        PaginationStyle::Offset => query.offset,
    };
    params.push((pagination.param.clone(), page.to_string()));
    if let Some(name) = &pagination.limit_param {
        params.push((name.clone(), limit.to_string()));
    }

    let mut request = TransportRequest::get(layout.path.as_str());
    request.query = params;
    request
}

/// `YYYY-MM-DD` for daily shows: a four-digit season year and an `MM/DD`
/// episode that together form a real calendar date.
fn daily_episode(query: &SearchQuery) -> Option<String> {
    let season = query.season.as_deref()?.trim();
    let episode = query.episode.as_deref()?.trim();
    if season.len() != 4 || !season.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (month, day) = episode.split_once('/')?;
    let year: i32 = season.parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

fn episode_params(
    layout: &QueryLayout,
    query: &SearchQuery,
    params: &mut Vec<(String, String)>,
    text: &mut Vec<String>,
) {
    let season = query.season.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let episode = query.episode.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let Some(season) = season else {
        return;
    };

    if let Some(name) = &layout.season_param {
        if episode.is_none() || layout.episode_param.is_some() {
            params.push((name.clone(), season.to_string()));
            if let (Some(episode), Some(name)) = (episode, &layout.episode_param) {
                params.push((name.clone(), episode.to_string()));
            }
            return;
        }
    }

    let mut marker = match season.parse::<u32>() {
        Ok(n) => format!("S{:02}", n),
        Err(_) => format!("S{}", season),
    };
    if let Some(n) = episode.and_then(|e| e.parse::<u32>().ok()) {
        marker.push_str(&format!("E{:02}", n));
    }
    text.push(marker);
}

/// Push id parameters and return the id that takes over the term, if any.
fn id_params(
    layout: &QueryLayout,
    query: &SearchQuery,
    params: &mut Vec<(String, String)>,
) -> Option<String> {
    let mut term = None;

    if let Some(imdb) = query.imdb_id.as_deref().and_then(normalize_imdb) {
        let value = if layout.ids.imdb_numeric {
            imdb.trim_start_matches("tt")
                .trim_start_matches('0')
                .to_string()
        } else {
            imdb
        };
        match &layout.ids.imdb_param {
            Some(name) => params.push((name.clone(), value)),
            None => term = Some(value),
        }
    }

    if let Some(tvdb) = query.tvdb_id {
        match &layout.ids.tvdb_param {
            Some(name) => params.push((name.clone(), tvdb.to_string())),
            None if term.is_none() => term = Some(tvdb.to_string()),
            None => {}
        }
    }

    term
}

fn category_params(style: &CategoryParam, codes: &BTreeSet<String>, params: &mut Vec<(String, String)>) {
    if codes.is_empty() {
        return;
    }
    match style {
        CategoryParam::Indexed { name, value } => {
            for code in codes {
                params.push((name.replace("{code}", code), value.clone()));
            }
        }
        CategoryParam::Repeated { name } => {
            for code in codes {
                params.push((name.clone(), code.clone()));
            }
        }
        CategoryParam::Joined { name, separator } => {
            let joined: Vec<&str> = codes.iter().map(String::as_str).collect();
            params.push((name.clone(), joined.join(separator)));
        }
    }
}

/// `tt` followed by at least seven digits, from `tt123`, `123` or `tt0000123`.
pub(crate) fn normalize_imdb(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches("tt");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u64 = digits.parse().ok()?;
    if number == 0 {
        return None;
    }
    Some(format!("tt{:07}", number))
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_nonempty(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
