// src/utils/text.rs

//! Text normalization, date and reward parsing, and campaign fingerprints.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use sha1::{Digest, Sha1};

use crate::models::RewardType;

/// `2024年6月1日`, `2024-06-01`, `2024/6/1` anywhere in the text.
static JP_DATE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?P<y>[2２][0０]\d{2})[年\-/](?P<m>\d{1,2})[月\-/](?P<d>\d{1,2})日?").ok()
});

/// `最大1,000ポイント`, `500P`, `3000円`.
static REWARD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(最大)?\s*([0-9]{1,3}(?:,[0-9]{3})*|[0-9]+)\s*(P|ポイント|円)").ok()
});

/// Date-time layouts tried by the generic fallback, year-first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Date layouts tried by the generic fallback, year-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%a, %d %b %Y",
];

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and reduce to `[a-z0-9]` words joined by single hyphens.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_hyphen = false;

    for c in s.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Fingerprint of a campaign: `slug(provider):<16 hex chars of sha1>`.
///
/// The digest covers `provider|name|source_url|reward_value`, with an empty
/// string for a missing reward.
pub fn make_external_id(
    provider: &str,
    name: &str,
    source_url: &str,
    reward_value: Option<&str>,
) -> String {
    let base = format!(
        "{}|{}|{}|{}",
        provider,
        name,
        source_url,
        reward_value.unwrap_or("")
    );
    let digest = hex::encode(Sha1::digest(base.as_bytes()));
    format!("{}:{}", slugify(provider), &digest[..16])
}

/// Parse a Japanese-style date into ISO `YYYY-MM-DD`.
///
/// Looks for `YYYY年M月D日` (or `-`/`/` separators) first, then falls back to
/// a generic year-first parse of the whole text. Never fails; unreadable
/// input yields `None`.
pub fn parse_date_jp(s: &str) -> Option<String> {
    let s = normalize_text(s);
    if s.is_empty() {
        return None;
    }

    find_jp_date(&s)
        .or_else(|| parse_generic_date(&s))
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn find_jp_date(s: &str) -> Option<NaiveDate> {
    let caps = JP_DATE_RE.as_ref()?.captures(s)?;
    let year: i32 = ascii_digits(caps.name("y")?.as_str()).parse().ok()?;
    let month: u32 = ascii_digits(caps.name("m")?.as_str()).parse().ok()?;
    let day: u32 = ascii_digits(caps.name("d")?.as_str()).parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Map full-width digits to ASCII so they parse as numbers.
fn ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// Year-first parse of feed and API timestamps.
fn parse_generic_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// Parse a stored ISO date (`YYYY-MM-DD`, optionally followed by a time).
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        let (date, rest) = (s.get(..10)?, s.get(10..)?);
        if rest.starts_with('T') || rest.starts_with(' ') {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
        } else {
            None
        }
    })
}

/// Find a reward amount such as `最大500ポイント` or `1,000円`.
///
/// Returns the matched text and whether it is a points or cash reward.
pub fn extract_reward_value(s: &str) -> Option<(String, RewardType)> {
    if s.is_empty() {
        return None;
    }
    let caps = REWARD_RE.as_ref()?.captures(s)?;

    let marker = caps.get(1).map_or("", |m| m.as_str());
    let number = caps.get(2).map_or("", |m| m.as_str());
    let unit = caps.get(3)?.as_str();

    let reward_type = match unit {
        "P" | "ポイント" => RewardType::Points,
        _ => RewardType::Cash,
    };
    Some((normalize_text(&format!("{marker}{number}{unit}")), reward_type))
}
