//! Reference Builder
//!
//! Turns a lookup request (a known remote URL and/or a locally stored
//! title) into a [`ReferenceDescriptor`]. Local file facts are merged in
//! separately from the library lookup.

use crate::types::ReferenceDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DOMAIN_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"www\.|\.com").expect("valid domain regex"));
static ID_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)(?:[/?#]|$)").expect("valid id segment regex"));
static SLUG_BEFORE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r".+/([^/]+)/\d+").expect("valid slug regex"));
static TITLE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-._']").expect("valid separator regex"));
static RELEASE_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\sXXX|\s1080p|720p|2160p|KTR|RARBG|\scom\s|\[|\]|\sHD|\sSD").expect("valid release tag regex")
});
static DATES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\d{2}\s\d{2}\s\d{2}|\s\d{4}\s\d{2}\s\d{2}").expect("valid date regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Lookup request as received on the process boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LookupRequest {
    /// Locally stored title (often a file name)
    #[serde(default)]
    pub title: Option<String>,

    /// Known remote URL
    #[serde(default)]
    pub url: Option<String>,

    /// Local library record id
    #[serde(default)]
    pub id: Option<String>,

    /// Free-text name for search requests
    #[serde(default)]
    pub name: Option<String>,

    /// Sub-sources to search when none are given on the command line
    #[serde(default)]
    pub extra: Option<Vec<String>>,
}

/// Build a reference descriptor from a lookup request
///
/// Duration, size and quality are left unset.
pub fn build_reference(request: &LookupRequest) -> ReferenceDescriptor {
    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    let title = request
        .title
        .as_deref()
        .map(clean_title)
        .filter(|t| !t.is_empty());

    let reference = ReferenceDescriptor {
        title,
        url_slug: url.and_then(slug_from_url),
        source_id: url.and_then(id_from_url),
        domain: url.and_then(domain_from_url),
        ..Default::default()
    };

    tracing::debug!(
        title = ?reference.title,
        url_slug = ?reference.url_slug,
        source_id = ?reference.source_id,
        domain = ?reference.domain,
        "Built reference descriptor"
    );

    reference
}

/// Site/network name from a URL host: `www.` and `.com` removed, lowercase
pub fn domain_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let domain = DOMAIN_NOISE.replace_all(host, "").to_lowercase();
    (!domain.is_empty()).then_some(domain)
}

/// Numeric remote identifier from a URL
///
/// The last path segment wins if it is all digits; otherwise the first
/// all-digit segment is used.
pub fn id_from_url(url: &str) -> Option<String> {
    let path = path_of(url);
    let last = path.rsplit('/').next().unwrap_or("");
    if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) {
        return Some(last.to_string());
    }

    ID_SEGMENT
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Slug segment immediately preceding a numeric segment (`…/<slug>/<id>`)
pub fn slug_from_url(url: &str) -> Option<String> {
    let path = path_of(url);
    SLUG_BEFORE_ID
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|slug| !slug.chars().all(|c| c.is_ascii_digit()))
}

/// Normalize a stored title or file name for text search
pub fn clean_title(raw: &str) -> String {
    let stem = strip_extension(raw.trim());
    let spaced = TITLE_SEPARATORS.replace_all(stem, " ");
    let untagged = RELEASE_TAGS.replace_all(&spaced, "");
    let undated = DATES.replace_all(&untagged, "");
    WHITESPACE.replace_all(&undated, " ").trim().to_string()
}

/// Drop a short alphanumeric file extension, if present
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (2..=4).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    }
}

/// URL path without query or fragment; the raw string if it does not parse
fn path_of(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().trim_end_matches('/').to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .trim_end_matches('/')
            .to_string(),
    }
}
