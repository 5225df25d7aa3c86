//! Core record types shared by the matching pipeline
//!
//! Candidates and references are plain read-only snapshots. Nothing in the
//! engine mutates or merges them; they are only scored.

use crate::matching::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Known facts about the local item being identified
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferenceDescriptor {
    /// Human-entered or library-stored title
    #[serde(default)]
    pub title: Option<String>,

    /// Slug extracted from a known remote URL
    #[serde(default)]
    pub url_slug: Option<String>,

    /// Remote identifier extracted from a known URL
    #[serde(default)]
    pub source_id: Option<String>,

    #[serde(default)]
    pub duration_seconds: Option<u64>,

    #[serde(default)]
    pub file_size_bytes: Option<u64>,

    /// Height bucket of the local file (e.g. "1080")
    #[serde(default)]
    pub quality_label: Option<String>,

    /// Remote site/network domain parsed from a known URL
    #[serde(default)]
    pub domain: Option<String>,
}

impl ReferenceDescriptor {
    /// True when at least one query key (title, slug or id) is present
    pub fn has_query_key(&self) -> bool {
        [&self.title, &self.url_slug, &self.source_id]
            .iter()
            .any(|field| non_empty(field).is_some())
    }

    /// True when neither a local duration nor a local size is known
    pub fn lacks_local_facts(&self) -> bool {
        self.duration_seconds.is_none() && self.file_size_bytes.is_none()
    }

    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn url_slug(&self) -> Option<&str> {
        non_empty(&self.url_slug)
    }

    pub fn source_id(&self) -> Option<&str> {
        non_empty(&self.source_id)
    }

    pub fn domain(&self) -> Option<&str> {
        non_empty(&self.domain)
    }
}

/// One hit returned by a remote query
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateRecord {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub url_slug: Option<String>,

    #[serde(default)]
    pub duration_seconds: Option<u64>,

    /// Download sizes keyed by quality ("4k", "1080p", ...)
    #[serde(default)]
    pub file_size_bytes_by_quality: Option<HashMap<String, u64>>,

    #[serde(default)]
    pub generic_file_size_bytes: Option<u64>,

    #[serde(default)]
    pub site_name: Option<String>,

    #[serde(default)]
    pub network_name: Option<String>,
}

impl CandidateRecord {
    pub fn url_slug(&self) -> Option<&str> {
        non_empty(&self.url_slug)
    }
}

/// Signals derived for one candidate against one reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalVector {
    pub title_ratio: f64,
    pub url_ratio: f64,
    pub duration_match: bool,
    pub size_match: bool,
    pub domain_match: bool,
    pub id_flag: bool,
    /// Candidate id equals the reference's remote identifier
    pub id_match: bool,
}

/// Ratios retained alongside an accepted match for logging
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    pub title_ratio: f64,
    pub url_ratio: f64,
}

impl From<&SignalVector> for Diagnostics {
    fn from(signals: &SignalVector) -> Self {
        Self {
            title_ratio: signals.title_ratio,
            url_ratio: signals.url_ratio,
        }
    }
}

/// An accepted match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub candidate: CandidateRecord,
    pub tier: Tier,
    pub diagnostics: Diagnostics,
}

/// Terminal outcome of resolving one query's candidates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Matched(Match),
    NoMatch,
}

impl Resolution {
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }

    pub fn matched(&self) -> Option<&Match> {
        match self {
            Resolution::Matched(m) => Some(m),
            Resolution::NoMatch => None,
        }
    }

    pub fn into_match(self) -> Option<Match> {
        match self {
            Resolution::Matched(m) => Some(m),
            Resolution::NoMatch => None,
        }
    }
}

/// Treat empty or whitespace-only strings as absent
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}
