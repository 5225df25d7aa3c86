//! Signal Scorer
//!
//! Computes the independent weak signals for one candidate against one
//! reference. Pure: missing numeric fields on either side simply leave the
//! corresponding signal false.

use crate::matching::similarity::sequence_ratio;
use crate::types::{CandidateRecord, ReferenceDescriptor, SignalVector};

/// Duration tolerance for free-text queries
pub const DEFAULT_DURATION_TOLERANCE_SECS: u64 = 60;

/// Duration tolerance for identifier queries
///
/// An identifier query is already narrow; the looser check only adds
/// confidence, it is not meant to filter.
pub const IDENTITY_DURATION_TOLERANCE_SECS: u64 = 120;

/// Accepted size deviation in percent of the local file size
pub const DEFAULT_SIZE_TOLERANCE_PERCENT: f64 = 1.0;

/// URL ratio above which an identity search without local facts is trusted
const IDENTITY_URL_RATIO: f64 = 0.5;

/// Height at and above which the size map key is "4k"
const TOP_QUALITY_HEIGHT: u32 = 2160;

/// Per-query scoring parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOptions {
    pub duration_tolerance_secs: u64,
    pub size_tolerance_percent: f64,
    pub identity_search: bool,
}

impl ScoreOptions {
    /// Options for a free-text query
    pub fn text_search() -> Self {
        Self {
            duration_tolerance_secs: DEFAULT_DURATION_TOLERANCE_SECS,
            size_tolerance_percent: DEFAULT_SIZE_TOLERANCE_PERCENT,
            identity_search: false,
        }
    }

    /// Options for an identifier query
    pub fn identity_search() -> Self {
        Self {
            duration_tolerance_secs: IDENTITY_DURATION_TOLERANCE_SECS,
            size_tolerance_percent: DEFAULT_SIZE_TOLERANCE_PERCENT,
            identity_search: true,
        }
    }
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self::text_search()
    }
}

/// Score one candidate against the reference
pub fn score(
    candidate: &CandidateRecord,
    reference: &ReferenceDescriptor,
    options: &ScoreOptions,
) -> SignalVector {
    let title_ratio = match reference.title() {
        Some(title) if !candidate.title.trim().is_empty() => {
            sequence_ratio(title, &candidate.title)
        }
        _ => 0.0,
    };

    let url_ratio = match (reference.url_slug(), candidate.url_slug()) {
        (Some(local), Some(remote)) => sequence_ratio(local, remote),
        _ => 0.0,
    };

    let duration_match = match (candidate.duration_seconds, reference.duration_seconds) {
        (Some(remote), Some(local)) => remote.abs_diff(local) <= options.duration_tolerance_secs,
        _ => false,
    };

    let size_match = reference
        .file_size_bytes
        .zip(resolve_candidate_size(candidate, reference.quality_label.as_deref()))
        .map(|(local, remote)| within_percent(remote, local, options.size_tolerance_percent))
        .unwrap_or(false);

    let domain_match = reference
        .domain()
        .map(|domain| {
            [&candidate.site_name, &candidate.network_name]
                .iter()
                .filter_map(|name| name.as_deref())
                .any(|name| name.eq_ignore_ascii_case(domain))
        })
        .unwrap_or(false);

    let id_flag = url_ratio == 1.0
        || (options.identity_search
            && (duration_match
                || (reference.lacks_local_facts() && url_ratio > IDENTITY_URL_RATIO)));

    let id_match = reference
        .source_id()
        .map(|id| id == candidate.id)
        .unwrap_or(false);

    SignalVector {
        title_ratio,
        url_ratio,
        duration_match,
        size_match,
        domain_match,
        id_flag,
        id_match,
    }
}

/// Key into a candidate's per-quality size map for a local quality label
///
/// Top-bucket heights map to "4k"; anything else becomes "{label}p".
pub fn quality_size_key(label: &str) -> String {
    let trimmed = label.trim();
    let bare = trimmed
        .strip_suffix('p')
        .or_else(|| trimmed.strip_suffix('P'))
        .unwrap_or(trimmed);

    if bare.eq_ignore_ascii_case("4k") {
        return "4k".to_string();
    }

    match bare.parse::<u32>() {
        Ok(height) if height >= TOP_QUALITY_HEIGHT => "4k".to_string(),
        _ => format!("{}p", bare),
    }
}

/// Candidate size for the local quality, falling back to the generic size
fn resolve_candidate_size(candidate: &CandidateRecord, quality_label: Option<&str>) -> Option<u64> {
    let by_quality = quality_label.and_then(|label| {
        let key = quality_size_key(label);
        candidate
            .file_size_bytes_by_quality
            .as_ref()
            .and_then(|sizes| sizes.get(&key).copied())
    });

    by_quality.or(candidate.generic_file_size_bytes)
}

/// Whether `value` lies within `percent` of `reference` (inclusive)
fn within_percent(value: u64, reference: u64, percent: f64) -> bool {
    let allowed = reference as f64 * percent / 100.0;
    (value.abs_diff(reference) as f64) <= allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn candidate(title: &str) -> CandidateRecord {
        CandidateRecord {
            id: "100".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_quality_size_key() {
        assert_eq!(quality_size_key("1080"), "1080p");
        assert_eq!(quality_size_key("720p"), "720p");
        assert_eq!(quality_size_key("2160"), "4k");
        assert_eq!(quality_size_key("4320"), "4k");
        assert_eq!(quality_size_key("4K"), "4k");
    }

    #[test]
    fn test_full_match_scenario() {
        let reference = ReferenceDescriptor {
            title: Some("Scene Alpha".to_string()),
            duration_seconds: Some(600),
            file_size_bytes: Some(1_000_000_000),
            quality_label: Some("1080".to_string()),
            ..Default::default()
        };
        let mut remote = candidate("Scene Alpha");
        remote.duration_seconds = Some(605);
        remote.file_size_bytes_by_quality =
            Some(HashMap::from([("1080p".to_string(), 1_005_000_000)]));

        let signals = score(&remote, &reference, &ScoreOptions::text_search());
        assert_eq!(signals.title_ratio, 1.0);
        assert!(signals.duration_match);
        assert!(signals.size_match);
        assert!(!signals.domain_match);
        assert!(!signals.id_flag);
    }

    #[test]
    fn test_duration_tolerance_boundaries() {
        let reference = ReferenceDescriptor {
            title: Some("t".to_string()),
            duration_seconds: Some(600),
            ..Default::default()
        };
        let mut remote = candidate("t");

        remote.duration_seconds = Some(660);
        assert!(score(&remote, &reference, &ScoreOptions::text_search()).duration_match);

        remote.duration_seconds = Some(661);
        assert!(!score(&remote, &reference, &ScoreOptions::text_search()).duration_match);
        assert!(score(&remote, &reference, &ScoreOptions::identity_search()).duration_match);

        remote.duration_seconds = Some(479);
        assert!(!score(&remote, &reference, &ScoreOptions::identity_search()).duration_match);
    }

    #[test]
    fn test_size_falls_back_to_generic() {
        let reference = ReferenceDescriptor {
            title: Some("t".to_string()),
            file_size_bytes: Some(2_000_000),
            quality_label: Some("720".to_string()),
            ..Default::default()
        };
        let mut remote = candidate("t");
        remote.file_size_bytes_by_quality =
            Some(HashMap::from([("1080p".to_string(), 9_999_999)]));
        remote.generic_file_size_bytes = Some(2_020_000);

        assert!(score(&remote, &reference, &ScoreOptions::text_search()).size_match);

        remote.generic_file_size_bytes = Some(2_020_001);
        assert!(!score(&remote, &reference, &ScoreOptions::text_search()).size_match);
    }

    #[test]
    fn test_size_requires_local_size() {
        let reference = ReferenceDescriptor {
            title: Some("t".to_string()),
            ..Default::default()
        };
        let mut remote = candidate("t");
        remote.generic_file_size_bytes = Some(0);

        assert!(!score(&remote, &reference, &ScoreOptions::text_search()).size_match);
    }

    #[test]
    fn test_domain_match_on_site_or_network() {
        let reference = ReferenceDescriptor {
            title: Some("t".to_string()),
            domain: Some("examplesite".to_string()),
            ..Default::default()
        };
        let mut remote = candidate("t");
        remote.network_name = Some("ExampleSite".to_string());
        assert!(score(&remote, &reference, &ScoreOptions::text_search()).domain_match);

        remote.network_name = None;
        remote.site_name = Some("other".to_string());
        assert!(!score(&remote, &reference, &ScoreOptions::text_search()).domain_match);
    }

    #[test]
    fn test_exact_slug_sets_id_flag_in_any_mode() {
        let reference = ReferenceDescriptor {
            url_slug: Some("scene-alpha".to_string()),
            ..Default::default()
        };
        let mut remote = candidate("Unrelated");
        remote.url_slug = Some("Scene-Alpha".to_string());

        let signals = score(&remote, &reference, &ScoreOptions::text_search());
        assert_eq!(signals.url_ratio, 1.0);
        assert!(signals.id_flag);
    }

    #[test]
    fn test_identity_search_needs_supporting_evidence() {
        let reference = ReferenceDescriptor {
            source_id: Some("100".to_string()),
            url_slug: Some("scene-alpha".to_string()),
            duration_seconds: Some(600),
            ..Default::default()
        };
        let mut remote = candidate("Scene Alpha");
        remote.url_slug = Some("scene-alpha-2".to_string());
        remote.duration_seconds = Some(900);

        // Local facts exist but the duration disagrees
        let signals = score(&remote, &reference, &ScoreOptions::identity_search());
        assert!(!signals.id_flag);
        assert!(signals.id_match);

        remote.duration_seconds = Some(700);
        assert!(score(&remote, &reference, &ScoreOptions::identity_search()).id_flag);
    }

    #[test]
    fn test_identity_search_without_local_facts_uses_url_ratio() {
        let reference = ReferenceDescriptor {
            title: Some("Rare Scene".to_string()),
            ..Default::default()
        };
        let remote = candidate("Rare Scene");

        let signals = score(&remote, &reference, &ScoreOptions::identity_search());
        assert_eq!(signals.title_ratio, 1.0);
        assert_eq!(signals.url_ratio, 0.0);
        assert!(!signals.id_flag);
    }

    #[test]
    fn test_missing_title_scores_zero() {
        let reference = ReferenceDescriptor {
            source_id: Some("1".to_string()),
            ..Default::default()
        };
        let signals = score(&candidate("Scene"), &reference, &ScoreOptions::text_search());
        assert_eq!(signals.title_ratio, 0.0);
        assert_eq!(signals.url_ratio, 0.0);
    }
}
