//! Candidate matching pipeline
//!
//! Scores every candidate of one query against the reference, classifies it
//! into a tier, keeps one representative per tier and picks the winner.
//!
//! - [`similarity`]: Ratcliff/Obershelp ratio
//! - [`signals`]: per-candidate signal vector
//! - [`tier`]: tier codes, priority table and acceptance gates
//! - [`selector`]: bucket reduction and selection

pub mod selector;
pub mod signals;
pub mod similarity;
pub mod tier;

pub use selector::{ScoredCandidate, TierBuckets};
pub use signals::{score, ScoreOptions};
pub use similarity::sequence_ratio;
pub use tier::{Gate, Tier};

use crate::types::{CandidateRecord, Diagnostics, Match, ReferenceDescriptor, Resolution};
use tracing::{debug, info};

/// Resolve one query's candidate set to at most one match
pub fn resolve_candidates(
    candidates: &[CandidateRecord],
    reference: &ReferenceDescriptor,
    options: &ScoreOptions,
) -> Resolution {
    let mut buckets = TierBuckets::new();

    for candidate in candidates {
        let signals = score(candidate, reference, options);
        let tier = Tier::classify(&signals);

        debug!(
            candidate_id = %candidate.id,
            title = %candidate.title,
            title_ratio = signals.title_ratio,
            url_ratio = signals.url_ratio,
            duration = signals.duration_match,
            size = signals.size_match,
            domain = signals.domain_match,
            tier = %tier,
            "Scored candidate"
        );

        buckets.insert(ScoredCandidate {
            candidate,
            signals,
            tier,
        });
    }

    for best in buckets.in_priority_order() {
        info!(
            tier = %best.tier,
            title = %best.candidate.title,
            title_ratio = best.signals.title_ratio,
            url_ratio = best.signals.url_ratio,
            "Best candidate for tier"
        );
    }

    match buckets.select() {
        Some(winner) => {
            info!(
                candidate_id = %winner.candidate.id,
                tier = %winner.tier,
                "Candidate accepted"
            );
            Resolution::Matched(Match {
                candidate: winner.candidate.clone(),
                tier: winner.tier,
                diagnostics: Diagnostics::from(&winner.signals),
            })
        }
        None => {
            if !buckets.is_empty() {
                debug!(
                    candidates = candidates.len(),
                    "No tier representative cleared its acceptance gate"
                );
            }
            Resolution::NoMatch
        }
    }
}
