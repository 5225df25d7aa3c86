//! Result Selector
//!
//! Reduces scored candidates to one representative per tier, then walks the
//! tier priority table and returns the first representative whose ratios
//! clear its tier's gate.

use crate::matching::tier::{Tier, PRIORITY};
use crate::types::{CandidateRecord, SignalVector};
use std::collections::HashMap;

/// A candidate together with its signals and tier
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a CandidateRecord,
    pub signals: SignalVector,
    pub tier: Tier,
}

/// One representative per tier
#[derive(Debug, Default)]
pub struct TierBuckets<'a> {
    buckets: HashMap<Tier, ScoredCandidate<'a>>,
}

impl<'a> TierBuckets<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate to its tier's bucket
    ///
    /// Returns true when the candidate became the bucket's representative.
    pub fn insert(&mut self, scored: ScoredCandidate<'a>) -> bool {
        match self.buckets.get_mut(&scored.tier) {
            Some(occupant) => {
                if replaces(&occupant.signals, &scored.signals) {
                    *occupant = scored;
                    true
                } else {
                    false
                }
            }
            None => {
                self.buckets.insert(scored.tier, scored);
                true
            }
        }
    }

    pub fn get(&self, tier: &Tier) -> Option<&ScoredCandidate<'a>> {
        self.buckets.get(tier)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Representatives in priority order, best tier first
    pub fn in_priority_order(&self) -> impl Iterator<Item = &ScoredCandidate<'a>> + '_ {
        PRIORITY.iter().filter_map(|tier| self.buckets.get(tier))
    }

    /// Best gate-passing representative, if any
    pub fn select(&self) -> Option<&ScoredCandidate<'a>> {
        self.in_priority_order()
            .find(|scored| scored.tier.gate().passes(&scored.signals))
    }
}

/// Bucket replacement rule
///
/// URL slugs are trusted over titles: a higher URL ratio always takes the
/// bucket; a challenger relying on its title must beat both of the
/// occupant's ratios.
fn replaces(occupant: &SignalVector, challenger: &SignalVector) -> bool {
    challenger.url_ratio > occupant.url_ratio
        || (challenger.title_ratio > occupant.title_ratio
            && challenger.title_ratio > occupant.url_ratio)
}
