//! Federated Search Coordinator
//!
//! Searches a family of independently indexed sub-sources that share one
//! API. Hits are scored by title (or name) similarity alone, since duration,
//! size and network are not comparable across unrelated catalogs.
//!
//! Sub-sources are consumed strictly in caller order. In concurrent mode up
//! to `max_in_flight` requests run ahead, but a later sub-source can never
//! win over an earlier one that clears the threshold. Returning early drops
//! the stream, which cancels every request still in flight.

use crate::error::{ResolveError, Result};
use crate::matching::similarity::rounded_ratio;
use crate::sources::{SourceError, SubSourceCatalog};
use crate::types::CandidateRecord;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ratio a hit must exceed to appear in a listing
pub const LISTING_MIN_RATIO: f64 = 0.5;

/// Listing stops querying once this many results were collected
pub const LISTING_TARGET: usize = 10;

/// How sub-source queries are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FederatedMode {
    #[default]
    Sequential,
    Concurrent { max_in_flight: usize },
}

impl FederatedMode {
    /// Mode for a configured concurrency level (1 or less is sequential)
    pub fn from_concurrency(max_in_flight: usize) -> Self {
        if max_in_flight <= 1 {
            FederatedMode::Sequential
        } else {
            FederatedMode::Concurrent { max_in_flight }
        }
    }

    fn in_flight(&self) -> usize {
        match self {
            FederatedMode::Sequential => 1,
            FederatedMode::Concurrent { max_in_flight } => (*max_in_flight).max(1),
        }
    }
}

/// A hit together with the sub-source it came from and its ratio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FederatedHit {
    pub sub_source: String,
    pub ratio: f64,
    pub candidate: CandidateRecord,
}

/// Result of a single-hit federated lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FederatedOutcome {
    /// First sub-source whose best hit cleared the threshold
    Accepted(FederatedHit),
    /// Nothing cleared the threshold; the globally best hit, if any
    BelowThreshold { best: Option<FederatedHit> },
}

impl FederatedOutcome {
    pub fn accepted(&self) -> Option<&FederatedHit> {
        match self {
            FederatedOutcome::Accepted(hit) => Some(hit),
            FederatedOutcome::BelowThreshold { .. } => None,
        }
    }
}

pub struct FederatedSearchCoordinator<'a, C: SubSourceCatalog + ?Sized> {
    catalog: &'a C,
    mode: FederatedMode,
    cancel: CancellationToken,
}

impl<'a, C: SubSourceCatalog + ?Sized> FederatedSearchCoordinator<'a, C> {
    pub fn new(catalog: &'a C, mode: FederatedMode) -> Self {
        Self {
            catalog,
            mode,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the search when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Find the first sub-source whose best hit reaches `min_ratio`
    ///
    /// An empty `sub_sources` list searches every known sub-source.
    pub async fn find(
        &self,
        query: &str,
        sub_sources: &[String],
        min_ratio: f64,
    ) -> Result<FederatedOutcome> {
        let sites = self.ordered_sub_sources(sub_sources);
        let mut results = std::pin::pin!(self.search_stream(query, &sites));

        let mut best: Option<FederatedHit> = None;
        let mut failures = SiteFailures::default();

        while let Some((site, result)) = self.next_result(&mut results).await? {
            let hits = match result {
                Ok(hits) => hits,
                Err(e) => {
                    failures.record(&site, e);
                    continue;
                }
            };

            let Some(site_best) = best_hit(&site, query, hits) else {
                debug!(sub_source = %site, "Sub-source returned no hits");
                continue;
            };

            if site_best.ratio >= min_ratio {
                info!(
                    sub_source = %site,
                    candidate_id = %site_best.candidate.id,
                    ratio = site_best.ratio,
                    "Federated match accepted"
                );
                return Ok(FederatedOutcome::Accepted(site_best));
            }

            info!(
                sub_source = %site,
                title = %site_best.candidate.title,
                ratio = site_best.ratio,
                min_ratio,
                "Best sub-source result below threshold"
            );

            if best.as_ref().map_or(true, |b| site_best.ratio > b.ratio) {
                best = Some(site_best);
            }
        }

        failures.into_result(sites.len())?;
        Ok(FederatedOutcome::BelowThreshold { best })
    }

    /// Collect every hit with ratio above 0.5 across sub-sources
    ///
    /// Duplicate candidate ids keep their first occurrence. Querying stops
    /// once at least ten results were collected. Results are ordered by
    /// ratio, best first; ties keep discovery order.
    pub async fn search_all(&self, query: &str, sub_sources: &[String]) -> Result<Vec<FederatedHit>> {
        let sites = self.ordered_sub_sources(sub_sources);
        let mut results = std::pin::pin!(self.search_stream(query, &sites));

        let mut listing: Vec<FederatedHit> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut failures = SiteFailures::default();

        while let Some((site, result)) = self.next_result(&mut results).await? {
            let hits = match result {
                Ok(hits) => hits,
                Err(e) => {
                    failures.record(&site, e);
                    continue;
                }
            };

            for candidate in hits {
                let ratio = rounded_ratio(query, &candidate.title);
                if ratio <= LISTING_MIN_RATIO || !seen.insert(candidate.id.clone()) {
                    continue;
                }
                listing.push(FederatedHit {
                    sub_source: site.clone(),
                    ratio,
                    candidate,
                });
            }

            if listing.len() >= LISTING_TARGET {
                debug!(results = listing.len(), "Listing target reached");
                break;
            }
        }

        if listing.is_empty() {
            failures.into_result(sites.len())?;
        }

        listing.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
        info!(query = %query, results = listing.len(), "Federated listing complete");
        Ok(listing)
    }

    fn ordered_sub_sources(&self, requested: &[String]) -> Vec<String> {
        if !requested.is_empty() {
            return requested.to_vec();
        }

        let all = self.catalog.sub_sources();
        warn!(
            sub_sources = all.len(),
            "No sub-sources given, searching all of them (slow)"
        );
        all
    }

    /// Sub-source results in caller order, with up to `in_flight` requests running
    fn search_stream<'s>(
        &'s self,
        query: &'s str,
        sites: &'s [String],
    ) -> impl futures::Stream<Item = (String, std::result::Result<Vec<CandidateRecord>, SourceError>)> + 's
    {
        let catalog: &'s C = self.catalog;
        stream::iter(sites.iter())
            .map(move |site| async move {
                debug!(sub_source = %site, query = %query, "Querying sub-source");
                (site.clone(), catalog.search(site, query).await)
            })
            .buffered(self.mode.in_flight())
    }

    /// Next sub-source result, or `Cancelled` if the host aborted
    async fn next_result<S>(
        &self,
        results: &mut std::pin::Pin<&mut S>,
    ) -> Result<Option<S::Item>>
    where
        S: futures::Stream,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("Federated search cancelled");
                Err(ResolveError::Cancelled)
            }
            next = results.next() => Ok(next),
        }
    }
}

/// Highest-ratio hit of one sub-source; the first wins on ties
fn best_hit(site: &str, query: &str, hits: Vec<CandidateRecord>) -> Option<FederatedHit> {
    let mut best: Option<FederatedHit> = None;
    for candidate in hits {
        let ratio = rounded_ratio(query, &candidate.title);
        debug!(sub_source = %site, title = %candidate.title, ratio, "Scored federated hit");
        if best.as_ref().map_or(true, |b| ratio > b.ratio) {
            best = Some(FederatedHit {
                sub_source: site.to_string(),
                ratio,
                candidate,
            });
        }
    }
    best
}

/// Failed sub-source queries, logged as they happen
#[derive(Default)]
struct SiteFailures {
    count: usize,
    last: Option<SourceError>,
}

impl SiteFailures {
    fn record(&mut self, site: &str, error: SourceError) {
        warn!(sub_source = %site, "Sub-source query failed, skipping: {}", error);
        self.count += 1;
        self.last = Some(error);
    }

    /// Error when every queried sub-source failed
    fn into_result(self, queried: usize) -> Result<()> {
        match self.last {
            Some(last) if self.count == queried => Err(ResolveError::AllQueriesFailed {
                source_name: "federated catalog".to_string(),
                attempted: self.count,
                last,
            }),
            _ => Ok(()),
        }
    }
}
