//! Query Fallback Orchestrator
//!
//! Runs the matching pipeline over an ordered chain of queries against one
//! source: remote identifier, then URL slug text, then title text. The first
//! accepted resolution ends the chain. Each step's candidates are scored on
//! their own; nothing is carried between steps.

use crate::config::EngineSettings;
use crate::error::{ResolveError, Result};
use crate::matching::{resolve_candidates, ScoreOptions};
use crate::sources::{CandidateSource, SourceError, SourceQuery};
use crate::types::{ReferenceDescriptor, Resolution};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Query kind of one fallback step, in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStep {
    Identifier,
    Slug,
    Title,
}

impl FallbackStep {
    pub const CHAIN: [FallbackStep; 3] =
        [FallbackStep::Identifier, FallbackStep::Slug, FallbackStep::Title];

    /// Query for this step, if the reference carries its key
    fn query_for(&self, reference: &ReferenceDescriptor) -> Option<SourceQuery> {
        match self {
            FallbackStep::Identifier => reference
                .source_id()
                .map(|id| SourceQuery::Identifier(id.trim().to_string())),
            FallbackStep::Slug => reference
                .url_slug()
                .map(|slug| SourceQuery::Text(slug.trim().to_string())),
            FallbackStep::Title => reference
                .title()
                .map(|title| SourceQuery::Text(title.trim().to_string())),
        }
    }

    fn options(&self, settings: &EngineSettings) -> ScoreOptions {
        match self {
            FallbackStep::Identifier => settings.identity_options(),
            FallbackStep::Slug | FallbackStep::Title => settings.text_options(),
        }
    }
}

impl fmt::Display for FallbackStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FallbackStep::Identifier => "identifier",
            FallbackStep::Slug => "slug",
            FallbackStep::Title => "title",
        };
        f.write_str(name)
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackState {
    NotTried,
    Searched,
    Accepted,
    Exhausted,
}

/// What happened at one step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// Reference has no key for this step
    Skipped,
    Accepted { candidates: usize, tier: String },
    NoMatch { candidates: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: FallbackStep,
    pub status: StepStatus,
}

/// Result of one fallback run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackOutcome {
    pub resolution: Resolution,
    pub state: FallbackState,
    pub steps: Vec<StepReport>,
}

/// Fallback chain over one candidate source
pub struct QueryFallbackOrchestrator<'a, S: CandidateSource + ?Sized> {
    source: &'a S,
    settings: EngineSettings,
}

impl<'a, S: CandidateSource + ?Sized> QueryFallbackOrchestrator<'a, S> {
    pub fn new(source: &'a S, settings: EngineSettings) -> Self {
        Self { source, settings }
    }

    /// Resolve the reference against the source
    ///
    /// Fails fast with [`ResolveError::MissingQueryKey`] when no step can
    /// form a query. A step whose query fails counts as an empty result;
    /// only when every attempted step failed is the failure returned.
    pub async fn resolve(&self, reference: &ReferenceDescriptor) -> Result<FallbackOutcome> {
        if !reference.has_query_key() {
            return Err(ResolveError::MissingQueryKey);
        }

        let mut state = FallbackState::NotTried;
        let mut steps = Vec::with_capacity(FallbackStep::CHAIN.len());
        let mut attempted = 0usize;
        let mut last_error: Option<SourceError> = None;
        let mut failed = 0usize;

        for step in FallbackStep::CHAIN {
            let Some(query) = step.query_for(reference) else {
                steps.push(StepReport {
                    step,
                    status: StepStatus::Skipped,
                });
                continue;
            };

            attempted += 1;
            debug!(source = %self.source.name(), step = %step, query = %query, "Issuing fallback query");

            let candidates = match self.source.query(&query).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(
                        source = %self.source.name(),
                        step = %step,
                        "Query failed, treating as no results: {}",
                        e
                    );
                    steps.push(StepReport {
                        step,
                        status: StepStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                    failed += 1;
                    last_error = Some(e);
                    state = FallbackState::Searched;
                    continue;
                }
            };

            let resolution =
                resolve_candidates(&candidates, reference, &step.options(&self.settings));
            state = FallbackState::Searched;

            if let Resolution::Matched(matched) = &resolution {
                info!(
                    source = %self.source.name(),
                    step = %step,
                    candidate_id = %matched.candidate.id,
                    tier = %matched.tier,
                    "Reference resolved"
                );
                steps.push(StepReport {
                    step,
                    status: StepStatus::Accepted {
                        candidates: candidates.len(),
                        tier: matched.tier.code(),
                    },
                });
                return Ok(FallbackOutcome {
                    resolution,
                    state: FallbackState::Accepted,
                    steps,
                });
            }

            debug!(step = %step, candidates = candidates.len(), "No match, falling back");
            steps.push(StepReport {
                step,
                status: StepStatus::NoMatch {
                    candidates: candidates.len(),
                },
            });
        }

        if attempted > 0 && failed == attempted {
            if let Some(last) = last_error {
                return Err(ResolveError::AllQueriesFailed {
                    source_name: self.source.name().to_string(),
                    attempted,
                    last,
                });
            }
        }

        if state == FallbackState::Searched {
            state = FallbackState::Exhausted;
        }
        info!(source = %self.source.name(), attempted, "No match after all fallback steps");

        Ok(FallbackOutcome {
            resolution: Resolution::NoMatch,
            state,
            steps,
        })
    }
}
