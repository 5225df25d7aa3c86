//! smr-engine - Candidate Resolution Engine
//!
//! Decides which remote candidate record, if any, is the local item being
//! identified. Candidates are scored on weak signals (title and slug
//! similarity, duration, size, network), classified into confidence tiers
//! and selected by a fixed tier priority with per-tier acceptance gates.
//!
//! Two drivers sit on top of the matching pipeline:
//! - [`orchestrator::QueryFallbackOrchestrator`]: identifier, slug, then
//!   title queries against one source
//! - [`federated::FederatedSearchCoordinator`]: title search across a family
//!   of independently indexed sub-sources

pub mod config;
pub mod error;
pub mod federated;
pub mod library;
pub mod matching;
pub mod orchestrator;
pub mod reference;
pub mod sources;
pub mod types;

pub use config::EngineSettings;
pub use error::{ResolveError, Result};
pub use federated::{FederatedHit, FederatedMode, FederatedOutcome, FederatedSearchCoordinator};
pub use orchestrator::{FallbackOutcome, FallbackState, QueryFallbackOrchestrator};
pub use reference::{build_reference, LookupRequest};
pub use types::{CandidateRecord, Match, ReferenceDescriptor, Resolution, SignalVector};
