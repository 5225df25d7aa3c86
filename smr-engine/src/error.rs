//! Resolution errors
//!
//! Data-quality problems are never errors; they only demote candidates.

use crate::sources::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Reference has no title, slug or id, so no query can be formed
    #[error("Reference has no title, URL slug or identifier to query with")]
    MissingQueryKey,

    /// Every attempted query failed at the source
    #[error("All {attempted} queries against {source_name} failed; last error: {last}")]
    AllQueriesFailed {
        source_name: String,
        attempted: usize,
        last: SourceError,
    },

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Common(#[from] smr_common::Error),

    #[error("Search cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ResolveError>;
