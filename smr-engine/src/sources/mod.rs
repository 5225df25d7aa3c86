//! Remote candidate sources
//!
//! The engine never talks to the network itself; it asks a source for the
//! candidates of one query. Authentication, retries and field extraction
//! live behind these traits.

pub mod http;
pub mod static_source;

pub use http::HttpJsonSource;
pub use static_source::StaticSource;

use crate::types::CandidateRecord;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Source query errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown sub-source: {0}")]
    UnknownSubSource(String),

    #[error("Unsupported query: {0}")]
    Unsupported(String),
}

/// One query issued against a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceQuery {
    /// Filter by remote identifier
    Identifier(String),
    /// Free-text search
    Text(String),
}

impl fmt::Display for SourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceQuery::Identifier(id) => write!(f, "id:{}", id),
            SourceQuery::Text(text) => write!(f, "text:{}", text),
        }
    }
}

/// A single searchable remote catalog
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run one query; an empty vector means "no hits"
    async fn query(&self, query: &SourceQuery) -> Result<Vec<CandidateRecord>, SourceError>;
}

/// A family of independently indexed catalogs sharing one API
#[async_trait]
pub trait SubSourceCatalog: Send + Sync {
    /// Every known sub-source, in default search order
    fn sub_sources(&self) -> Vec<String>;

    /// Free-text search against one sub-source
    async fn search(
        &self,
        sub_source: &str,
        query: &str,
    ) -> Result<Vec<CandidateRecord>, SourceError>;
}
