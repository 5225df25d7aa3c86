//! Local library lookup
//!
//! Supplies the duration, size and quality of the local file being
//! identified. The engine only consumes these three facts and does not care
//! which transport produced them.

pub mod graphql;
pub mod sqlite;

pub use graphql::GraphqlLibrary;
pub use sqlite::SqliteLibrary;

use crate::types::ReferenceDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smr_common::config::TomlConfig;
use smr_common::Result;
use tracing::{debug, warn};

/// Facts about the local file known to the library
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocalFileFacts {
    pub duration_seconds: Option<u64>,
    pub file_size_bytes: Option<u64>,
    pub quality_label: Option<String>,
}

impl LocalFileFacts {
    /// Copy the known facts into a reference descriptor
    pub fn apply_to(&self, reference: &mut ReferenceDescriptor) {
        if self.duration_seconds.is_some() {
            reference.duration_seconds = self.duration_seconds;
        }
        if self.file_size_bytes.is_some() {
            reference.file_size_bytes = self.file_size_bytes;
        }
        if self.quality_label.is_some() {
            reference.quality_label = self.quality_label.clone();
        }
    }
}

/// Read-only lookup of local file facts by library record id
#[async_trait]
pub trait LibraryLookup: Send + Sync {
    /// `Ok(None)` when the library has no such record
    async fn file_facts(&self, local_id: &str) -> Result<Option<LocalFileFacts>>;
}

#[async_trait]
impl<T: LibraryLookup + ?Sized> LibraryLookup for Box<T> {
    async fn file_facts(&self, local_id: &str) -> Result<Option<LocalFileFacts>> {
        (**self).file_facts(local_id).await
    }
}

/// Consult `primary`, falling back to `secondary` on error or absence
pub struct FallbackLibrary<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackLibrary<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> LibraryLookup for FallbackLibrary<P, S>
where
    P: LibraryLookup,
    S: LibraryLookup,
{
    async fn file_facts(&self, local_id: &str) -> Result<Option<LocalFileFacts>> {
        match self.primary.file_facts(local_id).await {
            Ok(Some(facts)) => return Ok(Some(facts)),
            Ok(None) => debug!(local_id = %local_id, "Primary library has no record, trying fallback"),
            Err(e) => warn!(local_id = %local_id, "Primary library lookup failed ({}), trying fallback", e),
        }

        self.secondary.file_facts(local_id).await
    }
}

/// Build the library lookup described by the config
///
/// The query endpoint is asked first and the database answers when the
/// endpoint fails or lacks the record. Returns `None` when neither is
/// configured or usable.
pub async fn open_library(config: &TomlConfig) -> Option<Box<dyn LibraryLookup>> {
    let endpoint = config.library_endpoint.as_deref().and_then(|url| {
        GraphqlLibrary::new(url, config.library_api_key.as_deref())
            .map_err(|e| warn!("Library endpoint {} unusable: {}", url, e))
            .ok()
    });

    let database = match &config.library_database {
        Some(path) => SqliteLibrary::open(path)
            .await
            .map_err(|e| warn!("Library database unavailable: {}", e))
            .ok(),
        None => None,
    };

    match (endpoint, database) {
        (Some(endpoint), Some(database)) => Some(Box::new(FallbackLibrary::new(endpoint, database))),
        (Some(endpoint), None) => Some(Box::new(endpoint)),
        (None, Some(database)) => Some(Box::new(database)),
        (None, None) => None,
    }
}

/// Merge the library's facts for `local_id` into the reference
///
/// Lookup failures only cost signals, so they are logged and the reference
/// is left as it was. Returns true when facts were applied.
pub async fn enrich_reference<L: LibraryLookup + ?Sized>(
    library: &L,
    local_id: &str,
    reference: &mut ReferenceDescriptor,
) -> bool {
    match library.file_facts(local_id).await {
        Ok(Some(facts)) => {
            facts.apply_to(reference);
            debug!(local_id = %local_id, "Reference enriched from library");
            true
        }
        Ok(None) => {
            warn!(local_id = %local_id, "Library has no record for local id");
            false
        }
        Err(e) => {
            warn!(local_id = %local_id, "Library lookup failed, continuing without local facts: {}", e);
            false
        }
    }
}
