//! Canned in-memory source
//!
//! Answers queries from a fixed table, loaded from JSON or built in code.
//! Used by the offline CLI mode and by tests. Every issued query is
//! recorded so callers can inspect what was asked.

use crate::sources::{CandidateSource, SourceError, SourceQuery, SubSourceCatalog};
use crate::types::CandidateRecord;
use async_trait::async_trait;
use serde::Deserialize;
use smr_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Canned responses of one sub-source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubSourceFixture {
    pub name: String,
    /// Free-text query → hits
    #[serde(default)]
    pub results: HashMap<String, Vec<CandidateRecord>>,
    /// Simulate a failing sub-source
    #[serde(default)]
    pub fail: bool,
}

/// In-memory candidate source
#[derive(Debug, Default, Deserialize)]
pub struct StaticSource {
    #[serde(default = "default_name")]
    name: String,

    /// Remote identifier → hits
    #[serde(default)]
    by_identifier: HashMap<String, Vec<CandidateRecord>>,

    /// Free-text query → hits
    #[serde(default)]
    by_text: HashMap<String, Vec<CandidateRecord>>,

    /// Sub-sources in default search order
    #[serde(default)]
    sub_sources: Vec<SubSourceFixture>,

    #[serde(skip)]
    issued: Mutex<Vec<String>>,
}

fn default_name() -> String {
    "static".to_string()
}

fn text_key(query: &str) -> String {
    query.trim().to_lowercase()
}

impl StaticSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Load canned responses from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::InvalidInput(format!("Fixture {} is invalid: {}", path.display(), e))
        })
    }

    pub fn with_identifier(mut self, id: &str, hits: Vec<CandidateRecord>) -> Self {
        self.by_identifier.insert(id.to_string(), hits);
        self
    }

    pub fn with_text(mut self, query: &str, hits: Vec<CandidateRecord>) -> Self {
        self.by_text.insert(text_key(query), hits);
        self
    }

    pub fn with_sub_source(mut self, name: &str, query: &str, hits: Vec<CandidateRecord>) -> Self {
        let key = text_key(query);
        match self.sub_sources.iter_mut().find(|s| s.name == name) {
            Some(existing) => {
                existing.results.insert(key, hits);
            }
            None => self.sub_sources.push(SubSourceFixture {
                name: name.to_string(),
                results: HashMap::from([(key, hits)]),
                fail: false,
            }),
        }
        self
    }

    pub fn with_failing_sub_source(mut self, name: &str) -> Self {
        self.sub_sources.push(SubSourceFixture {
            name: name.to_string(),
            results: HashMap::new(),
            fail: true,
        });
        self
    }

    /// Queries issued so far, formatted as `id:…`, `text:…` or `site/text`
    pub fn issued(&self) -> Vec<String> {
        self.issued
            .lock()
            .map(|issued| issued.clone())
            .unwrap_or_default()
    }

    fn record(&self, entry: String) {
        if let Ok(mut issued) = self.issued.lock() {
            issued.push(entry);
        }
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, query: &SourceQuery) -> std::result::Result<Vec<CandidateRecord>, SourceError> {
        self.record(query.to_string());

        let hits = match query {
            SourceQuery::Identifier(id) => self.by_identifier.get(id),
            SourceQuery::Text(text) => self.by_text.get(&text_key(text)),
        };
        Ok(hits.cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SubSourceCatalog for StaticSource {
    fn sub_sources(&self) -> Vec<String> {
        self.sub_sources.iter().map(|s| s.name.clone()).collect()
    }

    async fn search(
        &self,
        sub_source: &str,
        query: &str,
    ) -> std::result::Result<Vec<CandidateRecord>, SourceError> {
        self.record(format!("{}/{}", sub_source, query));

        let fixture = self
            .sub_sources
            .iter()
            .find(|s| s.name == sub_source)
            .ok_or_else(|| SourceError::UnknownSubSource(sub_source.to_string()))?;

        if fixture.fail {
            return Err(SourceError::NetworkError(format!(
                "{} is unreachable",
                sub_source
            )));
        }

        Ok(fixture
            .results
            .get(&text_key(query))
            .cloned()
            .unwrap_or_default())
    }
}
