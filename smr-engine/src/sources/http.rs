//! HTTP/JSON search source
//!
//! Config-driven client for search APIs that answer a GET with a JSON
//! document holding an array of hits. Field locations inside a hit are
//! JSON pointers from the source's TOML definition.

use crate::sources::{CandidateSource, SourceError, SourceQuery, SubSourceCatalog};
use crate::types::CandidateRecord;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde_json::Value;
use smr_common::config::{FieldMapConfig, SourceConfig};
use std::collections::HashMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("smr/", env!("CARGO_PKG_VERSION"));

/// Direct (unkeyed) limiter shared by every request of one source
type SourceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP/JSON source built from a `[[sources]]` entry
pub struct HttpJsonSource {
    config: SourceConfig,
    http_client: reqwest::Client,
    /// One request per `rate_limit_ms`; `None` when the interval is zero
    rate_limiter: Option<SourceRateLimiter>,
}

impl HttpJsonSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SourceError::Unsupported(format!("Header {}: {}", name, e)))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| SourceError::Unsupported(format!("Header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::NetworkError(e.to_string()))?;

        let rate_limiter = Quota::with_period(Duration::from_millis(config.rate_limit_ms))
            .map(RateLimiter::direct);

        Ok(Self {
            config,
            http_client,
            rate_limiter,
        })
    }

    /// Fetch one URL and map its hits
    async fn fetch(&self, url: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        tracing::debug!(source = %self.config.name, url = %url, "Querying search API");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(status.as_u16(), error_text));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        let hits = hits_from_document(&document, &self.config.hits_pointer, &self.config.fields)?;

        tracing::info!(
            source = %self.config.name,
            hits = hits.len(),
            "Search API returned results"
        );

        Ok(hits)
    }

    fn default_site(&self) -> &str {
        self.config
            .sub_sources
            .first()
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[async_trait]
impl CandidateSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn query(&self, query: &SourceQuery) -> Result<Vec<CandidateRecord>, SourceError> {
        let url = match query {
            SourceQuery::Identifier(id) => {
                let template = self.config.id_url.as_deref().ok_or_else(|| {
                    SourceError::Unsupported(format!(
                        "{} has no id_url configured",
                        self.config.name
                    ))
                })?;
                expand_template(template, self.default_site(), &[("id", id)])
            }
            SourceQuery::Text(text) => {
                expand_template(&self.config.search_url, self.default_site(), &[("query", text)])
            }
        };

        self.fetch(&url).await
    }
}

#[async_trait]
impl SubSourceCatalog for HttpJsonSource {
    fn sub_sources(&self) -> Vec<String> {
        self.config.sub_sources.clone()
    }

    async fn search(
        &self,
        sub_source: &str,
        query: &str,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let url = expand_template(&self.config.search_url, sub_source, &[("query", query)]);
        self.fetch(&url).await
    }
}

/// Substitute `{site}` and named placeholders, URL-encoding every value
pub fn expand_template(template: &str, site: &str, values: &[(&str, &str)]) -> String {
    let mut url = template.replace("{site}", &urlencoding::encode(site));
    for (name, value) in values {
        url = url.replace(&format!("{{{}}}", name), &urlencoding::encode(value));
    }
    url
}

/// Map the hits array of a search response to candidate records
///
/// Hits without an id or title are skipped.
pub fn hits_from_document(
    document: &Value,
    hits_pointer: &str,
    fields: &FieldMapConfig,
) -> Result<Vec<CandidateRecord>, SourceError> {
    let hits = document
        .pointer(hits_pointer)
        .ok_or_else(|| SourceError::ParseError(format!("No value at {}", hits_pointer)))?;

    let hits = match hits {
        Value::Array(items) => items.as_slice(),
        Value::Null => &[],
        other => {
            return Err(SourceError::ParseError(format!(
                "Expected array at '{}', found {}",
                hits_pointer,
                type_name(other)
            )))
        }
    };

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let record = candidate_from_hit(hit, fields);
            if record.is_none() {
                tracing::debug!("Skipping hit without id or title");
            }
            record
        })
        .collect())
}

fn candidate_from_hit(hit: &Value, fields: &FieldMapConfig) -> Option<CandidateRecord> {
    let id = text_at(hit, &fields.id)?;
    let title = text_at(hit, &fields.title)?;

    let sizes = hit
        .pointer(&fields.sizes_by_quality)
        .and_then(Value::as_object)
        .map(|sizes| {
            sizes
                .iter()
                .filter_map(|(quality, size)| as_u64(size).map(|s| (quality.clone(), s)))
                .collect::<HashMap<_, _>>()
        })
        .filter(|sizes| !sizes.is_empty());

    Some(CandidateRecord {
        id,
        title,
        url_slug: text_at(hit, &fields.url_slug),
        duration_seconds: hit.pointer(&fields.duration).and_then(as_u64),
        file_size_bytes_by_quality: sizes,
        generic_file_size_bytes: hit.pointer(&fields.generic_size).and_then(as_u64),
        site_name: text_at(hit, &fields.site_name),
        network_name: text_at(hit, &fields.network_name),
    })
}

/// String or number at `pointer`, as text
fn text_at(hit: &Value, pointer: &str) -> Option<String> {
    match hit.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer from a number or numeric string
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
