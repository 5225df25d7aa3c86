//! GraphQL library backend
//!
//! Asks the media library's query endpoint for the first file of a scene.
//! The database backend stays available as the fallback when the endpoint
//! is down.

use crate::library::{LibraryLookup, LocalFileFacts};
use async_trait::async_trait;
use serde_json::{json, Value};
use smr_common::{Error, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("smr/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;

const FIND_SCENE_QUERY: &str = r#"
query FindScene($id: ID) {
  findScene(id: $id) {
    files {
      size
      duration
      height
    }
  }
}
"#;

/// Library lookup over the `findScene` GraphQL query
pub struct GraphqlLibrary {
    graphql_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl GraphqlLibrary {
    /// `endpoint` is the library's base URL; `/graphql` is appended
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            graphql_url: format!("{}/graphql", endpoint.trim_end_matches('/')),
            api_key: api_key.map(str::to_string),
            http_client,
        })
    }
}

#[async_trait]
impl LibraryLookup for GraphqlLibrary {
    async fn file_facts(&self, local_id: &str) -> Result<Option<LocalFileFacts>> {
        tracing::debug!(url = %self.graphql_url, local_id = %local_id, "Querying library endpoint");

        let mut request = self
            .http_client
            .post(&self.graphql_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({
                "query": FIND_SCENE_QUERY,
                "variables": { "id": local_id },
            }));
        if let Some(key) = &self.api_key {
            request = request.header("ApiKey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Library endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Internal(format!(
                "Library endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Library endpoint sent invalid JSON: {}", e)))?;

        facts_from_response(&document)
    }
}

/// Map a `findScene` response to the facts of the scene's first file
///
/// A null `findScene` means the library has no such record. GraphQL errors
/// without data are reported as failures so the caller can fall back.
fn facts_from_response(document: &Value) -> Result<Option<LocalFileFacts>> {
    let scene = match document.pointer("/data/findScene") {
        Some(Value::Null) => return Ok(None),
        Some(scene) => scene,
        None => {
            let message = document
                .pointer("/errors/0/message")
                .and_then(Value::as_str)
                .unwrap_or("response has no data");
            return Err(Error::Internal(format!("Library query failed: {}", message)));
        }
    };

    let Some(file) = scene.pointer("/files/0") else {
        tracing::debug!("Library scene has no files");
        return Ok(Some(LocalFileFacts::default()));
    };

    Ok(Some(LocalFileFacts {
        duration_seconds: file
            .get("duration")
            .and_then(number)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d as u64),
        file_size_bytes: file
            .get("size")
            .and_then(number)
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| s as u64),
        quality_label: file
            .get("height")
            .and_then(number)
            .filter(|h| *h > 0.0)
            .map(|h| (h as u64).to_string()),
    }))
}

/// Numbers may arrive as JSON numbers or as strings (64-bit sizes)
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_file_supplies_facts() {
        let document = json!({
            "data": {
                "findScene": {
                    "files": [
                        {"size": "1000000000", "duration": 600.48, "height": 1080},
                        {"size": 5, "duration": 1.0, "height": 240}
                    ]
                }
            }
        });

        let facts = facts_from_response(&document).unwrap().unwrap();
        assert_eq!(facts.duration_seconds, Some(600));
        assert_eq!(facts.file_size_bytes, Some(1_000_000_000));
        assert_eq!(facts.quality_label.as_deref(), Some("1080"));
    }

    #[test]
    fn test_unknown_scene_is_absent() {
        let document = json!({"data": {"findScene": null}});
        assert_eq!(facts_from_response(&document).unwrap(), None);
    }

    #[test]
    fn test_scene_without_files_has_no_facts() {
        let document = json!({"data": {"findScene": {"files": []}}});
        assert_eq!(
            facts_from_response(&document).unwrap(),
            Some(LocalFileFacts::default())
        );
    }

    #[test]
    fn test_graphql_errors_are_failures() {
        let document = json!({"errors": [{"message": "not authorized"}], "data": null});
        let err = facts_from_response(&document).unwrap_err();
        assert!(err.to_string().contains("not authorized"));
    }

    #[test]
    fn test_endpoint_url_gets_graphql_path() {
        let library = GraphqlLibrary::new("http://localhost:9999/", None).unwrap();
        assert_eq!(library.graphql_url, "http://localhost:9999/graphql");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let library = GraphqlLibrary::new("http://127.0.0.1:9", Some("key")).unwrap();
        assert!(library.file_facts("12").await.is_err());
    }
}
