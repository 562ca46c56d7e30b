//! DataStax Astra Data API client implementing [`RetrievalPort`].
//!
//! The collection is expected to be vectorize-enabled, so a `$vectorize` sort
//! embeds the query server-side; no embedding happens in this process.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{GraphRagError, Result};
use crate::ports::{RetrievalPort, ScoredPassage};

/// Request body for the Data API `find` command
#[derive(Serialize)]
struct FindRequest {
    find: FindCommand,
}

#[derive(Serialize)]
struct FindCommand {
    sort: SortClause,
    projection: ProjectionClause,
    options: FindOptions,
}

#[derive(Serialize)]
struct SortClause {
    #[serde(rename = "$vectorize")]
    vectorize: String,
}

#[derive(Serialize)]
struct ProjectionClause {
    #[serde(rename = "$vectorize")]
    vectorize: bool,
}

#[derive(Serialize)]
struct FindOptions {
    limit: usize,
    #[serde(rename = "includeSimilarity")]
    include_similarity: bool,
}

/// Response from the Data API `find` command
#[derive(Deserialize)]
struct FindResponse {
    #[serde(default)]
    data: Option<FindData>,
    #[serde(default)]
    errors: Option<Vec<ApiError>>,
}

#[derive(Deserialize)]
struct FindData {
    #[serde(default)]
    documents: Vec<AstraDocument>,
}

#[derive(Deserialize)]
struct AstraDocument {
    #[serde(rename = "_id")]
    id: Value,
    #[serde(rename = "$vectorize", default)]
    text: Option<String>,
    #[serde(rename = "$similarity", default)]
    similarity: Option<f32>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Vector search client over the Astra Data API
pub struct AstraDb {
    client: Client,
    api_endpoint: String,
    token: String,
    keyspace: String,
}

impl AstraDb {
    /// Create a new Astra client
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation)
    pub fn new(
        api_endpoint: impl Into<String>,
        token: impl Into<String>,
        keyspace: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_endpoint: api_endpoint.into(),
            token: token.into(),
            keyspace: keyspace.into(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/api/json/v1/{}/{}",
            self.api_endpoint.trim_end_matches('/'),
            self.keyspace,
            collection
        )
    }
}

#[async_trait]
impl RetrievalPort for AstraDb {
    async fn search(&self, corpus: &str, query: &str, count: usize) -> Result<Vec<ScoredPassage>> {
        let request = FindRequest {
            find: FindCommand {
                sort: SortClause {
                    vectorize: query.to_string(),
                },
                projection: ProjectionClause { vectorize: true },
                options: FindOptions {
                    limit: count,
                    include_similarity: true,
                },
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.collection_url(corpus))
            .header("Token", &self.token)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GraphRagError::RetrievalUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GraphRagError::RetrievalUnavailable(format!(
                "Data API error {}: {}",
                status, body
            )));
        }

        let result: FindResponse = response.json().await.map_err(|e| {
            GraphRagError::RetrievalUnavailable(format!("Failed to parse response: {}", e))
        })?;

        // The Data API reports command-level failures in-band with HTTP 200
        if let Some(errors) = result.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(GraphRagError::RetrievalUnavailable(format!(
                "Data API error: {}",
                messages.join("; ")
            )));
        }

        let documents = result.data.map(|d| d.documents).unwrap_or_default();
        log::debug!(
            "Astra search returned {} document(s) for {:?} in {:?}",
            documents.len(),
            query,
            start.elapsed()
        );

        Ok(documents
            .into_iter()
            .filter_map(|doc| {
                let id = match &doc.id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                doc.text.map(|text| ScoredPassage {
                    id,
                    text,
                    score: doc.similarity,
                })
            })
            .collect())
    }
}
