//! Pongo semantic filter client implementing [`RankingPort`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GraphRagError, Result};
use crate::ports::RankingPort;

const DEFAULT_BASE_URL: &str = "https://api.joinpongo.com/api/v1";

/// Request body for the Pongo filter endpoint
#[derive(Serialize)]
struct FilterRequest {
    query: String,
    docs: Vec<FilterDoc>,
    num_results: usize,
}

#[derive(Serialize)]
struct FilterDoc {
    id: String,
    text: String,
}

/// One reranked document in the filter response
#[derive(Deserialize)]
struct FilterResult {
    text: String,
}

/// Reranking client over the Pongo filter API
pub struct PongoReranker {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl PongoReranker {
    /// Create a new Pongo reranker
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation)
    pub fn new(secret_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (self-hosted deployments)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl RankingPort for PongoReranker {
    async fn rerank(
        &self,
        query: &str,
        passages: Vec<String>,
        top_k: usize,
    ) -> Result<Vec<String>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        // Pongo wants stable per-document ids; positional ids are enough
        // since the engine only consumes texts.
        let docs = passages
            .into_iter()
            .enumerate()
            .map(|(i, text)| FilterDoc {
                id: i.to_string(),
                text,
            })
            .collect();

        let request = FilterRequest {
            query: query.to_string(),
            docs,
            num_results: top_k,
        };

        let response = self
            .client
            .post(format!("{}/filter", self.base_url.trim_end_matches('/')))
            .header("secret", &self.secret_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GraphRagError::RankingUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GraphRagError::RankingUnavailable(format!(
                "Pongo API error {}: {}",
                status, body
            )));
        }

        let results: Vec<FilterResult> = response.json().await.map_err(|e| {
            GraphRagError::RankingUnavailable(format!("Failed to parse response: {}", e))
        })?;

        log::debug!(
            "Pongo kept {} of requested top_k={} for {:?}",
            results.len(),
            top_k,
            query
        );

        Ok(results.into_iter().map(|r| r.text).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_request_shape() {
        let request = FilterRequest {
            query: "What nationality is Ed Wood".to_string(),
            docs: vec![
                FilterDoc {
                    id: "0".to_string(),
                    text: "Ed Wood was an American filmmaker.".to_string(),
                },
                FilterDoc {
                    id: "1".to_string(),
                    text: "Plan 9 from Outer Space premiered in 1957.".to_string(),
                },
            ],
            num_results: 2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["query"], "What nationality is Ed Wood");
        assert_eq!(value["docs"][0]["id"], "0");
        assert_eq!(value["docs"][1]["text"], "Plan 9 from Outer Space premiered in 1957.");
        assert_eq!(value["num_results"], 2);
    }

    #[test]
    fn test_filter_response_parses_texts_in_order() {
        let body = r#"[
            {"id": "1", "text": "most relevant", "similarity_score": 0.97},
            {"id": "0", "text": "less relevant", "similarity_score": 0.41}
        ]"#;
        let results: Vec<FilterResult> = serde_json::from_str(body).unwrap();
        let texts: Vec<String> = results.into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["most relevant", "less relevant"]);
    }

    #[test]
    fn test_base_url_override() {
        let reranker = PongoReranker::new("secret").with_base_url("http://localhost:8000/");
        assert_eq!(reranker.base_url, "http://localhost:8000/");
    }
}
