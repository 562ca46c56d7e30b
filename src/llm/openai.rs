//! OpenAI chat-completions client implementing [`CompletionPort`].
//!
//! Retry on transient failures lives here, never in the traversal engine:
//! the engine's policy is to degrade on completion failures, so by the time
//! an error reaches it, retries are already spent.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GraphRagError, Result};
use crate::ports::CompletionPort;

/// Request structure for the OpenAI chat completions API
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response structure from the OpenAI chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI chat client
///
/// Issues single-turn, non-streaming completions at a low temperature; the
/// traversal prompts expect near-deterministic, contract-shaped output.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: usize,
}

impl OpenAiChat {
    /// Create a new chat client
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o")
    /// * `temperature` - Sampling temperature (traversal prompts use 0.2)
    /// * `max_retries` - Retry attempts on 429/5xx responses
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation)
    pub fn new(api_key: String, model: String, temperature: f32, max_retries: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
            temperature,
            max_retries,
        }
    }

    async fn complete_internal(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GraphRagError::CompletionUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GraphRagError::CompletionUnavailable(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            GraphRagError::CompletionUnavailable(format!("Failed to parse response: {}", e))
        })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                GraphRagError::CompletionUnavailable(
                    "Empty choices in OpenAI response".to_string(),
                )
            })
    }
}

#[async_trait]
impl CompletionPort for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let start = std::time::Instant::now();
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            match self.complete_internal(prompt).await {
                Ok(content) => {
                    log::debug!(
                        "Completion call took {:?} (attempt {})",
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(content);
                }
                Err(e) if attempt < self.max_retries => {
                    // Retry only rate limits and server errors
                    let message = e.to_string();
                    let should_retry = message.contains("429")
                        || message.contains("500")
                        || message.contains("502")
                        || message.contains("503")
                        || message.contains("504");

                    if should_retry {
                        log::warn!("Retry {}/{} after error: {}", attempt + 1, self.max_retries, e);
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
