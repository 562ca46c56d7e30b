//! Capability interfaces over the three external services.
//!
//! The traversal engine only ever sees these traits; the concrete reqwest
//! clients live in `retrieval`, `rerank` and `llm`. Tests substitute
//! deterministic fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single retrieval hit: a text span with provenance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub text: String,
    /// Similarity score from the backing store, when it reports one
    pub score: Option<f32>,
}

/// Top-N passage lookup against an external vector search service.
#[async_trait]
pub trait RetrievalPort: Send + Sync {
    /// Fetch the `count` most relevant passages for `query` from `corpus`.
    ///
    /// Transport or service errors surface as
    /// [`GraphRagError::RetrievalUnavailable`](crate::GraphRagError); the
    /// engine does not retry and treats this as fatal to the traversal.
    async fn search(&self, corpus: &str, query: &str, count: usize) -> Result<Vec<ScoredPassage>>;
}

/// Relevance reordering of candidate passages via an external reranker.
#[async_trait]
pub trait RankingPort: Send + Sync {
    /// Reorder `passages` by relevance to `query` and truncate to `top_k`.
    /// Returned texts are in descending relevance order, length <= `top_k`.
    async fn rerank(&self, query: &str, passages: Vec<String>, top_k: usize)
        -> Result<Vec<String>>;
}

/// Single-prompt text completion from a language model.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
