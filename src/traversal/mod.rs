//! Core recursive retrieve/decide/decompose/merge loop.
//!
//! Everything outside this module is a thin client over an external service;
//! the control flow, state and failure policy of graph-style retrieval live
//! here.

pub mod engine;
pub mod prompts;

pub use engine::{TraversalEngine, TraversalParams, TraversalResult};

use std::collections::HashSet;

/// Passages accumulated for one top-level question, unique by exact text.
///
/// Ordering is not semantically meaningful except immediately after a rerank,
/// which replaces the ordering wholesale (descending relevance).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceSet {
    passages: Vec<String>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Passage texts in current order
    pub fn texts(&self) -> &[String] {
        &self.passages
    }

    pub fn into_texts(self) -> Vec<String> {
        self.passages
    }

    pub fn contains(&self, text: &str) -> bool {
        self.passages.iter().any(|p| p == text)
    }

    /// Set union by exact text. Existing entries keep their position; new
    /// unique texts are appended in iteration order. Idempotent, and
    /// membership is independent of merge order.
    pub fn merge<I>(&mut self, incoming: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen: HashSet<String> = self.passages.iter().cloned().collect();
        for text in incoming {
            if seen.insert(text.clone()) {
                self.passages.push(text);
            }
        }
    }

    /// Replace the ordering after a rerank. The reranker returns the same
    /// texts reordered, so membership is unchanged.
    pub(crate) fn replace_ordered(&mut self, ordered: Vec<String>) {
        self.passages = ordered;
    }
}

impl FromIterator<String> for EvidenceSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

/// One loop iteration's input: the loop is an explicit state transition, not
/// self-recursion, so the depth bound is locally visible.
#[derive(Debug, Clone)]
pub(crate) struct TraversalState {
    pub query: String,
    pub evidence: EvidenceSet,
    pub remaining_depth: usize,
}

/// Result of asking the model to split a query into sub-queries.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DecompositionOutcome {
    /// Non-empty ordered sub-queries, at most `queries_per_step` of them
    Queries(Vec<String>),
    /// Unparsable model output or port failure; recovered locally, never raised
    Failed,
}
