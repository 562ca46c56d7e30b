//! The traversal engine: bounded retrieve/decide/decompose/merge iteration.

use std::sync::Arc;

use crate::error::{GraphRagError, Result};
use crate::ports::{CompletionPort, RankingPort, RetrievalPort};

use super::{prompts, DecompositionOutcome, EvidenceSet, TraversalState};

/// Default retrieval candidate count before reranking. Wide on purpose:
/// the pool gives the reranker meaningful choice and is independent of
/// `top_k_per_query`.
pub const DEFAULT_CANDIDATE_POOL: usize = 200;

/// Per-invocation loop parameters
#[derive(Debug, Clone)]
pub struct TraversalParams {
    /// Decomposition rounds before sufficiency is forced
    pub max_recursion_depth: usize,
    /// Passages kept per sub-query after reranking
    pub top_k_per_query: usize,
    /// Sub-queries requested per decomposition round
    pub queries_per_step: usize,
    /// Synthesize a final answer from the evidence once the loop terminates
    pub generate_answer: bool,
}

impl Default for TraversalParams {
    fn default() -> Self {
        Self {
            max_recursion_depth: 3,
            top_k_per_query: 2,
            queries_per_step: 2,
            generate_answer: false,
        }
    }
}

/// Outcome of one traversal: the evidence used to answer, plus the generated
/// answer when one was requested. A requested answer is `Some` even when
/// generation failed (empty string); an unrequested one is always `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalResult {
    pub evidence: EvidenceSet,
    pub answer: Option<String>,
}

enum StepOutcome {
    Finished(EvidenceSet),
    Continue(TraversalState),
}

/// Drives the recursive retrieval loop against three injected ports.
///
/// One `traverse` call owns its state for the duration; nothing is shared
/// across calls, so a single engine can serve sequential questions.
pub struct TraversalEngine {
    retrieval: Arc<dyn RetrievalPort>,
    ranking: Arc<dyn RankingPort>,
    completion: Arc<dyn CompletionPort>,
    corpus: String,
    candidate_pool: usize,
}

impl TraversalEngine {
    pub fn new(
        retrieval: Arc<dyn RetrievalPort>,
        ranking: Arc<dyn RankingPort>,
        completion: Arc<dyn CompletionPort>,
        corpus: impl Into<String>,
    ) -> Self {
        Self {
            retrieval,
            ranking,
            completion,
            corpus: corpus.into(),
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }

    /// Override the retrieval candidate pool size
    pub fn with_candidate_pool(mut self, candidate_pool: usize) -> Self {
        self.candidate_pool = candidate_pool;
        self
    }

    /// Run the full traversal for one question.
    ///
    /// Terminates within `max_recursion_depth + 1` steps: the depth budget
    /// strictly decreases each round and sufficiency is forced once it hits
    /// zero. Completion-side failures degrade locally; retrieval or ranking
    /// failures abort the traversal.
    pub async fn traverse(
        &self,
        question: &str,
        params: &TraversalParams,
    ) -> Result<TraversalResult> {
        if question.trim().is_empty() {
            return Err(GraphRagError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }
        if params.top_k_per_query == 0 {
            return Err(GraphRagError::InvalidInput(
                "top_k_per_query must be at least 1".to_string(),
            ));
        }
        if params.queries_per_step == 0 {
            return Err(GraphRagError::InvalidInput(
                "queries_per_step must be at least 1".to_string(),
            ));
        }

        log::info!(
            "Starting traversal (depth={}, top_k={}, queries_per_step={}): {}",
            params.max_recursion_depth,
            params.top_k_per_query,
            params.queries_per_step,
            question
        );

        let mut state = TraversalState {
            query: question.to_string(),
            evidence: EvidenceSet::new(),
            remaining_depth: params.max_recursion_depth,
        };

        let evidence = loop {
            match self.step(state, params).await? {
                StepOutcome::Finished(evidence) => break evidence,
                StepOutcome::Continue(next) => state = next,
            }
        };

        log::info!("Traversal finished with {} passage(s)", evidence.len());

        let answer = if params.generate_answer {
            Some(self.generate_answer(question, evidence.texts()).await)
        } else {
            None
        };

        Ok(TraversalResult { evidence, answer })
    }

    /// One depth level: rerank accumulated evidence, decide sufficiency, and
    /// either finish or decompose-and-fetch into the next state.
    async fn step(&self, state: TraversalState, params: &TraversalParams) -> Result<StepOutcome> {
        let TraversalState {
            query,
            mut evidence,
            remaining_depth,
        } = state;

        // Reorder (not discard) what we already have: top_k = full set size.
        if !evidence.is_empty() {
            let ordered = self
                .ranking
                .rerank(&query, evidence.texts().to_vec(), evidence.len())
                .await?;
            evidence.replace_ordered(ordered);
        }

        // The depth bound overrides the sufficiency oracle: once the budget
        // is exhausted we return whatever evidence we have, even none.
        let sufficient = if remaining_depth == 0 {
            true
        } else {
            self.can_answer(&query, evidence.texts()).await
        };

        if sufficient {
            log::debug!(
                "Terminal step (remaining_depth={}, evidence={})",
                remaining_depth,
                evidence.len()
            );
            return Ok(StepOutcome::Finished(evidence));
        }

        let mut sub_queries = match self
            .decompose(&query, evidence.texts(), params.queries_per_step)
            .await
        {
            DecompositionOutcome::Queries(queries) => queries,
            DecompositionOutcome::Failed => Vec::new(),
        };

        // Progress guarantee on the evidence-free first step: with nothing
        // retrieved yet and no sub-queries, search the question itself.
        if sub_queries.is_empty() && evidence.is_empty() {
            sub_queries.push(query.clone());
        }

        log::debug!(
            "Expanding with {} sub-quer(ies) at remaining_depth={}",
            sub_queries.len(),
            remaining_depth
        );

        let mut fetched = Vec::new();
        for sub_query in &sub_queries {
            fetched.extend(
                self.fetch_relevant(sub_query, params.top_k_per_query)
                    .await?,
            );
        }
        evidence.merge(fetched);

        Ok(StepOutcome::Continue(TraversalState {
            query,
            evidence,
            remaining_depth: remaining_depth - 1,
        }))
    }

    /// Sufficiency oracle: can `query` be fully answered from `docs` alone?
    ///
    /// Fail-closed: empty evidence, a port failure, or an off-contract token
    /// all read as "cannot answer", favoring more retrieval over a possibly
    /// wrong early answer.
    async fn can_answer(&self, query: &str, docs: &[String]) -> bool {
        if docs.is_empty() {
            return false;
        }

        let prompt = prompts::sufficiency_prompt(query, docs);
        match self.completion.complete(&prompt).await {
            Ok(response) => match prompts::parse_sufficiency(&response) {
                Some(sufficient) => sufficient,
                None => {
                    log::warn!(
                        "Sufficiency check returned an off-contract token for {:?}: {:?}",
                        query,
                        response
                    );
                    false
                }
            },
            Err(e) => {
                log::warn!("Sufficiency check unavailable for {:?}: {}", query, e);
                false
            }
        }
    }

    /// Ask the model to split the query into independently searchable
    /// sub-queries. Misses (port failure, unparsable output, empty list) are
    /// diagnostics, not errors.
    async fn decompose(
        &self,
        query: &str,
        docs: &[String],
        queries_per_step: usize,
    ) -> DecompositionOutcome {
        let prompt = prompts::decomposition_prompt(query, docs, queries_per_step);
        let response = match self.completion.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Decomposition unavailable for {:?}: {}", query, e);
                return DecompositionOutcome::Failed;
            }
        };

        match prompts::parse_sub_queries(&response, queries_per_step) {
            Some(queries) if !queries.is_empty() => DecompositionOutcome::Queries(queries),
            _ => {
                log::warn!(
                    "Decomposition produced no usable sub-queries for {:?}: {:?}",
                    query,
                    response
                );
                DecompositionOutcome::Failed
            }
        }
    }

    /// Two-stage fetch for one sub-query: broad retrieval for recall, then
    /// rerank down to exactly `top_k` for precision. Port failures here are
    /// fatal; there is no safe default evidence to substitute.
    async fn fetch_relevant(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let hits = self
            .retrieval
            .search(&self.corpus, query, self.candidate_pool)
            .await?;
        let texts: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.ranking.rerank(query, texts, top_k).await
    }

    /// Best-effort answer synthesis; a failure yields an empty string and
    /// never aborts the traversal.
    async fn generate_answer(&self, query: &str, docs: &[String]) -> String {
        let prompt = prompts::answer_prompt(query, docs);
        match self.completion.complete(&prompt).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                log::warn!("Answer generation unavailable for {:?}: {}", query, e);
                String::new()
            }
        }
    }
}
