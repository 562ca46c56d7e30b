pub mod config;
pub mod error;
pub mod llm;
pub mod ports;
pub mod rerank;
pub mod retrieval;
pub mod traversal;

pub use config::Config;
pub use error::{GraphRagError, Result};
pub use ports::{CompletionPort, RankingPort, RetrievalPort, ScoredPassage};
pub use traversal::{EvidenceSet, TraversalEngine, TraversalParams, TraversalResult};
