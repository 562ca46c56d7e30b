use thiserror::Error;

/// Main error type for GraphRAG
#[derive(Error, Debug)]
pub enum GraphRagError {
    /// Vector search service unreachable or returned an error
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Reranking service unreachable or returned an error
    #[error("Ranking unavailable: {0}")]
    RankingUnavailable(String),

    /// Completion model service unreachable or returned an error
    #[error("Completion unavailable: {0}")]
    CompletionUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (empty question, zero top_k, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type using GraphRagError
pub type Result<T> = std::result::Result<T, GraphRagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphRagError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GraphRagError = io_err.into();
        assert!(matches!(err, GraphRagError::Io(_)));
    }

    #[test]
    fn test_port_error_display() {
        let err = GraphRagError::RetrievalUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("Retrieval unavailable"));
        assert!(err.to_string().contains("connection refused"));
    }
}
