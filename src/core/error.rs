

use thiserror::Error;

use crate::db::CandidateSourceError;
use crate::llm::embeddings::EmbeddingError;


#[derive(Error, Debug)]
pub enum SkillBridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbeddingError),

    #[error("Candidate source unavailable: {0}")]
    CandidateSourceUnavailable(#[from] CandidateSourceError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SkillBridgeError {
    /// Whether retrying the same search can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUnavailable(_) | Self::CandidateSourceUnavailable(_)
        )
    }
}

impl From<config::ConfigError> for SkillBridgeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, SkillBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_is_retryable() {
        let err: SkillBridgeError = EmbeddingError::InvalidResponse("no vector".into()).into();
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("Embedding unavailable"));
    }

    #[test]
    fn test_validation_error_is_not_retryable() {
        let err = SkillBridgeError::Validation("top_k must be positive".into());
        assert!(!err.is_retryable());
    }
}
