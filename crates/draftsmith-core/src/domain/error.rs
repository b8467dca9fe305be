//! Domain-level error taxonomy for draftsmith.

/// Errors produced while loading issues and stored proposals.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("invalid issue payload: {0}")]
    InvalidIssue(String),

    #[error("invalid proposal document: {0}")]
    InvalidProposal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for draftsmith domain operations.
pub type Result<T> = std::result::Result<T, DraftError>;
