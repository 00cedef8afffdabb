//! Pipeline error taxonomy

use thiserror::Error;

/// Errors raised inside pipeline components
///
/// Components catch these at their boundary and degrade to a valid result;
/// callers of the top-level pipeline never see them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// A tier found nothing (expected, not a fault)
    #[error("Evidence unavailable: {0}")]
    EvidenceUnavailable(String),

    /// A completion, vector, or web call failed or timed out
    #[error("External service failure: {0}")]
    ExternalServiceFailure(String),

    /// The completion service returned output that did not parse
    #[error("Malformed completion output: {0}")]
    MalformedCompletionOutput(String),

    /// The query failed the appropriateness filter
    #[error("Policy rejected: {0}")]
    PolicyRejected(String),

    /// Local storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
