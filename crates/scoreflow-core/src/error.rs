//! Error types for scoreflow
//!
//! The taxonomy distinguishes build-time configuration errors (reported
//! before any event is processed), consistency violations (always fatal,
//! they indicate an engine or constraint-authoring bug) and unsupported
//! operations (reported to the caller, not fatal to the overall run).
//! A consistency violation is never downgraded to a warning: doing so
//! would let an incorrect score reach the search loop unnoticed.

use thiserror::Error;

/// Main error type for scoreflow operations
#[derive(Debug, Error)]
pub enum ScoreFlowError {
    /// Error in the constraint network definition, detected at build time.
    ///
    /// Examples: an indexing joiner declared after a filtering joiner,
    /// two constraints sharing one id, a stream with no source.
    #[error("Build error: {0}")]
    Build(String),

    /// Two scores of different level counts met in one operation.
    #[error("Score dimension mismatch: expected {expected} level(s), got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Internal bookkeeping disagrees with itself.
    ///
    /// Examples: retracting a constraint match that is not registered,
    /// a tuple observed in an impossible lifecycle state.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// The incremental score diverged from a from-scratch recomputation.
    #[error("Score corruption: {0}")]
    ScoreCorruption(String),

    /// The operation is not supported by this calculator.
    ///
    /// Example: requesting constraint match detail from a calculator
    /// that does not track matches.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for scoreflow operations
pub type Result<T> = std::result::Result<T, ScoreFlowError>;
