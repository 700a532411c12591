//! Error types for goal construction and unifier search

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnifyError {
    /// The term source handed over something that is neither a concept name,
    /// a conjunction, nor an existential restriction.
    #[error("Malformed term: {0}")]
    MalformedTerm(String),

    #[error("Computation interrupted")]
    Interrupted,

    #[error("SAT oracle failure: {0}")]
    OracleFailure(String),

    #[error("Step limit of {limit} exceeded")]
    LimitExceeded { limit: usize },

    #[error("Cannot reclassify {atom}: {reason}")]
    Reclassification { atom: String, reason: String },

    #[error("Unknown concept name: {0}")]
    UnknownConcept(String),

    #[error("Unifier index {index} out of range, {len} computed")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, UnifyError>;
