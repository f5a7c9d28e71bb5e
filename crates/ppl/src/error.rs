//! Errors raised while running or inferring over probabilistic programs.

use thiserror::Error;

use crate::address::Address;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PplError {
    /// A distribution was built with parameters outside its domain.
    #[error("invalid parameter for {dist}: {reason}")]
    InvalidParameter { dist: &'static str, reason: String },

    /// A single execution made two random choices at the same address.
    #[error("choice already present at address {0}")]
    DuplicateAddress(Address),

    #[error("no choice at address {0}")]
    MissingAddress(Address),

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: &'static str, got: String },

    /// Exhaustive enumeration met a choice without a finite support.
    #[error("cannot enumerate choice at {0}: distribution has no finite support")]
    NotEnumerable(Address),

    #[error("enumeration exceeded {0} executions")]
    TooManyExecutions(usize),

    #[error("rejection sampling accepted {accepted} of {wanted} samples in {attempts} attempts")]
    RejectionExhausted {
        accepted: usize,
        wanted: usize,
        attempts: usize,
    },

    /// Rejection without a score bound only handles hard conditions.
    #[error("rejection sampling needs `max_score` for soft observations (log-likelihood {0})")]
    SoftConditioning(f64),

    #[error("could not find a trace with finite score after {0} attempts")]
    InitializationFailed(usize),

    #[error("every execution has zero probability")]
    ZeroProbability,

    #[error("posterior has no samples")]
    EmptyPosterior,

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("unknown inference method: {0}")]
    UnknownMethod(String),

    #[error("model error: {0}")]
    Model(String),
}

impl PplError {
    pub fn invalid(dist: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            dist,
            reason: reason.into(),
        }
    }

    pub fn mismatch(expected: &'static str, got: impl std::fmt::Debug) -> Self {
        Self::TypeMismatch {
            expected,
            got: format!("{:?}", got),
        }
    }
}

pub type Result<T> = std::result::Result<T, PplError>;
