//! Error taxonomy for the retrieval engine.
//!
//! Store and ranking failures are reported through [`Error`]; remote
//! provider failures are a [`ProviderError`] carrying a [`ProviderErrorKind`]
//! so callers can decide whether a retry makes sense.

use std::fmt;

use thiserror::Error;

use crate::models::PassageKey;

/// Errors raised by the store, the ranker, and the query orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// A vector's length differs from the store's established dimensionality.
    #[error("dimension mismatch for {key}: expected {expected} components, got {actual}")]
    DimensionMismatch {
        key: PassageKey,
        expected: usize,
        actual: usize,
    },

    /// The query vector cannot be compared with the stored vectors.
    #[error("query vector has {actual} components but the store holds {expected}-dimensional vectors")]
    QueryDimension { expected: usize, actual: usize },

    #[error("empty embedding vector for {key}")]
    EmptyVector { key: PassageKey },

    /// A vector component is NaN or infinite.
    #[error("non-finite component {index} in embedding for {key}")]
    NonFinite { key: PassageKey, index: usize },

    /// `put_all` was handed a different number of keys and vectors.
    #[error("{keys} passage keys but {vectors} vectors")]
    CountMismatch { keys: usize, vectors: usize },

    #[error("duplicate passage {key}")]
    DuplicatePassage { key: PassageKey },

    /// A persisted file is malformed. No partial result is returned.
    #[error("malformed file: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            return match err.into_kind() {
                csv::ErrorKind::Io(io) => Error::Io(io),
                other => Error::Format(format!("{:?}", other)),
            };
        }
        Error::Format(err.to_string())
    }
}

/// Failure category reported by an embedding or completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// The provider throttled the request (HTTP 429 or equivalent).
    RateLimited,
    /// The request was rejected as invalid; retrying will not help.
    InvalidInput,
    /// The provider could not be reached, timed out, or failed internally.
    Unavailable,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::RateLimited => "rate limited",
            ProviderErrorKind::InvalidInput => "invalid input",
            ProviderErrorKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// A failed call to a remote provider.
#[derive(Debug, Clone, Error)]
#[error("provider error ({kind}): {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidInput, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message)
    }

    /// Whether a later attempt of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, ProviderErrorKind::InvalidInput)
    }
}
