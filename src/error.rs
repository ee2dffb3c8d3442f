//! Error types for recomendar operations.
//!
//! Every fallible operation in the crate returns [`Result`], so configuration
//! problems, shape mismatches and training failures surface to the caller
//! instead of panicking mid-computation.

use thiserror::Error;

/// Main error type for recomendar operations.
///
/// # Examples
///
/// ```
/// use recomendar::error::RecomendarError;
///
/// let err = RecomendarError::DimensionMismatch {
///     expected: "100 items".to_string(),
///     actual: "90 items".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Error)]
pub enum RecomendarError {
    /// Matrix/vector dimensions don't match for the operation.
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Playlist id outside the interaction matrix.
    #[error("Unknown playlist {playlist}: interaction matrix has {n_playlists} playlists")]
    UnknownPlaylist {
        /// Requested playlist id
        playlist: usize,
        /// Number of playlists (rows) available
        n_playlists: usize,
    },

    /// The BPR sampler could not draw a valid (playlist, positive, negative)
    /// triple within the resample budget.
    #[error("Sampling exhausted in epoch {epoch}: no valid triple after {attempts} attempts")]
    SamplingExhausted {
        /// Epoch in which sampling failed
        epoch: usize,
        /// Number of consecutive failed attempts
        attempts: usize,
    },

    /// A content-based model was requested without track features.
    #[error("Missing features: {0}")]
    MissingFeatures(String),

    /// Malformed input record.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Error description
        message: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

impl RecomendarError {
    /// Shorthand for [`RecomendarError::InvalidHyperparameter`].
    pub(crate) fn invalid(
        param: &str,
        value: impl std::fmt::Display,
        constraint: &str,
    ) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Shorthand for [`RecomendarError::DimensionMismatch`].
    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<&str> for RecomendarError {
    fn from(msg: &str) -> Self {
        RecomendarError::Other(msg.to_string())
    }
}

impl From<bincode::Error> for RecomendarError {
    fn from(err: bincode::Error) -> Self {
        RecomendarError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for RecomendarError {
    fn from(err: serde_json::Error) -> Self {
        RecomendarError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with [`RecomendarError`].
pub type Result<T> = std::result::Result<T, RecomendarError>;
