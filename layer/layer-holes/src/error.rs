//! Error types for closure resolution and shape classification.

use thiserror::Error;

/// Result type for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Errors that can occur while resolving or classifying paths.
///
/// Geometric ambiguity is not an error: it is reported on the
/// classification itself (see [`Ambiguity`](crate::Ambiguity)).
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A path coordinate was NaN or infinite.
    #[error("non-finite coordinate in path {path_index}")]
    NonFiniteCoordinate {
        /// Index of the offending path within its shape.
        path_index: usize,
    },

    /// An arc with a non-positive or non-finite radius or sweep.
    #[error("invalid arc in path {path_index}: radius {radius}, sweep {sweep_deg}")]
    InvalidArc {
        /// Index of the offending path within its shape.
        path_index: usize,
        /// The arc radius.
        radius: f64,
        /// The arc sweep in degrees.
        sweep_deg: f64,
    },

    /// Invalid parameter value.
    #[error("invalid classification parameter: {message}")]
    InvalidParams {
        /// Description of the parameter error.
        message: String,
    },
}

impl ClassifyError {
    /// Create an `InvalidParams` error with the given message.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}
