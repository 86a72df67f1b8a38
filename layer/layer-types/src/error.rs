//! Error types for reading layer files.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for layer-file parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while opening or decoding a layer file.
///
/// These are scoped to a single file: the aggregation engine records them
/// against that file and keeps going.
#[derive(Debug, Error)]
pub enum ParseError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// The file is not in a format the reader understands.
    #[error("unsupported layer format: {message}")]
    UnsupportedFormat {
        /// Description of what was unsupported.
        message: String,
    },

    /// The file content is malformed.
    #[error("invalid layer content: {message}")]
    InvalidContent {
        /// Description of what was invalid.
        message: String,
    },

    /// A shape was declared with no paths.
    #[error("shape has no paths")]
    EmptyShape,

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Create an `InvalidContent` error with the given message.
    #[must_use]
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Create an `UnsupportedFormat` error with the given message.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }
}
