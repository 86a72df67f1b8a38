//! Error types for configuration, aggregation and serialization.
//!
//! Per-file failures ([`UnitError`]) are recorded in the run output and
//! never abort a run. Everything else here is run-level and does.

use std::path::PathBuf;
use std::time::Duration;

use layer_holes::ClassifyError;
use layer_types::{Height, ParseError};
use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for serialization operations.
pub type SerializationResult<T> = Result<T, SerializationError>;

/// Result type for a whole analysis run.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Invalid analysis configuration, reported before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A requested height was negative or not finite.
    #[error("invalid height {value}: heights must be finite and non-negative")]
    InvalidHeight {
        /// The offending value.
        value: f64,
    },

    /// The scan interval was not finite or finer than the minimum.
    #[error(
        "invalid scan interval {value}: must be finite and at least {min} mm",
        min = crate::config::MIN_SCAN_INTERVAL
    )]
    InvalidInterval {
        /// The offending value.
        value: f64,
    },

    /// Neither heights nor a scan interval were given.
    #[error("no heights requested: give explicit heights or a scan interval")]
    NoHeights,

    /// The per-unit timeout was zero, negative or not finite.
    #[error("invalid unit timeout {seconds}s: must be finite and positive")]
    InvalidTimeout {
        /// The offending value in seconds.
        seconds: f64,
    },

    /// A worker cap of zero.
    #[error("max_workers must be at least 1")]
    InvalidWorkers,

    /// A negative identifier in the inclusion filter.
    #[error("invalid identifier {value}: identifiers are non-negative")]
    InvalidIdentifier {
        /// The offending value.
        value: i64,
    },

    /// An empty entry in the file inclusion filter.
    #[error("file filter contains an empty entry")]
    EmptyFileFilter,

    /// Closure or classification parameters out of range.
    #[error("invalid classification settings: {0}")]
    Classify(#[from] ClassifyError),

    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Output tree could not be turned into an interchange artifact.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// A value with no native representation.
    #[error("unsupported value of type `{type_name}` at {location}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: &'static str,
        /// Location in the output tree, e.g. `per_file[2].shape_count`.
        location: String,
    },

    /// NaN or infinity cannot be encoded.
    #[error("non-finite number {value} at {location}")]
    NonFinite {
        /// The value.
        value: f64,
        /// Location in the output tree.
        location: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing or reading the artifact failed.
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single work unit. Recorded per file; the run continues.
#[derive(Debug, Error)]
pub enum UnitError {
    /// The layer file could not be opened or parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A shape could not be classified.
    #[error("classification failed at z={z}: {source}")]
    Classify {
        /// Layer height.
        z: Height,
        /// Underlying error.
        #[source]
        source: ClassifyError,
    },

    /// The unit ran past the per-unit timeout.
    #[error("timed out after {:.1}s", limit.as_secs_f64())]
    Timeout {
        /// The timeout that was exceeded.
        limit: Duration,
    },

    /// The worker panicked.
    #[error("worker panicked: {message}")]
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },

    /// No worker was left to run the unit.
    #[error("no worker available: all workers are stalled")]
    NoWorker,
}

impl UnitError {
    /// Short machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Classify { .. } => "classify",
            Self::Timeout { .. } => "timeout",
            Self::Panicked { .. } => "panic",
            Self::NoWorker => "no_worker",
        }
    }
}

/// Run-level failure. No artifact is produced.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The output could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The run was cancelled between unit dispatches.
    #[error("analysis cancelled")]
    Cancelled,

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {message}")]
    Pool {
        /// Description from the pool builder.
        message: String,
    },

    /// Build discovery failed.
    #[error("failed to scan build directory {}: {message}", path.display())]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}
