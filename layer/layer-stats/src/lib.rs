//! Cross-file aggregation for layer builds.
//!
//! Given a set of layer files, requested heights and optional filters,
//! this crate classifies every shape in parallel and merges the results
//! into build-wide statistics, per-identifier listings and a per-file
//! outcome record, then serializes them into the run artifact.
//!
//! # Pipeline
//!
//! 1. [`discover_build`] lists the layer files under `<build>/Models`.
//! 2. [`Engine::run`] validates the [`AnalysisConfig`], records excluded
//!    files, and runs one [`WorkUnit`] per remaining file on a bounded
//!    worker pool.
//! 3. [`AggregateStatistics::from_outcomes`] merges completed units in
//!    path order, so results never depend on completion order.
//! 4. [`write_artifact`] normalizes the report and writes it once.
//!
//! A file that fails to parse, times out or panics is recorded with
//! status `error` and contributes nothing to the totals. Configuration
//! and serialization failures abort the run and produce no artifact.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use layer_stats::{AnalysisConfig, DiscoveredFile, Engine};
//! use layer_types::{Height, Layer, MemoryLayerFile, MemoryReader, Point2, RawPath, Shape};
//!
//! let square = RawPath::points(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(4.0, 0.0),
//!     Point2::new(4.0, 4.0),
//!     Point2::new(0.0, 4.0),
//!     Point2::new(0.0, 0.0),
//! ]);
//! let layer = Layer::new(Height::from_mm(1.0), vec![Shape::new(None, vec![square]).unwrap()]);
//! let reader = MemoryReader::new()
//!     .with_file("/build/Models/gear.clf", MemoryLayerFile::new("gear.clf", 0.05, vec![layer]));
//!
//! let config = AnalysisConfig::new(7).with_heights([1.0]);
//! let engine = Engine::new(config, Arc::new(reader));
//! let report = engine.run(&[DiscoveredFile::from_path("/build/Models/gear.clf")]).unwrap();
//!
//! assert_eq!(report.statistics.total_shapes, 1);
//! assert_eq!(report.statistics.total_holes, 0);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod artifact;
mod config;
mod discover;
mod engine;
mod error;
mod export;
mod normalize;
mod reader;
mod render;
mod stats;
mod unit;

pub use artifact::{
    Artifact, Counts, DiagnosticsEntry, FileEntry, HeightEntry, ShapeEntry, decode, encode,
    read_artifact, to_node, write_artifact,
};
pub use config::{
    AnalysisConfig, ClassifySettings, DEFAULT_EXCLUDE_FOLDERS, DEFAULT_EXCLUDE_NAMES,
    DEFAULT_UNIT_TIMEOUT_SECS, MIN_SCAN_INTERVAL,
};
pub use discover::{DiscoveredFile, MODELS_DIR, discover_build, exclusion_reason};
pub use engine::{AnalysisReport, CancelToken, Engine, worker_count};
pub use error::{
    AggregateError, AggregateResult, ConfigError, ConfigResult, SerializationError,
    SerializationResult, UnitError,
};
pub use export::{SvgExportParams, export_view_svg, save_views_svg, svg_file_name};
pub use normalize::{Native, NativeValue, Node, normalize};
pub use reader::{DUMP_EXTENSION, JsonDumpReader, parse_dump};
pub use render::{COMPOSITE_TITLE, RenderPath, RenderView, build_views, render_views};
pub use stats::{AggregateStatistics, Diagnostics, FileCounts, HeightSummary, ShapeSummary};
pub use unit::{
    FileOutcome, FileResult, FileStatus, HeightPlan, HeightResult, UnitOutcome, WorkUnit,
    scan_heights,
};
