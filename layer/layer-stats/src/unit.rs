//! Work units: one layer file with everything needed to analyze it.
//!
//! A unit owns its inputs and returns its result by value, so units can
//! run on any worker without shared mutable state.

// Scan step counts are small.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

use std::collections::BTreeSet;
use std::sync::Arc;

use layer_holes::{ClassifyParams, ShapeClassification, classify_shape};
use layer_types::{Height, Identifier, LayerFile, LayerReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::discover::DiscoveredFile;
use crate::error::UnitError;

/// Scan heights are rounded to this many steps per mm.
const HEIGHT_QUANTUM: f64 = 1e6;

/// Most scan steps taken over one file.
const MAX_SCAN_STEPS: usize = 1_000_000;

/// Which heights a unit analyzes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeightPlan {
    /// Explicit heights.
    pub heights: Vec<Height>,
    /// Optional scan step over each file's z-range.
    pub interval: Option<f64>,
}

impl HeightPlan {
    /// Plan from a (validated) configuration.
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            heights: config.requested_heights(),
            interval: config.scan_interval,
        }
    }

    /// Heights to query in `file`, ascending and deduplicated.
    #[must_use]
    pub fn resolve(&self, file: &dyn LayerFile) -> Vec<Height> {
        let mut heights = self.heights.clone();
        if let (Some(interval), Some((min, max))) = (self.interval, file.z_range()) {
            heights.extend(scan_heights(min, max, interval));
        }
        heights.sort();
        heights.dedup();
        heights
    }
}

/// Heights from `min` to `max` inclusive at `interval`.
///
/// At most `MAX_SCAN_STEPS + 1` heights are produced; a longer scan is
/// cut short at the top of the range.
#[must_use]
pub fn scan_heights(min: f64, max: f64, interval: f64) -> Vec<Height> {
    if interval.is_nan() || interval <= 0.0 || !min.is_finite() || !max.is_finite() || max < min {
        return Vec::new();
    }
    let span = ((max - min) / interval + 1e-9).floor();
    if span > MAX_SCAN_STEPS as f64 {
        warn!(min, max, interval, limit = MAX_SCAN_STEPS, "scan truncated");
    }
    let steps = span.min(MAX_SCAN_STEPS as f64) as usize;
    (0..=steps)
        .map(|k| {
            let z = interval.mul_add(k as f64, min);
            Height::from_mm((z * HEIGHT_QUANTUM).round() / HEIGHT_QUANTUM)
        })
        .collect()
}

/// Classification results at one requested height.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightResult {
    /// The requested height.
    pub requested: Height,
    /// Height of the layer found, if any lay within the file's thickness.
    pub layer_z: Option<Height>,
    /// Classified shapes, in layer order.
    pub shapes: Vec<ShapeClassification>,
    /// Shapes skipped by the identifier filter.
    pub filtered_shapes: usize,
}

/// Result of a completed unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FileResult {
    /// File name reported by the parser.
    pub name: String,
    /// Layer thickness in mm.
    pub thickness: f64,
    /// One entry per queried height, ascending.
    pub heights: Vec<HeightResult>,
}

impl FileResult {
    /// Solid shapes (exteriors, including promoted ones) across all heights.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.heights
            .iter()
            .flat_map(|h| &h.shapes)
            .map(|s| s.solids.len())
            .sum()
    }
}

/// One file to analyze.
#[derive(Clone)]
pub struct WorkUnit {
    /// The file.
    pub file: DiscoveredFile,
    /// Heights to query.
    pub plan: HeightPlan,
    /// Identifier inclusion filter.
    pub identifiers: Option<BTreeSet<Identifier>>,
    /// Classification parameters.
    pub params: ClassifyParams,
    reader: Arc<dyn LayerReader>,
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit")
            .field("file", &self.file)
            .field("plan", &self.plan)
            .field("identifiers", &self.identifiers)
            .finish_non_exhaustive()
    }
}

impl WorkUnit {
    /// Build a unit for `file` from the run configuration.
    #[must_use]
    pub fn new(
        file: DiscoveredFile,
        config: &AnalysisConfig,
        reader: Arc<dyn LayerReader>,
    ) -> Self {
        Self {
            file,
            plan: HeightPlan::from_config(config),
            identifiers: config.identifier_filter(),
            params: config.classify_params(),
            reader,
        }
    }

    fn includes(&self, identifier: Option<Identifier>) -> bool {
        self.identifiers
            .as_ref()
            .is_none_or(|ids| identifier.is_some_and(|id| ids.contains(&id)))
    }

    /// Open the file and classify every shape at every planned height.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::Parse`] if the file cannot be opened and
    /// [`UnitError::Classify`] for the first shape that fails.
    pub fn run(&self) -> Result<FileResult, UnitError> {
        let file = self.reader.open(&self.file.path)?;
        let heights = self.plan.resolve(file.as_ref());
        debug!(file = %self.file.name, heights = heights.len(), "running unit");

        let mut results = Vec::with_capacity(heights.len());
        for requested in heights {
            let Some(layer) = file.layer_at(requested.mm()) else {
                results.push(HeightResult {
                    requested,
                    layer_z: None,
                    shapes: Vec::new(),
                    filtered_shapes: 0,
                });
                continue;
            };

            let mut shapes = Vec::with_capacity(layer.shapes.len());
            let mut filtered_shapes = 0;
            for (index, shape) in layer.shapes.iter().enumerate() {
                if !self.includes(shape.identifier()) {
                    filtered_shapes += 1;
                    continue;
                }
                let classified = classify_shape(shape, index, &self.params)
                    .map_err(|source| UnitError::Classify { z: layer.z, source })?;
                shapes.push(classified);
            }

            results.push(HeightResult {
                requested,
                layer_z: Some(layer.z),
                shapes,
                filtered_shapes,
            });
        }

        Ok(FileResult {
            name: file.name().to_string(),
            thickness: file.thickness(),
            heights: results,
        })
    }
}

/// Per-file status in the run output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Analyzed.
    Ok,
    /// Failed; see the error message.
    Error,
    /// Skipped by a filter or exclusion.
    Excluded,
}

impl FileStatus {
    /// Lowercase tag used in output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Excluded => "excluded",
        }
    }
}

/// What happened to one unit.
#[derive(Debug)]
pub enum UnitOutcome {
    /// The unit completed.
    Completed(FileResult),
    /// The unit failed.
    Failed(UnitError),
    /// The file was never dispatched.
    Excluded {
        /// Why it was skipped.
        reason: String,
    },
}

/// Outcome of one file in a run.
#[derive(Debug)]
pub struct FileOutcome {
    /// The file.
    pub file: DiscoveredFile,
    /// Its outcome.
    pub outcome: UnitOutcome,
}

impl FileOutcome {
    /// Outcome of a finished unit.
    #[must_use]
    pub fn finished(file: DiscoveredFile, result: Result<FileResult, UnitError>) -> Self {
        let outcome = match result {
            Ok(r) => UnitOutcome::Completed(r),
            Err(e) => UnitOutcome::Failed(e),
        };
        Self { file, outcome }
    }

    /// Outcome of an excluded file.
    #[must_use]
    pub fn excluded(file: DiscoveredFile, reason: impl Into<String>) -> Self {
        Self {
            file,
            outcome: UnitOutcome::Excluded {
                reason: reason.into(),
            },
        }
    }

    /// Status tag.
    #[must_use]
    pub const fn status(&self) -> FileStatus {
        match self.outcome {
            UnitOutcome::Completed(_) => FileStatus::Ok,
            UnitOutcome::Failed(_) => FileStatus::Error,
            UnitOutcome::Excluded { .. } => FileStatus::Excluded,
        }
    }

    /// The result, for completed units.
    #[must_use]
    pub const fn result(&self) -> Option<&FileResult> {
        match &self.outcome {
            UnitOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }

    /// Error or exclusion message.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match &self.outcome {
            UnitOutcome::Completed(_) => None,
            UnitOutcome::Failed(e) => Some(e.to_string()),
            UnitOutcome::Excluded { reason } => Some(reason.clone()),
        }
    }

    /// Display name: the parser's name when available, else the file name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.result().map_or(self.file.name.as_str(), |r| r.name.as_str())
    }
}
