//! Build-wide statistics over completed units.
//!
//! Counting rules:
//! - a *shape* is one solid exterior (promoted exteriors included);
//! - holes are confirmed holes only, ambiguous paths are counted apart;
//! - a source shape whose exterior came from an area tie is kept out of
//!   the shape and hole counts but stays in the per-identifier listing;
//! - errored and excluded files contribute nothing but their status.

use std::collections::BTreeMap;

use layer_holes::{ClassifiedShape, ShapeClassification};
use layer_types::{Height, Point2, Winding, identifier_key};

use crate::unit::{FileOutcome, FileResult, FileStatus};

/// Files per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCounts {
    /// Completed.
    pub ok: usize,
    /// Failed.
    pub error: usize,
    /// Skipped.
    pub excluded: usize,
}

/// One solid shape in the per-identifier listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSummary {
    /// File the shape came from.
    pub file_name: String,
    /// Height of the layer.
    pub z: Height,
    /// Index of the source shape in its layer.
    pub shape_index: usize,
    /// Index of the exterior path within the source shape.
    pub exterior_index: usize,
    /// Exterior area (mm²).
    pub exterior_area: f64,
    /// Exterior area minus holes (mm²).
    pub net_area: f64,
    /// Area of each hole, in source order.
    pub hole_areas: Vec<f64>,
    /// Exterior winding.
    pub winding: Winding,
    /// Exterior centroid.
    pub centroid: Option<Point2<f64>>,
    /// Split off as an independent exterior.
    pub promoted: bool,
    /// See [`ClassifiedShape::winding_confirmed`].
    pub winding_confirmed: bool,
    /// See [`ClassifiedShape::containment_confirmed`].
    pub containment_confirmed: bool,
}

impl ShapeSummary {
    fn new(file_name: &str, z: Height, shape_index: usize, shape: &ClassifiedShape) -> Self {
        Self {
            file_name: file_name.to_string(),
            z,
            shape_index,
            exterior_index: shape.exterior.index,
            exterior_area: shape.exterior.area(),
            net_area: shape.net_area(),
            hole_areas: shape.holes.iter().map(|h| h.area()).collect(),
            winding: shape.exterior.winding(),
            centroid: shape.exterior.centroid(),
            promoted: shape.promoted,
            winding_confirmed: shape.winding_confirmed,
            containment_confirmed: shape.containment_confirmed,
        }
    }

    /// Number of holes.
    #[must_use]
    pub fn hole_count(&self) -> usize {
        self.hole_areas.len()
    }
}

/// Totals at one requested height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeightSummary {
    /// Files with a layer at this height.
    pub files: usize,
    /// Solid shapes.
    pub shapes: usize,
    /// Solid shapes with at least one hole.
    pub shapes_with_holes: usize,
    /// Confirmed holes.
    pub holes: usize,
}

impl HeightSummary {
    fn absorb(&mut self, other: Self) {
        self.files += other.files;
        self.shapes += other.shapes;
        self.shapes_with_holes += other.shapes_with_holes;
        self.holes += other.holes;
    }
}

/// Conditions surfaced for review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Shapes whose largest-area exterior was not the first path.
    pub exterior_reordered: usize,
    /// Shapes where `paths - 1` differs from the confirmed hole count.
    pub count_mismatches: usize,
    /// Exteriors chosen from tied areas; their shapes skip the hole counts.
    pub area_ties: usize,
    /// Paths with boundary-ambiguous containment.
    pub ambiguous_paths: usize,
    /// Paths split off as independent exteriors.
    pub promoted_exteriors: usize,
    /// Open or zero-area paths.
    pub open_paths: usize,
    /// Source shapes with no closed path at all.
    pub open_only_shapes: usize,
    /// Shapes skipped by the identifier filter.
    pub filtered_shapes: usize,
}

/// Statistics for a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateStatistics {
    /// Solid shapes.
    pub total_shapes: usize,
    /// Solid shapes with at least one hole.
    pub shapes_with_holes: usize,
    /// Confirmed holes.
    pub total_holes: usize,
    /// Most holes in one shape.
    pub max_holes_per_shape: usize,
    /// Hole count to number of shapes with that many holes.
    pub hole_distribution: BTreeMap<usize, usize>,
    /// Solid shapes grouped by identifier key (`"none"` when untagged).
    pub per_identifier: BTreeMap<String, Vec<ShapeSummary>>,
    /// Totals by requested height.
    pub per_height: BTreeMap<Height, HeightSummary>,
    /// Files per status.
    pub files: FileCounts,
    /// Review counters.
    pub diagnostics: Diagnostics,
}

impl AggregateStatistics {
    /// Merge `outcomes` in path order.
    #[must_use]
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut sorted: Vec<&FileOutcome> = outcomes.iter().collect();
        sorted.sort_by(|a, b| a.file.path.cmp(&b.file.path));

        let mut stats = Self::default();
        for outcome in sorted {
            match outcome.status() {
                FileStatus::Ok => stats.files.ok += 1,
                FileStatus::Error => stats.files.error += 1,
                FileStatus::Excluded => stats.files.excluded += 1,
            }
            if let Some(result) = outcome.result() {
                stats.add_file(result);
            }
        }
        stats
    }

    fn add_file(&mut self, result: &FileResult) {
        for height in &result.heights {
            let Some(z) = height.layer_z else {
                continue;
            };
            self.diagnostics.filtered_shapes += height.filtered_shapes;

            let mut summary = HeightSummary {
                files: 1,
                ..HeightSummary::default()
            };
            for shape in &height.shapes {
                self.add_classification(&result.name, z, shape);
                if shape.has_area_tie() {
                    continue;
                }
                summary.shapes += shape.solids.len();
                summary.shapes_with_holes +=
                    shape.solids.iter().filter(|s| !s.holes.is_empty()).count();
                summary.holes += shape.confirmed_holes();
            }
            self.per_height
                .entry(height.requested)
                .or_default()
                .absorb(summary);
        }
    }

    fn add_classification(&mut self, file_name: &str, z: Height, shape: &ShapeClassification) {
        let d = &mut self.diagnostics;
        d.exterior_reordered += usize::from(shape.exterior_reordered);
        d.count_mismatches += usize::from(shape.count_mismatch());
        d.ambiguous_paths += shape.ambiguous.len();
        d.open_paths += shape.open_paths.len();
        d.open_only_shapes += usize::from(!shape.is_solid());

        let counted = !shape.has_area_tie();
        for solid in &shape.solids {
            if counted {
                let holes = solid.hole_count();
                self.total_shapes += 1;
                self.total_holes += holes;
                if holes > 0 {
                    self.shapes_with_holes += 1;
                }
                self.max_holes_per_shape = self.max_holes_per_shape.max(holes);
                *self.hole_distribution.entry(holes).or_insert(0) += 1;
            }
            self.diagnostics.area_ties += usize::from(solid.area_tie);
            self.diagnostics.promoted_exteriors += usize::from(solid.promoted);

            self.per_identifier
                .entry(identifier_key(solid.identifier))
                .or_default()
                .push(ShapeSummary::new(file_name, z, shape.shape_index, solid));
        }
    }

    /// Mean holes per solid shape.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_holes(&self) -> f64 {
        if self.total_shapes == 0 {
            0.0
        } else {
            self.total_holes as f64 / self.total_shapes as f64
        }
    }
}
