//! The run artifact: encoding, decoding and writing.
//!
//! A report is described as a [`Node`] tree, normalized to JSON, and
//! written once to `<output_dir>/build-<id>-analysis.json`. Decoding
//! yields a typed [`Artifact`] in which every wrapped value is native.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AnalysisReport;
use crate::error::SerializationResult;
use crate::normalize::{Node, normalize};
use crate::stats::{AggregateStatistics, Diagnostics, ShapeSummary};
use crate::unit::{FileOutcome, FileStatus, UnitOutcome};

/// Decoded run artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Build identifier.
    pub build_id: u64,
    /// Run duration.
    pub duration_seconds: f64,
    /// Composite-view toggle the run was made with.
    pub composite_view: bool,
    /// Headline counts.
    pub counts: Counts,
    /// Hole count to number of shapes.
    pub hole_distribution: BTreeMap<usize, usize>,
    /// One entry per file, sorted by path.
    pub per_file: Vec<FileEntry>,
    /// Solid shapes by identifier key.
    pub per_identifier: BTreeMap<String, Vec<ShapeEntry>>,
    /// Totals by requested height, ascending.
    pub per_height: Vec<HeightEntry>,
    /// Review counters.
    pub diagnostics: DiagnosticsEntry,
}

/// Headline counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Solid shapes.
    pub total_shapes: usize,
    /// Solid shapes with holes.
    pub shapes_with_holes: usize,
    /// Confirmed holes.
    pub total_holes: usize,
    /// Most holes in one shape.
    pub max_holes_per_shape: usize,
    /// Completed files.
    pub files_ok: usize,
    /// Failed files.
    pub files_error: usize,
    /// Excluded files.
    pub files_excluded: usize,
}

/// One file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Display name.
    pub file_name: String,
    /// Full path.
    pub path: String,
    /// Folder relative to `Models`.
    pub folder: String,
    /// Outcome.
    pub status: FileStatus,
    /// Solid shapes found (0 unless `ok`).
    pub shape_count: usize,
    /// Requested heights with a layer (0 unless `ok`).
    pub heights_found: usize,
    /// Failure description, for `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Failure kind, for `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Why the file was skipped, for `excluded`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<String>,
}

/// One solid shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeEntry {
    /// Source file.
    pub file_name: String,
    /// Layer height (mm).
    pub z: f64,
    /// Index of the source shape in its layer.
    pub shape_index: usize,
    /// Index of the exterior path.
    pub exterior_index: usize,
    /// Exterior area (mm²).
    pub exterior_area: f64,
    /// Area net of holes (mm²).
    pub net_area: f64,
    /// Number of holes.
    pub hole_count: usize,
    /// Hole areas (mm²).
    pub hole_areas: Vec<f64>,
    /// `CCW`, `CW` or `degenerate`.
    pub winding: String,
    /// Exterior centroid.
    pub centroid: Option<[f64; 2]>,
    /// Split off as an independent exterior.
    pub promoted: bool,
    /// Winding check result.
    pub winding_confirmed: bool,
    /// Containment check result.
    pub containment_confirmed: bool,
}

/// Totals at one height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightEntry {
    /// Requested height (mm).
    pub z: f64,
    /// Files with a layer here.
    pub files: usize,
    /// Solid shapes.
    pub shapes: usize,
    /// Solid shapes with holes.
    pub shapes_with_holes: usize,
    /// Confirmed holes.
    pub holes: usize,
}

/// Review counters; see [`Diagnostics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsEntry {
    /// Exterior was not the first path.
    pub exterior_reordered: usize,
    /// Path-count heuristic disagreed with confirmed holes.
    pub count_mismatches: usize,
    /// Exterior chosen from tied areas.
    pub area_ties: usize,
    /// Boundary-ambiguous paths.
    pub ambiguous_paths: usize,
    /// Promoted exteriors.
    pub promoted_exteriors: usize,
    /// Open paths.
    pub open_paths: usize,
    /// Shapes with no closed path.
    pub open_only_shapes: usize,
    /// Shapes skipped by the identifier filter.
    pub filtered_shapes: usize,
}

/// Describe `report` as an output tree.
#[must_use]
pub fn to_node(report: &AnalysisReport) -> Node {
    let stats = &report.statistics;
    Node::map()
        .with("build_id", report.build_id)
        .with("duration_seconds", Node::native(report.duration))
        .with("composite_view", report.composite_view)
        .with("counts", counts_node(stats))
        .with(
            "hole_distribution",
            Node::Map(
                stats
                    .hole_distribution
                    .iter()
                    .map(|(holes, n)| (holes.to_string(), Node::from(*n)))
                    .collect(),
            ),
        )
        .with(
            "per_file",
            report.files.iter().map(file_node).collect::<Vec<_>>(),
        )
        .with(
            "per_identifier",
            Node::Map(
                stats
                    .per_identifier
                    .iter()
                    .map(|(key, shapes)| {
                        (key.clone(), Node::Seq(shapes.iter().map(shape_node).collect()))
                    })
                    .collect(),
            ),
        )
        .with(
            "per_height",
            stats
                .per_height
                .iter()
                .map(|(z, h)| {
                    Node::map()
                        .with("z", Node::native(*z))
                        .with("files", h.files)
                        .with("shapes", h.shapes)
                        .with("shapes_with_holes", h.shapes_with_holes)
                        .with("holes", h.holes)
                })
                .collect::<Vec<_>>(),
        )
        .with("diagnostics", diagnostics_node(&stats.diagnostics))
}

fn counts_node(stats: &AggregateStatistics) -> Node {
    Node::map()
        .with("total_shapes", stats.total_shapes)
        .with("shapes_with_holes", stats.shapes_with_holes)
        .with("total_holes", stats.total_holes)
        .with("max_holes_per_shape", stats.max_holes_per_shape)
        .with("files_ok", stats.files.ok)
        .with("files_error", stats.files.error)
        .with("files_excluded", stats.files.excluded)
}

fn file_node(outcome: &FileOutcome) -> Node {
    let (shape_count, heights_found) = outcome.result().map_or((0, 0), |r| {
        (
            r.solid_count(),
            r.heights.iter().filter(|h| h.layer_z.is_some()).count(),
        )
    });
    let node = Node::map()
        .with("file_name", outcome.display_name())
        .with("path", outcome.file.path.display().to_string())
        .with("folder", outcome.file.folder.as_str())
        .with("status", Node::native(outcome.status()))
        .with("shape_count", shape_count)
        .with("heights_found", heights_found);
    match &outcome.outcome {
        UnitOutcome::Completed(_) => node,
        UnitOutcome::Failed(e) => node
            .with("error_message", e.to_string())
            .with("error_kind", e.kind()),
        UnitOutcome::Excluded { reason } => node.with("exclusion_reason", reason.as_str()),
    }
}

fn shape_node(shape: &ShapeSummary) -> Node {
    Node::map()
        .with("file_name", shape.file_name.as_str())
        .with("z", Node::native(shape.z))
        .with("shape_index", shape.shape_index)
        .with("exterior_index", shape.exterior_index)
        .with("exterior_area", shape.exterior_area)
        .with("net_area", shape.net_area)
        .with("hole_count", shape.hole_count())
        .with(
            "hole_areas",
            shape.hole_areas.iter().copied().map(Node::from).collect::<Vec<_>>(),
        )
        .with("winding", Node::native(shape.winding))
        .with("centroid", shape.centroid.as_ref().map(Node::point))
        .with("promoted", shape.promoted)
        .with("winding_confirmed", shape.winding_confirmed)
        .with("containment_confirmed", shape.containment_confirmed)
}

fn diagnostics_node(d: &Diagnostics) -> Node {
    Node::map()
        .with("exterior_reordered", d.exterior_reordered)
        .with("count_mismatches", d.count_mismatches)
        .with("area_ties", d.area_ties)
        .with("ambiguous_paths", d.ambiguous_paths)
        .with("promoted_exteriors", d.promoted_exteriors)
        .with("open_paths", d.open_paths)
        .with("open_only_shapes", d.open_only_shapes)
        .with("filtered_shapes", d.filtered_shapes)
}

/// Encode `report` as pretty-printed JSON.
///
/// # Errors
///
/// Returns a [`SerializationError`](crate::SerializationError) if any
/// value cannot be normalized.
pub fn encode(report: &AnalysisReport) -> SerializationResult<String> {
    let value = normalize(&to_node(report))?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Decode an encoded artifact.
///
/// # Errors
///
/// Returns [`SerializationError::Json`](crate::SerializationError::Json)
/// for malformed input.
pub fn decode(json: &str) -> SerializationResult<Artifact> {
    Ok(serde_json::from_str(json)?)
}

/// Encode `report` and write it to `path`, creating parent directories.
///
/// The artifact is written to a sibling temporary file first, so a failed
/// run never leaves a partial artifact behind.
///
/// # Errors
///
/// Returns a [`SerializationError`](crate::SerializationError) on encoding
/// or I/O failure.
pub fn write_artifact(report: &AnalysisReport, path: &Path) -> SerializationResult<()> {
    let json = encode(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.partial");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), build_id = report.build_id, "artifact written");
    Ok(())
}

/// Read and decode an artifact file.
///
/// # Errors
///
/// Returns a [`SerializationError`](crate::SerializationError) on I/O or
/// decoding failure.
pub fn read_artifact(path: &Path) -> SerializationResult<Artifact> {
    decode(&fs::read_to_string(path)?)
}
