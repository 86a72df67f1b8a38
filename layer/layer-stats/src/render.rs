//! Role-tagged geometry for the rendering collaborator.
//!
//! With the composite-view toggle set, every file's paths at a height are
//! merged into one view; otherwise each file gets its own view per height.

use std::collections::BTreeMap;

use layer_holes::PathRole;
use layer_types::{Bounds2, Height, Identifier, Point2};

use crate::engine::AnalysisReport;
use crate::unit::FileOutcome;

/// Title of merged views.
pub const COMPOSITE_TITLE: &str = "composite";

/// One path ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPath {
    /// Classification role.
    pub role: PathRole,
    /// Source file.
    pub file_name: String,
    /// Source shape identifier.
    pub identifier: Option<Identifier>,
    /// Ordered points, without a repeated closing point.
    pub points: Vec<Point2<f64>>,
    /// Whether the path encloses a region.
    pub closed: bool,
}

/// Paths to draw in one picture.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderView {
    /// File name, or [`COMPOSITE_TITLE`].
    pub title: String,
    /// Requested height.
    pub z: Height,
    /// Paths in source order.
    pub paths: Vec<RenderPath>,
}

impl RenderView {
    /// Bounds of every path point.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds2> {
        self.paths
            .iter()
            .filter_map(|p| Bounds2::from_points(&p.points))
            .reduce(|a, b| a.union(&b))
    }

    /// Number of paths with `role`.
    #[must_use]
    pub fn count(&self, role: PathRole) -> usize {
        self.paths.iter().filter(|p| p.role == role).count()
    }
}

/// Views for a report, honoring its composite-view toggle.
#[must_use]
pub fn render_views(report: &AnalysisReport) -> Vec<RenderView> {
    build_views(&report.files, report.composite_view)
}

/// Views over `files`: one per height when `composite`, else one per
/// file and height. Only heights with a layer produce a view.
#[must_use]
pub fn build_views(files: &[FileOutcome], composite: bool) -> Vec<RenderView> {
    let mut per_file = Vec::new();
    let mut merged: BTreeMap<Height, RenderView> = BTreeMap::new();

    for outcome in files {
        let Some(result) = outcome.result() else {
            continue;
        };
        for height in result.heights.iter().filter(|h| h.layer_z.is_some()) {
            let mut paths = Vec::new();
            for shape in &height.shapes {
                for (role, path) in shape.tagged_paths() {
                    paths.push(RenderPath {
                        role,
                        file_name: result.name.clone(),
                        identifier: shape.identifier,
                        points: path.path.points().into_owned(),
                        closed: path.path.is_closed(),
                    });
                }
            }

            if composite {
                merged
                    .entry(height.requested)
                    .or_insert_with(|| RenderView {
                        title: COMPOSITE_TITLE.to_string(),
                        z: height.requested,
                        paths: Vec::new(),
                    })
                    .paths
                    .extend(paths);
            } else {
                per_file.push(RenderView {
                    title: result.name.clone(),
                    z: height.requested,
                    paths,
                });
            }
        }
    }

    if composite {
        merged.into_values().collect()
    } else {
        per_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::DiscoveredFile;
    use crate::unit::{FileResult, HeightResult};
    use layer_holes::{ClassifyParams, classify_shape};
    use layer_types::{RawPath, Shape};

    fn square(x0: f64, side: f64, ccw: bool) -> RawPath {
        let mut pts = vec![
            Point2::new(x0, 0.0),
            Point2::new(x0 + side, 0.0),
            Point2::new(x0 + side, side),
            Point2::new(x0, side),
        ];
        if !ccw {
            pts.reverse();
        }
        pts.push(pts[0]);
        RawPath::points(pts)
    }

    fn outcome(path: &str, x0: f64) -> FileOutcome {
        let shape = Shape::new(
            None,
            vec![square(x0, 10.0, true), square(x0 + 2.0, 2.0, false)],
        )
        .unwrap();
        let classified = classify_shape(&shape, 0, &ClassifyParams::default()).unwrap();
        let file = DiscoveredFile::from_path(path);
        let result = FileResult {
            name: file.name.clone(),
            thickness: 0.05,
            heights: vec![
                HeightResult {
                    requested: Height::from_mm(1.0),
                    layer_z: Some(Height::from_mm(1.0)),
                    shapes: vec![classified],
                    filtered_shapes: 0,
                },
                HeightResult {
                    requested: Height::from_mm(5.0),
                    layer_z: None,
                    shapes: Vec::new(),
                    filtered_shapes: 0,
                },
            ],
        };
        FileOutcome::finished(file, Ok(result))
    }

    #[test]
    fn test_per_file_views() {
        let files = vec![outcome("/b/a.clf", 0.0), outcome("/b/b.clf", 20.0)];
        let views = build_views(&files, false);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].title, "a.clf");
        assert_eq!(views[0].count(PathRole::Exterior), 1);
        assert_eq!(views[0].count(PathRole::Hole), 1);
        // Closing duplicate is dropped.
        assert_eq!(views[0].paths[0].points.len(), 4);
    }

    #[test]
    fn test_composite_view_merges_files() {
        let files = vec![outcome("/b/a.clf", 0.0), outcome("/b/b.clf", 20.0)];
        let views = build_views(&files, true);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].title, COMPOSITE_TITLE);
        assert_eq!(views[0].paths.len(), 4);

        let bounds = views[0].bounds().unwrap();
        assert!((bounds.max_x - 30.0).abs() < f64::EPSILON);
    }
}
