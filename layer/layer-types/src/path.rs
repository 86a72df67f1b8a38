//! Resolved path variants.
//!
//! A [`Path`] is what a raw scan path becomes once its closure has been
//! decided. Each variant carries only the fields that make sense for it,
//! and every derived quantity (area, winding, centroid) dispatches on the
//! variant.

use std::borrow::Cow;
use std::f64::consts::PI;
use std::fmt;

use nalgebra::Point2;

use crate::bounds::Bounds2;
use crate::polygon::{self, Containment};

/// Orientation of a closed path, taken from the sign of its area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    /// Positive signed area.
    CounterClockwise,
    /// Negative signed area.
    Clockwise,
    /// Zero area (open path, or collapsed ring).
    Degenerate,
}

impl Winding {
    /// Winding for a signed area.
    #[must_use]
    pub fn from_signed_area(area: f64) -> Self {
        if area > 0.0 {
            Self::CounterClockwise
        } else if area < 0.0 {
            Self::Clockwise
        } else {
            Self::Degenerate
        }
    }

    /// Short tag used in reports: `CCW`, `CW` or `degenerate`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CounterClockwise => "CCW",
            Self::Clockwise => "CW",
            Self::Degenerate => "degenerate",
        }
    }
}

impl fmt::Display for Winding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A circular arc around `center`.
///
/// `sweep_deg` is signed: positive sweeps counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularArc {
    /// Arc center.
    pub center: Point2<f64>,
    /// Radius in mm.
    pub radius: f64,
    /// Start angle in degrees, measured from +X.
    pub start_deg: f64,
    /// Signed sweep in degrees.
    pub sweep_deg: f64,
}

impl CircularArc {
    /// A full counter-clockwise circle.
    #[must_use]
    pub const fn circle(center: Point2<f64>, radius: f64) -> Self {
        Self {
            center,
            radius,
            start_deg: 0.0,
            sweep_deg: 360.0,
        }
    }

    /// Absolute angular coverage in degrees, capped at 360.
    #[must_use]
    pub fn coverage_deg(&self) -> f64 {
        self.sweep_deg.abs().min(360.0)
    }

    /// Sample `segments + 1` points along the arc, endpoints included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&self, segments: usize) -> Vec<Point2<f64>> {
        let segments = segments.max(1);
        let start = self.start_deg.to_radians();
        let sweep = self.sweep_deg.to_radians();
        (0..=segments)
            .map(|i| {
                let a = start + sweep * (i as f64) / (segments as f64);
                Point2::new(
                    self.radius.mul_add(a.cos(), self.center.x),
                    self.radius.mul_add(a.sin(), self.center.y),
                )
            })
            .collect()
    }
}

/// A closed ring with a well-defined signed area.
///
/// The closing point is never stored twice: a ring whose last point
/// repeats the first has that duplicate dropped on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    ring: Vec<Point2<f64>>,
    signed_area: f64,
}

impl Polygon {
    /// Build a polygon, dropping a trailing point that coincides with the
    /// first within `tolerance`.
    #[must_use]
    pub fn new(mut points: Vec<Point2<f64>>, tolerance: f64) -> Self {
        if points.len() > 1 {
            let first = points[0];
            if points
                .last()
                .is_some_and(|last| (last - first).norm() < tolerance)
            {
                points.pop();
            }
        }
        let signed_area = polygon::signed_area(&points);
        Self {
            ring: points,
            signed_area,
        }
    }

    /// Ring points, without a repeated closing point.
    #[must_use]
    pub fn ring(&self) -> &[Point2<f64>] {
        &self.ring
    }

    /// Signed area (positive = counter-clockwise).
    #[must_use]
    pub const fn signed_area(&self) -> f64 {
        self.signed_area
    }
}

/// An open line feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<Point2<f64>>,
}

impl Polyline {
    /// Wrap an ordered point list.
    #[must_use]
    pub const fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    /// The points, in scan order.
    #[must_use]
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }
}

/// Variant tag of a [`Path`], for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Closed ring.
    Polygon,
    /// Open line.
    Polyline,
    /// Single point.
    Point,
    /// Circular arc.
    Arc,
}

impl PathKind {
    /// Lower-case tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Polyline => "polyline",
            Self::Point => "point",
            Self::Arc => "arc",
        }
    }
}

/// A closure-resolved scan path.
#[derive(Debug, Clone, PartialEq)]
pub enum Path {
    /// A closed ring.
    Polygon(Polygon),
    /// An open line; encloses no area.
    Polyline(Polyline),
    /// A single-point feature.
    Point(Point2<f64>),
    /// A circular arc; `closed` when its sweep counts as a full circle.
    Arc {
        /// The arc geometry.
        arc: CircularArc,
        /// Whether the arc was resolved as closed.
        closed: bool,
    },
}

impl Path {
    /// Segments used when an arc has to be turned into a ring.
    pub const ARC_SEGMENTS: usize = 72;

    /// Variant tag.
    #[must_use]
    pub const fn kind(&self) -> PathKind {
        match self {
            Self::Polygon(_) => PathKind::Polygon,
            Self::Polyline(_) => PathKind::Polyline,
            Self::Point(_) => PathKind::Point,
            Self::Arc { .. } => PathKind::Arc,
        }
    }

    /// Whether the path encloses a region.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        match self {
            Self::Polygon(_) => true,
            Self::Arc { closed, .. } => *closed,
            Self::Polyline(_) | Self::Point(_) => false,
        }
    }

    /// Signed enclosed area; zero for open paths.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        match self {
            Self::Polygon(p) => p.signed_area(),
            Self::Arc { arc, closed: true } => {
                PI * arc.radius * arc.radius * arc.sweep_deg.signum()
            }
            Self::Arc { closed: false, .. } | Self::Polyline(_) | Self::Point(_) => 0.0,
        }
    }

    /// Enclosed area, never negative.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Winding, from the signed area.
    #[must_use]
    pub fn winding(&self) -> Winding {
        Winding::from_signed_area(self.signed_area())
    }

    /// Area centroid for closed paths, point mean otherwise.
    #[must_use]
    pub fn centroid(&self) -> Option<Point2<f64>> {
        match self {
            Self::Polygon(p) => polygon::centroid(p.ring()),
            Self::Arc { arc, closed: true } => Some(arc.center),
            Self::Arc { arc, closed: false } => {
                polygon::vertex_mean(&arc.sample(Self::ARC_SEGMENTS))
            }
            Self::Polyline(l) => polygon::vertex_mean(l.points()),
            Self::Point(p) => Some(*p),
        }
    }

    /// Points describing the path, as handed to renderers.
    ///
    /// Arcs are sampled; polygons return their ring without the closing
    /// duplicate.
    #[must_use]
    pub fn points(&self) -> Cow<'_, [Point2<f64>]> {
        match self {
            Self::Polygon(p) => Cow::Borrowed(p.ring()),
            Self::Polyline(l) => Cow::Borrowed(l.points()),
            Self::Point(p) => Cow::Owned(vec![*p]),
            Self::Arc { arc, closed } => {
                let mut pts = arc.sample(Self::ARC_SEGMENTS);
                if *closed {
                    pts.pop();
                }
                Cow::Owned(pts)
            }
        }
    }

    /// Number of stored points (arcs report their sample count).
    #[must_use]
    pub fn point_count(&self) -> usize {
        match self {
            Self::Polygon(p) => p.ring().len(),
            Self::Polyline(l) => l.points().len(),
            Self::Point(_) => 1,
            Self::Arc { .. } => self.points().len(),
        }
    }

    /// Length of the path; closed paths include the closing edge.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        match self {
            Self::Polygon(p) => polygon::perimeter(p.ring(), true),
            Self::Polyline(l) => polygon::perimeter(l.points(), false),
            Self::Point(_) => 0.0,
            Self::Arc { arc, .. } => arc.radius * arc.coverage_deg().to_radians(),
        }
    }

    /// Bounding box of the path's points.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds2> {
        Bounds2::from_points(&self.points())
    }

    /// Classify `point` against the region this path encloses.
    ///
    /// Open paths enclose nothing, so every point is outside.
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>, boundary_tolerance: f64) -> Containment {
        match self {
            Self::Polygon(p) => polygon::contains_point(p.ring(), point, boundary_tolerance),
            Self::Arc { arc, closed: true } => {
                let d = (point - arc.center).norm();
                if (d - arc.radius).abs() <= boundary_tolerance {
                    Containment::Boundary
                } else if d < arc.radius {
                    Containment::Inside
                } else {
                    Containment::Outside
                }
            }
            Self::Arc { closed: false, .. } | Self::Polyline(_) | Self::Point(_) => {
                Containment::Outside
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn closed_square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_polygon_drops_closing_point() {
        let polygon = Polygon::new(closed_square(), 1e-3);
        assert_eq!(polygon.ring().len(), 4);
        assert_relative_eq!(polygon.signed_area(), 16.0);
    }

    #[test]
    fn test_path_polygon_metrics() {
        let path = Path::Polygon(Polygon::new(closed_square(), 1e-3));
        assert!(path.is_closed());
        assert_eq!(path.kind(), PathKind::Polygon);
        assert_eq!(path.winding(), Winding::CounterClockwise);
        assert_relative_eq!(path.area(), 16.0);
        assert_relative_eq!(path.perimeter(), 16.0);

        let c = path.centroid().unwrap();
        assert_relative_eq!(c.x, 2.0);
        assert_relative_eq!(c.y, 2.0);
        assert_eq!(path.contains(&c, 1e-9), Containment::Inside);
    }

    #[test]
    fn test_open_paths_have_no_area() {
        let line = Path::Polyline(Polyline::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(5.0, 5.0),
        ]));
        assert!(!line.is_closed());
        assert_relative_eq!(line.area(), 0.0);
        assert_eq!(line.winding(), Winding::Degenerate);
        assert_eq!(
            line.contains(&Point2::new(4.0, 1.0), 1e-9),
            Containment::Outside
        );

        let point = Path::Point(Point2::new(1.0, 2.0));
        assert_eq!(point.point_count(), 1);
        assert_relative_eq!(point.perimeter(), 0.0);
    }

    #[test]
    fn test_closed_arc() {
        let cw = CircularArc {
            center: Point2::new(1.0, 1.0),
            radius: 2.0,
            start_deg: 90.0,
            sweep_deg: -360.0,
        };
        let path = Path::Arc {
            arc: cw,
            closed: true,
        };
        assert_eq!(path.winding(), Winding::Clockwise);
        assert_relative_eq!(path.area(), PI * 4.0);
        assert_eq!(path.centroid(), Some(Point2::new(1.0, 1.0)));
        assert_eq!(path.points().len(), Path::ARC_SEGMENTS);
        assert_eq!(
            path.contains(&Point2::new(3.0, 1.0), 1e-9),
            Containment::Boundary
        );
        assert_eq!(
            path.contains(&Point2::new(1.5, 1.5), 1e-9),
            Containment::Inside
        );
    }

    #[test]
    fn test_arc_sample_endpoints() {
        let arc = CircularArc {
            center: Point2::origin(),
            radius: 1.0,
            start_deg: 0.0,
            sweep_deg: 90.0,
        };
        let pts = arc.sample(4);
        assert_eq!(pts.len(), 5);
        assert_relative_eq!(pts[0].x, 1.0);
        assert_relative_eq!(pts[4].y, 1.0);
        assert_relative_eq!(pts[4].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.coverage_deg(), 90.0);
    }

    #[test]
    fn test_winding_tags() {
        assert_eq!(Winding::from_signed_area(2.0).as_str(), "CCW");
        assert_eq!(Winding::from_signed_area(-2.0).to_string(), "CW");
        assert_eq!(Winding::from_signed_area(0.0), Winding::Degenerate);
    }
}
