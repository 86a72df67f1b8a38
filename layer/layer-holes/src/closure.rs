//! Path closure resolution.
//!
//! Scan data does not always repeat the first point at the end of a
//! closed contour. A path is closed when:
//!
//! 1. its endpoints coincide within [`ClosureParams::endpoint_tolerance`], or
//! 2. it is near-circular: a fitted circle has a small relative radius
//!    deviation and the points sweep at least
//!    [`ClosureParams::min_coverage_deg`] around its center, so the
//!    remaining gap is a sampling artifact.
//!
//! Everything else (fewer than three points, collinear points, genuine
//! openings) is open and encloses no area.

// Point counts fit comfortably in f64.
#![allow(clippy::cast_precision_loss)]

use layer_types::polygon::{is_collinear, vertex_mean};
use layer_types::{Path, Point2, Polygon, Polyline, RawGeometry, RawPath};
use nalgebra::{Matrix3, Vector3};

use crate::error::{ClassifyError, ClassifyResult};
use crate::params::ClosureParams;

/// How a closure decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosureMethod {
    /// First and last points coincide.
    Coincident,
    /// Near-circular path whose gap is a sampling artifact.
    CircleFit,
    /// Analytic arc whose sweep covers a full circle.
    ArcSweep,
    /// Not closed.
    Open,
}

/// Circle fitted to a point sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    /// Fitted center.
    pub center: Point2<f64>,
    /// Mean distance from the center.
    pub radius: f64,
    /// Standard deviation of the point distances.
    pub radius_std_dev: f64,
    /// Degrees swept around the center (360 minus the largest gap).
    pub coverage_deg: f64,
    /// Largest angular gap between consecutive points, in degrees.
    pub max_gap_deg: f64,
}

impl CircleFit {
    /// Radius deviation as a fraction of the radius.
    #[must_use]
    pub fn relative_std_dev(&self) -> f64 {
        if self.radius > 0.0 {
            self.radius_std_dev / self.radius
        } else {
            f64::INFINITY
        }
    }

    /// Whether this fit closes a path under `params`.
    #[must_use]
    pub fn closes(&self, params: &ClosureParams) -> bool {
        self.coverage_deg >= params.min_coverage_deg()
            && self.relative_std_dev() < params.max_relative_radius_std
    }
}

/// Outcome of resolving one raw path.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The resolved path.
    pub path: Path,
    /// How closure was decided.
    pub method: ClosureMethod,
    /// The circle fit, when one was attempted.
    pub fit: Option<CircleFit>,
}

impl Resolution {
    /// Whether the path was resolved as closed.
    #[must_use]
    pub const fn closed(&self) -> bool {
        self.path.is_closed()
    }

    /// The normalized point list (closing duplicate removed, arcs sampled).
    #[must_use]
    pub fn normalized_points(&self) -> Vec<Point2<f64>> {
        self.path.points().into_owned()
    }
}

/// Fit a circle to `points`.
///
/// The center starts at the point mean and is refined with an algebraic
/// least-squares fit, which stays unbiased when an arc has a gap. Returns
/// `None` for fewer than three points or when the fit is undefined
/// (collinear points).
#[must_use]
pub fn fit_circle(points: &[Point2<f64>], collinear_tolerance: f64) -> Option<CircleFit> {
    if points.len() < 3 || is_collinear(points, collinear_tolerance) {
        return None;
    }
    let mean = vertex_mean(points)?;
    let center = least_squares_center(points, &mean).unwrap_or(mean);

    let n = points.len() as f64;
    let distances: Vec<f64> = points.iter().map(|p| (p - center).norm()).collect();
    let radius = distances.iter().sum::<f64>() / n;
    let variance = distances
        .iter()
        .map(|d| (d - radius).powi(2))
        .sum::<f64>()
        / n;

    let max_gap_deg = largest_angular_gap(points, &center);

    Some(CircleFit {
        center,
        radius,
        radius_std_dev: variance.sqrt(),
        coverage_deg: 360.0 - max_gap_deg,
        max_gap_deg,
    })
}

/// Kåsa fit on mean-centered coordinates: solves for `D, E, F` in
/// `x² + y² + Dx + Ey + F = 0`.
fn least_squares_center(points: &[Point2<f64>], mean: &Point2<f64>) -> Option<Point2<f64>> {
    let mut normal = Matrix3::<f64>::zeros();
    let mut rhs = Vector3::<f64>::zeros();
    for p in points {
        let (x, y) = (p.x - mean.x, p.y - mean.y);
        let row = Vector3::new(x, y, 1.0);
        normal += row * row.transpose();
        rhs -= row * x.mul_add(x, y * y);
    }
    let solution = normal.lu().solve(&rhs)?;
    let center = Point2::new(mean.x - solution.x / 2.0, mean.y - solution.y / 2.0);
    if center.x.is_finite() && center.y.is_finite() {
        Some(center)
    } else {
        None
    }
}

/// Largest gap in degrees between the sorted point angles around `center`,
/// including the wrap-around gap.
fn largest_angular_gap(points: &[Point2<f64>], center: &Point2<f64>) -> f64 {
    let mut angles: Vec<f64> = points
        .iter()
        .map(|p| (p.y - center.y).atan2(p.x - center.x).to_degrees())
        .collect();
    angles.sort_by(f64::total_cmp);

    let (Some(first), Some(last)) = (angles.first(), angles.last()) else {
        return 360.0;
    };
    let wrap = first + 360.0 - last;
    angles
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(wrap, f64::max)
}

/// Resolve a raw point sequence.
#[must_use]
pub fn resolve_points(points: &[Point2<f64>], params: &ClosureParams) -> Resolution {
    if points.len() < 3 {
        let path = match points {
            [single] => Path::Point(*single),
            _ => Path::Polyline(Polyline::new(points.to_vec())),
        };
        return Resolution {
            path,
            method: ClosureMethod::Open,
            fit: None,
        };
    }

    let first = points[0];
    let last = points[points.len() - 1];
    if (last - first).norm() < params.endpoint_tolerance {
        return Resolution {
            path: Path::Polygon(Polygon::new(points.to_vec(), params.endpoint_tolerance)),
            method: ClosureMethod::Coincident,
            fit: None,
        };
    }

    let fit = fit_circle(points, params.collinear_tolerance);
    if fit.is_some_and(|f| f.closes(params)) {
        return Resolution {
            path: Path::Polygon(Polygon::new(points.to_vec(), params.endpoint_tolerance)),
            method: ClosureMethod::CircleFit,
            fit,
        };
    }

    Resolution {
        path: Path::Polyline(Polyline::new(points.to_vec())),
        method: ClosureMethod::Open,
        fit,
    }
}

/// Resolve a raw path of either geometry.
///
/// `path_index` only labels errors.
///
/// # Errors
///
/// Returns [`ClassifyError::NonFiniteCoordinate`] for NaN/infinite points
/// and [`ClassifyError::InvalidArc`] for arcs with a non-positive radius
/// or a non-finite sweep.
pub fn resolve_path(
    raw: &RawPath,
    path_index: usize,
    params: &ClosureParams,
) -> ClassifyResult<Resolution> {
    match &raw.geometry {
        RawGeometry::Points(points) => {
            if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(ClassifyError::NonFiniteCoordinate { path_index });
            }
            Ok(resolve_points(points, params))
        }
        RawGeometry::Arc(arc) => {
            let valid = arc.radius.is_finite()
                && arc.radius > 0.0
                && arc.sweep_deg.is_finite()
                && arc.start_deg.is_finite()
                && arc.center.x.is_finite()
                && arc.center.y.is_finite();
            if !valid {
                return Err(ClassifyError::InvalidArc {
                    path_index,
                    radius: arc.radius,
                    sweep_deg: arc.sweep_deg,
                });
            }
            let closed = arc.coverage_deg() >= params.min_coverage_deg();
            Ok(Resolution {
                path: Path::Arc { arc: *arc, closed },
                method: if closed {
                    ClosureMethod::ArcSweep
                } else {
                    ClosureMethod::Open
                },
                fit: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use layer_types::{CircularArc, PathKind};

    /// Points on a circle from `start` sweeping `span` degrees, `n` points,
    /// last point placed exactly at `start + span`.
    fn arc_points(
        center: Point2<f64>,
        r: f64,
        start: f64,
        span: f64,
        n: usize,
    ) -> Vec<Point2<f64>> {
        (0..n)
            .map(|i| {
                let a = (start + span * i as f64 / (n - 1) as f64).to_radians();
                Point2::new(center.x + r * a.cos(), center.y + r * a.sin())
            })
            .collect()
    }

    #[test]
    fn test_coincident_endpoints_close() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(5.0, 5.0),
            Point2::new(0.0, 0.0005),
        ];
        let res = resolve_points(&pts, &ClosureParams::default());
        assert!(res.closed());
        assert_eq!(res.method, ClosureMethod::Coincident);
        assert_eq!(res.normalized_points().len(), 3);
    }

    #[test]
    fn test_near_circle_with_small_gap_closes() {
        // 353.6° of a 6.05 mm circle, leaving a 0.68 mm gap.
        let mut pts = arc_points(Point2::new(10.0, -20.0), 6.05, 30.0, 353.6, 200);
        for (i, p) in pts.iter_mut().enumerate() {
            let bump = if i % 2 == 0 { 0.001 } else { -0.001 };
            let dir = (*p - Point2::new(10.0, -20.0)).normalize();
            *p += dir * bump;
        }
        let gap = (pts[0] - pts[pts.len() - 1]).norm();
        assert!((gap - 0.68).abs() < 0.01);

        let res = resolve_points(&pts, &ClosureParams::default());
        assert!(res.closed());
        assert_eq!(res.method, ClosureMethod::CircleFit);

        let fit = res.fit.unwrap();
        assert_relative_eq!(fit.center.x, 10.0, epsilon = 1e-3);
        assert_relative_eq!(fit.center.y, -20.0, epsilon = 1e-3);
        assert_relative_eq!(fit.radius, 6.05, epsilon = 1e-3);
        assert!((fit.coverage_deg - 353.6).abs() < 0.1);
        assert!(fit.radius_std_dev < 0.002);
    }

    #[test]
    fn test_half_circle_stays_open() {
        let pts = arc_points(Point2::origin(), 5.0, 0.0, 180.0, 50);
        let res = resolve_points(&pts, &ClosureParams::default());
        assert!(!res.closed());
        assert_eq!(res.method, ClosureMethod::Open);
        assert_relative_eq!(res.path.area(), 0.0);
        assert!(res.fit.unwrap().coverage_deg < 200.0);
    }

    #[test]
    fn test_noisy_ring_stays_open() {
        // Square outline with a gap: full coverage but large radius spread.
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(0.0, 1.0),
        ];
        let res = resolve_points(&pts, &ClosureParams::default());
        assert!(!res.closed());
        assert_eq!(res.path.kind(), PathKind::Polyline);
    }

    #[test]
    fn test_too_few_and_collinear_are_open() {
        let params = ClosureParams::default();
        assert_eq!(
            resolve_points(&[Point2::new(1.0, 1.0)], &params).path.kind(),
            PathKind::Point
        );
        assert!(!resolve_points(&[Point2::origin(), Point2::new(1.0, 0.0)], &params).closed());

        let line: Vec<_> = (0..10_i32).map(|i| Point2::new(f64::from(i), 2.0)).collect();
        let res = resolve_points(&line, &params);
        assert!(!res.closed());
        assert!(res.fit.is_none());
        assert!(fit_circle(&line, 1e-9).is_none());
    }

    #[test]
    fn test_endpoints_only_rejects_circle_fit() {
        let pts = arc_points(Point2::origin(), 6.0, 0.0, 355.0, 120);
        assert!(resolve_points(&pts, &ClosureParams::default()).closed());
        assert!(!resolve_points(&pts, &ClosureParams::endpoints_only()).closed());
    }

    #[test]
    fn test_resolve_path_rejects_non_finite() {
        let raw = RawPath::points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(f64::NAN, 1.0),
            Point2::new(1.0, 1.0),
        ]);
        let err = resolve_path(&raw, 3, &ClosureParams::default()).unwrap_err();
        assert!(matches!(err, ClassifyError::NonFiniteCoordinate { path_index: 3 }));
    }

    #[test]
    fn test_resolve_arcs() {
        let params = ClosureParams::default();
        let full = RawPath::arc(CircularArc::circle(Point2::origin(), 2.0));
        let res = resolve_path(&full, 0, &params).unwrap();
        assert!(res.closed());
        assert_eq!(res.method, ClosureMethod::ArcSweep);

        let partial = RawPath::arc(CircularArc {
            center: Point2::origin(),
            radius: 2.0,
            start_deg: 0.0,
            sweep_deg: 270.0,
        });
        assert!(!resolve_path(&partial, 0, &params).unwrap().closed());

        let bad = RawPath::arc(CircularArc::circle(Point2::origin(), 0.0));
        assert!(matches!(
            resolve_path(&bad, 1, &params),
            Err(ClassifyError::InvalidArc { path_index: 1, .. })
        ));
    }
}
