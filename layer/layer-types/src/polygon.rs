//! Planar polygon primitives.
//!
//! Rings are given as open point lists: the closing edge from the last
//! point back to the first is implicit.

use nalgebra::Point2;

/// Areas below this are treated as zero when choosing a centroid formula.
const AREA_EPSILON: f64 = 1e-12;

/// Result of a point-in-polygon query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Strictly inside the ring.
    Inside,
    /// Strictly outside the ring.
    Outside,
    /// On an edge, within the boundary tolerance.
    Boundary,
}

/// Signed area of a ring via the shoelace formula.
///
/// Positive for counter-clockwise rings, negative for clockwise ones,
/// zero for fewer than three points.
#[must_use]
pub fn signed_area(ring: &[Point2<f64>]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = &ring[(i + 1) % ring.len()];
        twice += a.x.mul_add(b.y, -(b.x * a.y));
    }
    twice / 2.0
}

/// Mean of the points, or `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn vertex_mean(points: &[Point2<f64>]) -> Option<Point2<f64>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Area centroid of a ring.
///
/// Falls back to the vertex mean when the ring encloses no area.
#[must_use]
pub fn centroid(ring: &[Point2<f64>]) -> Option<Point2<f64>> {
    let area = signed_area(ring);
    if area.abs() < AREA_EPSILON {
        return vertex_mean(ring);
    }
    let (mut cx, mut cy) = (0.0, 0.0);
    for (i, a) in ring.iter().enumerate() {
        let b = &ring[(i + 1) % ring.len()];
        let cross = a.x.mul_add(b.y, -(b.x * a.y));
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let k = 1.0 / (6.0 * area);
    Some(Point2::new(cx * k, cy * k))
}

/// Total edge length; includes the closing edge when `closed`.
#[must_use]
pub fn perimeter(points: &[Point2<f64>], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    if closed {
        open + (points[0] - points[points.len() - 1]).norm()
    } else {
        open
    }
}

/// Shortest distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Classify `point` against `ring` by ray casting.
///
/// Points within `boundary_tolerance` of any edge are reported as
/// [`Containment::Boundary`] before the crossing test runs.
#[must_use]
pub fn contains_point(
    ring: &[Point2<f64>],
    point: &Point2<f64>,
    boundary_tolerance: f64,
) -> Containment {
    if ring.len() < 3 {
        return Containment::Outside;
    }

    let n = ring.len();
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        if distance_to_segment(point, a, b) <= boundary_tolerance {
            return Containment::Boundary;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&ring[i], &ring[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    if inside {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// Whether every point lies within `tolerance` of a single line.
///
/// Coincident point sets count as collinear.
#[must_use]
pub fn is_collinear(points: &[Point2<f64>], tolerance: f64) -> bool {
    let Some(a) = points.first() else {
        return true;
    };
    let Some(b) = points
        .iter()
        .max_by(|p, q| (*p - a).norm_squared().total_cmp(&(*q - a).norm_squared()))
    else {
        return true;
    };

    let ab = b - a;
    let len = ab.norm();
    if len <= tolerance {
        return true;
    }

    points.iter().all(|p| {
        let ap = p - a;
        (ab.x * ap.y - ab.y * ap.x).abs() / len <= tolerance
    })
}
