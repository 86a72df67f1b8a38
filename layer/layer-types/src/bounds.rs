//! 2D bounding box on the build plate.

use nalgebra::Point2;

/// Axis-aligned 2D bounding box in mm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds2 {
    /// Minimum X coordinate.
    pub min_x: f64,
    /// Maximum X coordinate.
    pub max_x: f64,
    /// Minimum Y coordinate.
    pub min_y: f64,
    /// Maximum Y coordinate.
    pub max_y: f64,
}

impl Bounds2 {
    /// Bounds of a point set, or `None` when it is empty.
    #[must_use]
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for p in &points[1..] {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    /// Width of the bounding box.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point of the bounding box.
    #[must_use]
    pub const fn center(&self) -> (f64, f64) {
        (
            f64::midpoint(self.min_x, self.max_x),
            f64::midpoint(self.min_y, self.max_y),
        )
    }

    /// Longer side over shorter side; infinite for a degenerate box.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = (self.width(), self.height());
        let short = w.min(h);
        if short > 0.0 {
            w.max(h) / short
        } else {
            f64::INFINITY
        }
    }

    /// Check if a point is inside the bounds (edges inclusive).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest box enclosing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds2::from_points(&[
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 2.0),
            Point2::new(4.0, 5.0),
        ])
        .unwrap();

        assert!((bounds.width() - 10.0).abs() < f64::EPSILON);
        assert!((bounds.height() - 5.0).abs() < f64::EPSILON);

        let (cx, cy) = bounds.center();
        assert!((cx - 5.0).abs() < f64::EPSILON);
        assert!((cy - 2.5).abs() < f64::EPSILON);

        assert!(bounds.contains(5.0, 2.5));
        assert!(!bounds.contains(11.0, 2.5));
        assert!((bounds.aspect_ratio() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounds_empty_and_union() {
        assert!(Bounds2::from_points(&[]).is_none());

        let a = Bounds2 {
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
        };
        let b = Bounds2 {
            min_x: -2.0,
            max_x: 0.5,
            min_y: 0.5,
            max_y: 3.0,
        };
        let u = a.union(&b);
        assert_eq!(
            u,
            Bounds2 {
                min_x: -2.0,
                max_x: 1.0,
                min_y: 0.0,
                max_y: 3.0
            }
        );
    }
}
