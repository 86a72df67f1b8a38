//! Property-based tests for closure and classification invariants.
//!
//! Run with: cargo test -p layer-holes -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]

use layer_holes::{ClassifyParams, ClosureParams, classify_shape, resolve_points};
use layer_types::{Point2, RawPath, Shape, Winding, polygon};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A simple (star-shaped) polygon: sorted angles with random radii around
/// a random center, counter-clockwise, without a closing point.
fn arb_simple_polygon() -> impl Strategy<Value = Vec<Point2<f64>>> {
    (
        -100.0..100.0f64,
        -100.0..100.0f64,
        prop::collection::vec((0.0..1.0f64, 1.0..20.0f64), 4..24),
    )
        .prop_map(|(cx, cy, spokes)| {
            let n = spokes.len() as f64;
            spokes
                .iter()
                .enumerate()
                .map(|(i, (jitter, r))| {
                    // One spoke per sector keeps the angles strictly increasing.
                    let a = (i as f64 + 0.1 + 0.8 * jitter) / n * std::f64::consts::TAU;
                    Point2::new(cx + r * a.cos(), cy + r * a.sin())
                })
                .collect()
        })
}

fn winding(points: &[Point2<f64>]) -> Winding {
    Winding::from_signed_area(polygon::signed_area(points))
}

fn closed(mut points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    points.push(points[0]);
    points
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn proptest_winding_invariant_under_rotation(
        points in arb_simple_polygon(),
        shift in 0usize..24,
    ) {
        let original = winding(&points);
        let mut rotated = points.clone();
        rotated.rotate_left(shift % points.len());
        prop_assert_eq!(winding(&rotated), original);
    }

    #[test]
    fn proptest_winding_reverses_with_order(points in arb_simple_polygon()) {
        let original = winding(&points);
        prop_assume!(original != Winding::Degenerate);

        let mut reversed = points.clone();
        reversed.reverse();
        let flipped = winding(&reversed);
        prop_assert_ne!(flipped, original);
        prop_assert_ne!(flipped, Winding::Degenerate);
    }

    #[test]
    fn proptest_repeated_first_point_is_closed(points in arb_simple_polygon()) {
        let resolution = resolve_points(&closed(points), &ClosureParams::default());
        prop_assert!(resolution.closed());
    }

    #[test]
    fn proptest_single_path_shape_has_no_holes(
        points in arb_simple_polygon(),
        reverse in any::<bool>(),
    ) {
        let mut ring = closed(points);
        if reverse {
            ring.reverse();
        }
        let shape = Shape::new(None, vec![RawPath::points(ring)]).unwrap();
        let result = classify_shape(&shape, 0, &ClassifyParams::default()).unwrap();
        prop_assert_eq!(result.confirmed_holes(), 0);
        prop_assert!(result.solids.iter().all(|s| s.holes.is_empty()));
    }

    #[test]
    fn proptest_offset_copy_is_never_a_hole(
        points in arb_simple_polygon(),
        offset in 50.0..80.0f64,
    ) {
        // Same ring shifted well clear of the original and reversed.
        let mut far: Vec<_> = points.iter().map(|p| Point2::new(p.x + offset, p.y)).collect();
        far.reverse();
        let shape = Shape::new(
            None,
            vec![RawPath::points(closed(points)), RawPath::points(closed(far))],
        )
        .unwrap();
        let result = classify_shape(&shape, 0, &ClassifyParams::default()).unwrap();
        prop_assert_eq!(result.confirmed_holes(), 0);
        prop_assert_eq!(result.solids.len(), 2);
    }
}
