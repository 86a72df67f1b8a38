//! Path closure resolution and exterior/hole classification.
//!
//! Every raw scan path is first resolved as closed or open
//! ([`resolve_path`]). The closed paths of a shape are then ranked by area:
//! the largest is the exterior, and each other closed path is a hole only
//! if it winds the opposite way *and* its centroid lies inside the
//! exterior ([`classify_shape`]). Failing paths become independent
//! exteriors rather than being forced into a hole relationship.
//!
//! All functions here are pure and safe to call from any thread.
//!
//! # Example
//!
//! ```
//! use layer_holes::{ClassifyParams, classify_shape};
//! use layer_types::{Point2, RawPath, Shape};
//!
//! let ring = |r: f64, ccw: bool| {
//!     let sign = if ccw { 1.0 } else { -1.0 };
//!     let pts: Vec<_> = (0..=36_i32)
//!         .map(|i| {
//!             let a = sign * f64::from(i % 36).to_radians() * 10.0;
//!             Point2::new(r * a.cos(), r * a.sin())
//!         })
//!         .collect();
//!     RawPath::points(pts)
//! };
//!
//! let shape = Shape::new(None, vec![ring(6.0, true), ring(2.0, false)]).unwrap();
//! let result = classify_shape(&shape, 0, &ClassifyParams::default()).unwrap();
//!
//! assert_eq!(result.solids.len(), 1);
//! assert_eq!(result.confirmed_holes(), 1);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod classify;
mod closure;
mod error;
mod params;

pub use classify::{
    Ambiguity, AmbiguousPath, ClassifiedShape, PathRole, ResolvedPath, ShapeClassification,
    classify_layer, classify_paths, classify_shape,
};
pub use closure::{
    CircleFit, ClosureMethod, Resolution, fit_circle, resolve_path, resolve_points,
};
pub use error::{ClassifyError, ClassifyResult};
pub use params::{ClassifyParams, ClosureParams};
