//! Layer, shape and path model for additive-manufacturing layer files.
//!
//! A build is a set of layer files. Each file holds height-tagged layers,
//! each layer holds shapes, and each shape owns one or more scan paths.
//! This crate defines that model plus the interface an external layer-file
//! parser implements to feed it.
//!
//! # Raw and resolved paths
//!
//! Parsers hand over [`RawPath`]s: an ordered point sequence or a circular
//! arc, exactly as stored. Closure resolution (in `layer-holes`) turns each
//! one into a tagged [`Path`]:
//!
//! - [`Path::Polygon`] - a closed ring with a well-defined area and winding
//! - [`Path::Polyline`] - an open line feature (area 0)
//! - [`Path::Point`] - a single-point feature
//! - [`Path::Arc`] - a circular arc, closed when it sweeps a full circle
//!
//! # Example
//!
//! ```
//! use layer_types::{Height, Layer, MemoryLayerFile, LayerFile, RawPath, Shape, Point2};
//!
//! let square = RawPath::points(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(10.0, 0.0),
//!     Point2::new(10.0, 10.0),
//!     Point2::new(0.0, 10.0),
//!     Point2::new(0.0, 0.0),
//! ]);
//! let shape = Shape::new(None, vec![square]).unwrap();
//! let layers = vec![Layer::new(Height::from_mm(1.0), vec![shape])];
//! let file = MemoryLayerFile::new("part.clf", 0.05, layers);
//!
//! assert!(file.layer_at(1.02).is_some());
//! assert!(file.layer_at(3.0).is_none());
//! ```
//!
//! # Coordinate System
//!
//! Coordinates are millimetres on the build plate, roughly `[-125, 125]` on
//! both axes. Positive signed area is counter-clockwise.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod error;
mod path;
pub mod polygon;
mod shape;
mod source;
mod units;

pub use bounds::Bounds2;
pub use error::{ParseError, ParseResult};
pub use path::{CircularArc, Path, PathKind, Polygon, Polyline, Winding};
pub use polygon::Containment;
pub use shape::{Layer, RawGeometry, RawPath, Shape};
pub use source::{LayerFile, LayerReader, MemoryLayerFile, MemoryReader};
pub use units::{Height, Identifier, identifier_key};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Vector2};
