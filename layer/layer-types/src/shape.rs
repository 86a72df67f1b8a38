//! Raw shapes and layers as supplied by a layer-file parser.

use nalgebra::Point2;

use crate::error::{ParseError, ParseResult};
use crate::path::CircularArc;
use crate::units::{Height, Identifier};

/// Geometry of a raw path, before closure is decided.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// An ordered point sequence.
    Points(Vec<Point2<f64>>),
    /// A circular arc stored analytically.
    Arc(CircularArc),
}

/// A scan path exactly as stored in the layer file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPath {
    /// The stored geometry.
    pub geometry: RawGeometry,
    /// Per-path identifier, when the format carries one.
    pub identifier: Option<Identifier>,
}

impl RawPath {
    /// A point-sequence path without identifier.
    #[must_use]
    pub const fn points(points: Vec<Point2<f64>>) -> Self {
        Self {
            geometry: RawGeometry::Points(points),
            identifier: None,
        }
    }

    /// An arc path without identifier.
    #[must_use]
    pub const fn arc(arc: CircularArc) -> Self {
        Self {
            geometry: RawGeometry::Arc(arc),
            identifier: None,
        }
    }

    /// Attach a per-path identifier.
    #[must_use]
    pub const fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// An identified region in a layer, owning one or more paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    identifier: Option<Identifier>,
    paths: Vec<RawPath>,
}

impl Shape {
    /// Create a shape.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyShape`] if `paths` is empty.
    pub fn new(identifier: Option<Identifier>, paths: Vec<RawPath>) -> ParseResult<Self> {
        if paths.is_empty() {
            return Err(ParseError::EmptyShape);
        }
        Ok(Self { identifier, paths })
    }

    /// The shape identifier, falling back to the first path's identifier.
    #[must_use]
    pub fn identifier(&self) -> Option<Identifier> {
        self.identifier
            .or_else(|| self.paths.iter().find_map(|p| p.identifier))
    }

    /// The raw paths, in stored order. Never empty.
    #[must_use]
    pub fn paths(&self) -> &[RawPath] {
        &self.paths
    }

    /// Number of paths.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }
}

/// A height-tagged slice of a single layer file.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Layer height.
    pub z: Height,
    /// Shapes, in stored order.
    pub shapes: Vec<Shape>,
}

impl Layer {
    /// Create a layer.
    #[must_use]
    pub const fn new(z: Height, shapes: Vec<Shape>) -> Self {
        Self { z, shapes }
    }

    /// Check if the layer has no shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_requires_paths() {
        assert!(matches!(Shape::new(None, vec![]), Err(ParseError::EmptyShape)));
    }

    #[test]
    fn test_shape_identifier_fallback() {
        let path = RawPath::points(vec![Point2::origin()]).with_identifier(Identifier::new(4));
        let shape = Shape::new(None, vec![path.clone()]).unwrap();
        assert_eq!(shape.identifier(), Some(Identifier::new(4)));

        let shape = Shape::new(Some(Identifier::new(9)), vec![path]).unwrap();
        assert_eq!(shape.identifier(), Some(Identifier::new(9)));
        assert_eq!(shape.path_count(), 1);
    }
}
