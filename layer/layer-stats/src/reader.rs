//! [`LayerReader`] over JSON layer dumps.
//!
//! The dump layout mirrors the in-memory model:
//!
//! ```json
//! {
//!   "name": "gear.clf",
//!   "thickness": 0.05,
//!   "layers": [
//!     { "z": 1.5, "shapes": [
//!       { "identifier": 3, "paths": [
//!         { "points": [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]] },
//!         { "arc": { "center": [2.0, 1.5], "radius": 0.5 } }
//!       ] }
//!     ] }
//!   ]
//! }
//! ```

use std::path::Path;

use layer_types::{
    CircularArc, Height, Identifier, Layer, LayerFile, LayerReader, MemoryLayerFile, ParseError,
    ParseResult, Point2, RawPath, Shape,
};
use serde::Deserialize;

/// Extension accepted by [`JsonDumpReader`].
pub const DUMP_EXTENSION: &str = "json";

/// Reads layer files exported as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDumpReader;

impl JsonDumpReader {
    /// Create a reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LayerReader for JsonDumpReader {
    fn open(&self, path: &Path) -> ParseResult<Box<dyn LayerFile>> {
        if !path.exists() {
            return Err(ParseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let is_dump = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(DUMP_EXTENSION));
        if !is_dump {
            return Err(ParseError::unsupported(format!(
                "{} is not a JSON layer dump",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let fallback = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Box::new(parse_dump(&content, &fallback)?))
    }
}

/// Parse a dump document. `fallback_name` is used when it has no `name`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidContent`] for malformed JSON, a bad
/// thickness or height, and [`ParseError::EmptyShape`] for a shape with
/// no paths.
pub fn parse_dump(content: &str, fallback_name: &str) -> ParseResult<MemoryLayerFile> {
    let dump: DumpFile = serde_json::from_str(content)
        .map_err(|e| ParseError::invalid_content(format!("malformed layer dump: {e}")))?;

    if !dump.thickness.is_finite() || dump.thickness <= 0.0 {
        return Err(ParseError::invalid_content(format!(
            "layer thickness must be positive, got {}",
            dump.thickness
        )));
    }

    let layers = dump
        .layers
        .into_iter()
        .map(DumpLayer::into_layer)
        .collect::<ParseResult<Vec<_>>>()?;
    let name = dump.name.unwrap_or_else(|| fallback_name.to_string());
    Ok(MemoryLayerFile::new(name, dump.thickness, layers))
}

#[derive(Debug, Deserialize)]
struct DumpFile {
    #[serde(default)]
    name: Option<String>,
    thickness: f64,
    #[serde(default)]
    layers: Vec<DumpLayer>,
}

#[derive(Debug, Deserialize)]
struct DumpLayer {
    z: f64,
    #[serde(default)]
    shapes: Vec<DumpShape>,
}

impl DumpLayer {
    fn into_layer(self) -> ParseResult<Layer> {
        if !self.z.is_finite() {
            return Err(ParseError::invalid_content(format!(
                "non-finite layer height {}",
                self.z
            )));
        }
        let shapes = self
            .shapes
            .into_iter()
            .map(DumpShape::into_shape)
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(Layer::new(Height::from_mm(self.z), shapes))
    }
}

#[derive(Debug, Deserialize)]
struct DumpShape {
    #[serde(default)]
    identifier: Option<i64>,
    #[serde(default)]
    paths: Vec<DumpPath>,
}

impl DumpShape {
    fn into_shape(self) -> ParseResult<Shape> {
        let paths = self.paths.into_iter().map(DumpPath::into_raw).collect();
        Shape::new(self.identifier.map(Identifier::new), paths)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpPath {
    Points {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        identifier: Option<i64>,
    },
    Arc {
        arc: DumpArc,
        #[serde(default)]
        identifier: Option<i64>,
    },
}

impl DumpPath {
    fn into_raw(self) -> RawPath {
        let (raw, identifier) = match self {
            Self::Points { points, identifier } => (
                RawPath::points(points.iter().map(|[x, y]| Point2::new(*x, *y)).collect()),
                identifier,
            ),
            Self::Arc { arc, identifier } => (
                RawPath::arc(CircularArc {
                    center: Point2::new(arc.center[0], arc.center[1]),
                    radius: arc.radius,
                    start_deg: arc.start_deg,
                    sweep_deg: arc.sweep_deg,
                }),
                identifier,
            ),
        };
        match identifier {
            Some(id) => raw.with_identifier(Identifier::new(id)),
            None => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DumpArc {
    center: [f64; 2],
    radius: f64,
    #[serde(default)]
    start_deg: f64,
    #[serde(default = "full_sweep")]
    sweep_deg: f64,
}

const fn full_sweep() -> f64 {
    360.0
}
