//! Interface consumed from layer-file parsers.
//!
//! The binary layer format is decoded elsewhere; anything that can answer
//! "which layer is at this height" implements [`LayerFile`], and anything
//! that can open one implements [`LayerReader`].

use std::collections::HashMap;
use std::path::{Path as FsPath, PathBuf};

use crate::error::{ParseError, ParseResult};
use crate::shape::Layer;

/// An opened layer file.
pub trait LayerFile {
    /// Display name of the file.
    fn name(&self) -> &str;

    /// Nominal layer thickness in mm; also the tolerance for height lookup.
    fn thickness(&self) -> f64;

    /// Heights of all stored layers, ascending.
    fn layer_heights(&self) -> Vec<f64>;

    /// Lowest and highest stored layer, or `None` for an empty file.
    fn z_range(&self) -> Option<(f64, f64)> {
        let heights = self.layer_heights();
        Some((*heights.first()?, *heights.last()?))
    }

    /// The layer nearest `z`, if one lies within [`thickness`](Self::thickness).
    ///
    /// The layer is returned by value: every query re-derives it.
    fn layer_at(&self, z: f64) -> Option<Layer>;
}

/// Opens layer files from disk (or anywhere else keyed by path).
///
/// Readers are shared across worker threads.
pub trait LayerReader: Send + Sync {
    /// Open the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the file is missing, unsupported or
    /// malformed.
    fn open(&self, path: &FsPath) -> ParseResult<Box<dyn LayerFile>>;
}

/// A layer file held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLayerFile {
    name: String,
    thickness: f64,
    layers: Vec<Layer>,
}

impl MemoryLayerFile {
    /// Create a file; layers are sorted by height.
    #[must_use]
    pub fn new(name: impl Into<String>, thickness: f64, mut layers: Vec<Layer>) -> Self {
        layers.sort_by(|a, b| a.z.cmp(&b.z));
        Self {
            name: name.into(),
            thickness,
            layers,
        }
    }

    /// The stored layers, ascending by height.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl LayerFile for MemoryLayerFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn thickness(&self) -> f64 {
        self.thickness
    }

    fn layer_heights(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.z.mm()).collect()
    }

    fn layer_at(&self, z: f64) -> Option<Layer> {
        let nearest = self
            .layers
            .iter()
            .min_by(|a, b| (a.z.mm() - z).abs().total_cmp(&(b.z.mm() - z).abs()))?;
        if (nearest.z.mm() - z).abs() > self.thickness {
            return None;
        }
        Some(nearest.clone())
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    File(MemoryLayerFile),
    Broken(String),
}

/// A [`LayerReader`] over in-memory files, keyed by path.
///
/// Paths registered with [`with_broken`](Self::with_broken) fail to open
/// with the given message.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    entries: HashMap<PathBuf, MemoryEntry>,
}

impl MemoryReader {
    /// Create an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, file: MemoryLayerFile) -> Self {
        self.entries.insert(path.into(), MemoryEntry::File(file));
        self
    }

    /// Register a path that fails to parse.
    #[must_use]
    pub fn with_broken(mut self, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        self.entries
            .insert(path.into(), MemoryEntry::Broken(message.into()));
        self
    }

    /// Registered paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl LayerReader for MemoryReader {
    fn open(&self, path: &FsPath) -> ParseResult<Box<dyn LayerFile>> {
        match self.entries.get(path) {
            Some(MemoryEntry::File(file)) => Ok(Box::new(file.clone())),
            Some(MemoryEntry::Broken(message)) => Err(ParseError::invalid_content(message.clone())),
            None => Err(ParseError::FileNotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Height;

    fn file() -> MemoryLayerFile {
        MemoryLayerFile::new(
            "part.clf",
            0.05,
            vec![
                Layer::new(Height::from_mm(2.0), vec![]),
                Layer::new(Height::from_mm(1.0), vec![]),
                Layer::new(Height::from_mm(1.05), vec![]),
            ],
        )
    }

    #[test]
    fn test_layers_sorted_and_range() {
        let f = file();
        assert_eq!(f.layer_heights(), vec![1.0, 1.05, 2.0]);
        assert_eq!(f.z_range(), Some((1.0, 2.0)));
    }

    #[test]
    fn test_layer_at_nearest_within_thickness() {
        let f = file();
        let layer = f.layer_at(1.04).unwrap();
        assert_eq!(layer.z, Height::from_mm(1.05));
        assert!(f.layer_at(1.5).is_none());
        assert!(f.layer_at(5.0).is_none());
    }

    #[test]
    fn test_empty_file_range() {
        let f = MemoryLayerFile::new("empty.clf", 0.05, vec![]);
        assert!(f.z_range().is_none());
        assert!(f.layer_at(1.0).is_none());
    }

    #[test]
    fn test_memory_reader() {
        let reader = MemoryReader::new()
            .with_file("a.clf", file())
            .with_broken("b.clf", "bad header");

        assert_eq!(reader.open(FsPath::new("a.clf")).unwrap().name(), "part.clf");
        let err = reader.open(FsPath::new("b.clf")).err().unwrap();
        assert!(err.to_string().contains("bad header"));
        assert!(matches!(
            reader.open(FsPath::new("c.clf")),
            Err(ParseError::FileNotFound { .. })
        ));
        assert_eq!(reader.paths().len(), 2);
    }
}
