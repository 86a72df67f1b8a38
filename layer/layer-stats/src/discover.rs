//! Build discovery and file exclusion.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::{AggregateError, AggregateResult};

/// Directory under a build that holds the layer files.
pub const MODELS_DIR: &str = "Models";

/// A layer file found in a build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscoveredFile {
    /// Full path.
    pub path: PathBuf,
    /// Folder relative to `Models` (`.` for files directly inside it).
    pub folder: String,
    /// File name.
    pub name: String,
}

impl DiscoveredFile {
    /// Describe a file outside any build layout.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = path
            .parent()
            .and_then(Path::file_name)
            .map_or_else(|| ".".to_string(), |n| n.to_string_lossy().into_owned());
        Self { path, folder, name }
    }

    /// Path relative to `Models`.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        if self.folder == "." {
            PathBuf::from(&self.name)
        } else {
            Path::new(&self.folder).join(&self.name)
        }
    }
}

/// Find every layer file under `<build_dir>/Models`, sorted by path.
///
/// A build without a `Models` directory has no files.
///
/// # Errors
///
/// Returns [`AggregateError::Discovery`] if the directory tree cannot be read.
pub fn discover_build(
    build_dir: &Path,
    extensions: &[String],
) -> AggregateResult<Vec<DiscoveredFile>> {
    let models = build_dir.join(MODELS_DIR);
    if !models.is_dir() {
        warn!(path = %models.display(), "models directory not found");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&models).sort_by_file_name() {
        let entry = entry.map_err(|e| AggregateError::Discovery {
            path: models.clone(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let folder = entry
            .path()
            .parent()
            .and_then(|p| p.strip_prefix(&models).ok())
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        debug!(file = %name, folder = %folder, "found layer file");
        files.push(DiscoveredFile {
            path: entry.into_path(),
            folder,
            name,
        });
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Why `file` is excluded from a run, if it is.
///
/// Folder names are compared with spaces replaced by underscores.
#[must_use]
pub fn exclusion_reason(file: &DiscoveredFile, config: &AnalysisConfig) -> Option<String> {
    if config.exclude_names.iter().any(|n| *n == file.name) {
        return Some(format!("excluded file name {}", file.name));
    }

    let folder = file.folder.replace(' ', "_");
    if let Some(pattern) = config
        .exclude_folders
        .iter()
        .find(|p| !p.is_empty() && folder.contains(p.as_str()))
    {
        return Some(format!("folder {} matches exclusion pattern {pattern}", file.folder));
    }

    if let Some(filter) = &config.files {
        let relative = file.relative_path();
        let selected = filter.iter().any(|f| {
            *f == file.path || *f == relative || f.as_os_str() == file.name.as_str()
        });
        if !selected {
            return Some("not in file filter".to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_sorted_with_folders() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join(MODELS_DIR);
        touch(&models.join("b part/part_b.clf"));
        touch(&models.join("a_part/part_a.CLF"));
        touch(&models.join("top.clf"));
        touch(&models.join("a_part/notes.txt"));

        let files = discover_build(dir.path(), &["clf".to_string()]).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["part_a.CLF", "part_b.clf", "top.clf"]);
        assert_eq!(files[0].folder, "a_part");
        assert_eq!(files[1].folder, "b part");
        assert_eq!(files[2].folder, ".");
        assert_eq!(files[2].relative_path(), PathBuf::from("top.clf"));
    }

    #[test]
    fn test_missing_models_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_build(dir.path(), &["clf".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_exclusions() {
        let config = AnalysisConfig::new(1);
        let support = DiscoveredFile {
            path: PathBuf::from("/b/Models/Part A Supports/x.clf"),
            folder: "Part A Supports".to_string(),
            name: "x.clf".to_string(),
        };
        assert!(exclusion_reason(&support, &config).is_some());

        let wafer = DiscoveredFile::from_path("/b/Models/part/WaferSupport.clf");
        assert!(exclusion_reason(&wafer, &config).unwrap().contains("WaferSupport"));

        let part = DiscoveredFile::from_path("/b/Models/part/gear.clf");
        assert!(exclusion_reason(&part, &config).is_none());
        assert!(exclusion_reason(&part, &config.clone().without_exclusions()).is_none());

        let filtered = config.with_files(["other.clf"]);
        assert_eq!(
            exclusion_reason(&part, &filtered).as_deref(),
            Some("not in file filter")
        );
        let by_relative = AnalysisConfig::new(1).with_files(["part/gear.clf"]);
        assert!(exclusion_reason(&part, &by_relative).is_none());
    }
}
