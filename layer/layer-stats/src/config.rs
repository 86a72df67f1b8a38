//! Analysis configuration.
//!
//! An [`AnalysisConfig`] can be built in code with the `with_*` methods or
//! loaded from TOML:
//!
//! ```toml
//! build_id = 271
//! build_dir = "/data/builds/271"
//! heights = [1.5, 12.0]
//! scan_interval = 0.5
//! identifiers = [3, 4]
//!
//! [classify]
//! max_gap_deg = 5.0
//! ```
//!
//! [`AnalysisConfig::validate`] runs before any file is opened.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use layer_holes::{ClassifyParams, ClosureParams};
use layer_types::{Height, Identifier};
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Folder name fragments whose files are skipped by default.
pub const DEFAULT_EXCLUDE_FOLDERS: &[&str] = &[
    "_Support", "supports", "SUPPORTS", "Supports", "ebm-ti64", "Porous", "Cylinder", "Support",
    "Coupon", "s_Skin",
];

/// File names skipped by default.
pub const DEFAULT_EXCLUDE_NAMES: &[&str] = &["WaferSupport.clf"];

/// Per-unit timeout used when none is configured.
pub const DEFAULT_UNIT_TIMEOUT_SECS: f64 = 300.0;

/// Finest accepted scan interval in mm.
pub const MIN_SCAN_INTERVAL: f64 = 1e-3;

/// Configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Build identifier, used in the artifact name.
    pub build_id: u64,

    /// Build directory; layer files are discovered under `<build_dir>/Models`.
    pub build_dir: Option<PathBuf>,

    /// Directory the artifact is written to.
    pub output_dir: PathBuf,

    /// Explicit heights to analyze (mm).
    pub heights: Vec<f64>,

    /// Scan each file from its lowest to highest layer at this step (mm).
    pub scan_interval: Option<f64>,

    /// Only shapes with these identifiers are analyzed.
    pub identifiers: Option<BTreeSet<i64>>,

    /// Only these files are analyzed. Entries match a full path, a path
    /// relative to `Models`, or a bare file name.
    pub files: Option<BTreeSet<PathBuf>>,

    /// Files under a folder containing any of these fragments are excluded.
    pub exclude_folders: Vec<String>,

    /// Files with these exact names are excluded.
    pub exclude_names: Vec<String>,

    /// Layer file extensions picked up by discovery.
    pub extensions: Vec<String>,

    /// Render all files into one combined view instead of one per file.
    pub composite_view: bool,

    /// Upper bound on worker threads.
    pub max_workers: Option<usize>,

    /// Seconds a unit may run before it is recorded as timed out.
    pub unit_timeout_secs: f64,

    /// Closure and classification tolerances.
    pub classify: ClassifySettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            build_id: 0,
            build_dir: None,
            output_dir: PathBuf::from("."),
            heights: Vec::new(),
            scan_interval: None,
            identifiers: None,
            files: None,
            exclude_folders: DEFAULT_EXCLUDE_FOLDERS.iter().map(|s| (*s).to_string()).collect(),
            exclude_names: DEFAULT_EXCLUDE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            extensions: vec!["clf".to_string()],
            composite_view: false,
            max_workers: None,
            unit_timeout_secs: DEFAULT_UNIT_TIMEOUT_SECS,
            classify: ClassifySettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Default configuration for `build_id`.
    #[must_use]
    pub fn new(build_id: u64) -> Self {
        Self {
            build_id,
            ..Self::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Set the explicit heights.
    #[must_use]
    pub fn with_heights(mut self, heights: impl IntoIterator<Item = f64>) -> Self {
        self.heights = heights.into_iter().collect();
        self
    }

    /// Set the scan interval.
    #[must_use]
    pub const fn with_scan_interval(mut self, interval: f64) -> Self {
        self.scan_interval = Some(interval);
        self
    }

    /// Restrict analysis to these identifiers.
    #[must_use]
    pub fn with_identifiers(mut self, identifiers: impl IntoIterator<Item = i64>) -> Self {
        self.identifiers = Some(identifiers.into_iter().collect());
        self
    }

    /// Restrict analysis to these files.
    #[must_use]
    pub fn with_files<P: Into<PathBuf>>(mut self, files: impl IntoIterator<Item = P>) -> Self {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Set the build directory.
    #[must_use]
    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Cap the number of worker threads.
    #[must_use]
    pub const fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Set the per-unit timeout.
    #[must_use]
    pub const fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the composite-view toggle.
    #[must_use]
    pub const fn with_composite_view(mut self, composite: bool) -> Self {
        self.composite_view = composite;
        self
    }

    /// Disable folder and name exclusions.
    #[must_use]
    pub fn without_exclusions(mut self) -> Self {
        self.exclude_folders.clear();
        self.exclude_names.clear();
        self
    }

    /// Set the discovered file extensions.
    #[must_use]
    pub fn with_extensions<S: Into<String>>(
        mut self,
        extensions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Check every value before a run.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(&value) = self.heights.iter().find(|h| !h.is_finite() || **h < 0.0) {
            return Err(ConfigError::InvalidHeight { value });
        }
        if let Some(value) = self.scan_interval {
            if !value.is_finite() || value < MIN_SCAN_INTERVAL {
                return Err(ConfigError::InvalidInterval { value });
            }
        }
        if self.heights.is_empty() && self.scan_interval.is_none() {
            return Err(ConfigError::NoHeights);
        }
        if !self.unit_timeout_secs.is_finite() || self.unit_timeout_secs <= 0.0 {
            return Err(ConfigError::InvalidTimeout {
                seconds: self.unit_timeout_secs,
            });
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::InvalidWorkers);
        }
        if let Some(&value) = self
            .identifiers
            .iter()
            .flatten()
            .find(|id| **id < 0)
        {
            return Err(ConfigError::InvalidIdentifier { value });
        }
        if self
            .files
            .iter()
            .flatten()
            .any(|f| f.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyFileFilter);
        }
        self.classify_params().validate()?;
        Ok(())
    }

    /// Explicit heights, sorted and deduplicated.
    #[must_use]
    pub fn requested_heights(&self) -> Vec<Height> {
        let mut heights: Vec<Height> = self.heights.iter().copied().map(Height::from_mm).collect();
        heights.sort();
        heights.dedup();
        heights
    }

    /// Identifier inclusion filter.
    #[must_use]
    pub fn identifier_filter(&self) -> Option<BTreeSet<Identifier>> {
        self.identifiers
            .as_ref()
            .map(|ids| ids.iter().copied().map(Identifier::new).collect())
    }

    /// Per-unit timeout.
    #[must_use]
    pub fn unit_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.unit_timeout_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_UNIT_TIMEOUT_SECS))
    }

    /// Classification parameters.
    #[must_use]
    pub fn classify_params(&self) -> ClassifyParams {
        self.classify.to_params()
    }

    /// Where the artifact is written.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("build-{}-analysis.json", self.build_id))
    }
}

/// Serializable subset of [`ClassifyParams`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifySettings {
    /// See [`ClosureParams::endpoint_tolerance`].
    pub endpoint_tolerance: f64,
    /// See [`ClosureParams::max_gap_deg`].
    pub max_gap_deg: f64,
    /// See [`ClosureParams::max_relative_radius_std`].
    pub max_relative_radius_std: f64,
    /// See [`ClassifyParams::area_tie_tolerance`].
    pub area_tie_tolerance: f64,
    /// See [`ClassifyParams::boundary_tolerance`].
    pub boundary_tolerance: f64,
    /// See [`ClassifyParams::min_solid_area`].
    pub min_solid_area: f64,
}

impl Default for ClassifySettings {
    fn default() -> Self {
        let params = ClassifyParams::default();
        Self {
            endpoint_tolerance: params.closure.endpoint_tolerance,
            max_gap_deg: params.closure.max_gap_deg,
            max_relative_radius_std: params.closure.max_relative_radius_std,
            area_tie_tolerance: params.area_tie_tolerance,
            boundary_tolerance: params.boundary_tolerance,
            min_solid_area: params.min_solid_area,
        }
    }
}

impl ClassifySettings {
    /// Convert to classification parameters.
    #[must_use]
    pub fn to_params(&self) -> ClassifyParams {
        let closure = ClosureParams {
            endpoint_tolerance: self.endpoint_tolerance,
            max_gap_deg: self.max_gap_deg,
            max_relative_radius_std: self.max_relative_radius_std,
            ..ClosureParams::default()
        };
        ClassifyParams {
            closure,
            area_tie_tolerance: self.area_tie_tolerance,
            boundary_tolerance: self.boundary_tolerance,
            min_solid_area: self.min_solid_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!((config.unit_timeout_secs - 300.0).abs() < f64::EPSILON);
        assert_eq!(config.exclude_names, vec!["WaferSupport.clf".to_string()]);
        assert!(config.exclude_folders.iter().any(|f| f == "_Support"));
        assert_eq!(config.classify_params(), ClassifyParams::default());
        // No heights yet.
        assert!(matches!(config.validate(), Err(ConfigError::NoHeights)));
    }

    #[test]
    fn test_from_toml() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            build_id = 271
            heights = [12.0, 1.5, 12.0]
            scan_interval = 0.5
            identifiers = [4, 3]
            composite_view = true

            [classify]
            max_gap_deg = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config.build_id, 271);
        assert!(config.composite_view);
        assert_eq!(
            config.requested_heights(),
            vec![Height::from_mm(1.5), Height::from_mm(12.0)]
        );
        let ids = config.identifier_filter().unwrap();
        assert!(ids.contains(&Identifier::new(3)));
        assert!((config.classify_params().closure.min_coverage_deg() - 355.0).abs() < 1e-12);
        assert!(config.validate().is_ok());
        assert!(config.artifact_path().ends_with("build-271-analysis.json"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = AnalysisConfig::from_toml_str("hieghts = [1.0]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rules() {
        let base = AnalysisConfig::new(1).with_heights([1.0]);
        assert!(base.validate().is_ok());

        let cases = [
            base.clone().with_heights([f64::NAN]),
            base.clone().with_heights([-0.5]),
            base.clone().with_scan_interval(0.0),
            base.clone().with_scan_interval(f64::MIN_POSITIVE),
            base.clone().with_scan_interval(1e-9),
            base.clone().with_max_workers(0),
            base.clone().with_identifiers([2, -1]),
            base.clone().with_files([""]),
            base.clone().with_unit_timeout(Duration::ZERO),
        ];
        for config in &cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }

        let mut bad_classify = base;
        bad_classify.classify.max_gap_deg = 360.0;
        assert!(matches!(
            bad_classify.validate(),
            Err(ConfigError::Classify(_))
        ));
    }

    #[test]
    fn test_interval_alone_is_enough() {
        let config = AnalysisConfig::new(1).with_scan_interval(0.25);
        assert!(config.validate().is_ok());
        let finest = AnalysisConfig::new(1).with_scan_interval(MIN_SCAN_INTERVAL);
        assert!(finest.validate().is_ok());
        assert!(config.requested_heights().is_empty());
    }
}
