//! Closure and classification parameters and presets.

use crate::error::{ClassifyError, ClassifyResult};

/// Parameters for deciding whether a raw path is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureParams {
    /// First and last point closer than this (mm) close the path outright.
    pub endpoint_tolerance: f64,

    /// Largest angular gap (degrees) a near-circular path may have and
    /// still count as closed. The default of 7° means coverage ≥ 353°.
    pub max_gap_deg: f64,

    /// Radius standard deviation allowed, as a fraction of the radius.
    pub max_relative_radius_std: f64,

    /// Points within this distance (mm) of one line make the path collinear.
    pub collinear_tolerance: f64,
}

impl Default for ClosureParams {
    fn default() -> Self {
        Self {
            endpoint_tolerance: 1e-3,
            max_gap_deg: 7.0,
            max_relative_radius_std: 0.01,
            collinear_tolerance: 1e-9,
        }
    }
}

impl ClosureParams {
    /// Only accept endpoint closure; the circle fit never closes a path.
    #[must_use]
    pub fn endpoints_only() -> Self {
        Self {
            max_gap_deg: 0.0,
            max_relative_radius_std: 0.0,
            ..Self::default()
        }
    }

    /// Minimum angular coverage (degrees) for circle-fit closure.
    #[must_use]
    pub fn min_coverage_deg(&self) -> f64 {
        360.0 - self.max_gap_deg
    }

    /// Set the endpoint tolerance.
    #[must_use]
    pub const fn with_endpoint_tolerance(mut self, tolerance: f64) -> Self {
        self.endpoint_tolerance = tolerance;
        self
    }

    /// Set the largest angular gap for circle-fit closure.
    #[must_use]
    pub const fn with_max_gap_deg(mut self, gap: f64) -> Self {
        self.max_gap_deg = gap;
        self
    }

    /// Check that every tolerance is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> ClassifyResult<()> {
        check_non_negative("endpoint_tolerance", self.endpoint_tolerance)?;
        check_non_negative("collinear_tolerance", self.collinear_tolerance)?;
        check_non_negative("max_relative_radius_std", self.max_relative_radius_std)?;
        check_non_negative("max_gap_deg", self.max_gap_deg)?;
        if self.max_gap_deg >= 360.0 {
            return Err(ClassifyError::invalid_params(format!(
                "max_gap_deg must be below 360, got {}",
                self.max_gap_deg
            )));
        }
        Ok(())
    }
}

/// Parameters for exterior/hole classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyParams {
    /// Closure resolution parameters.
    pub closure: ClosureParams,

    /// Relative tolerance under which two areas count as tied.
    pub area_tie_tolerance: f64,

    /// A hole centroid within this distance (mm) of the exterior edge is
    /// boundary-ambiguous.
    pub boundary_tolerance: f64,

    /// Closed paths enclosing less than this (mm²) are treated as open.
    pub min_solid_area: f64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            closure: ClosureParams::default(),
            area_tie_tolerance: 1e-9,
            boundary_tolerance: 1e-6,
            min_solid_area: 1e-9,
        }
    }
}

impl ClassifyParams {
    /// Set the closure parameters.
    #[must_use]
    pub fn with_closure(mut self, closure: ClosureParams) -> Self {
        self.closure = closure;
        self
    }

    /// Set the boundary tolerance.
    #[must_use]
    pub const fn with_boundary_tolerance(mut self, tolerance: f64) -> Self {
        self.boundary_tolerance = tolerance;
        self
    }

    /// Absolute tie tolerance for a given reference area.
    #[must_use]
    pub fn tie_tolerance(&self, area: f64) -> f64 {
        self.area_tie_tolerance * area.abs().max(1.0)
    }

    /// Check that every tolerance is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> ClassifyResult<()> {
        self.closure.validate()?;
        check_non_negative("area_tie_tolerance", self.area_tie_tolerance)?;
        check_non_negative("boundary_tolerance", self.boundary_tolerance)?;
        check_non_negative("min_solid_area", self.min_solid_area)
    }
}

fn check_non_negative(name: &str, value: f64) -> ClassifyResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ClassifyError::invalid_params(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ClosureParams::default();
        assert!((params.min_coverage_deg() - 353.0).abs() < f64::EPSILON);
        assert!(params.validate().is_ok());
        assert!(ClassifyParams::default().validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let params = ClosureParams::default()
            .with_endpoint_tolerance(0.01)
            .with_max_gap_deg(10.0);
        assert!((params.endpoint_tolerance - 0.01).abs() < f64::EPSILON);
        assert!((params.min_coverage_deg() - 350.0).abs() < f64::EPSILON);

        let strict = ClosureParams::endpoints_only();
        assert!((strict.min_coverage_deg() - 360.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let params = ClosureParams::default().with_max_gap_deg(400.0);
        assert!(params.validate().is_err());

        let params = ClassifyParams::default().with_boundary_tolerance(f64::NAN);
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("boundary_tolerance"));
    }

    #[test]
    fn test_tie_tolerance_scales() {
        let params = ClassifyParams::default();
        assert!(params.tie_tolerance(1000.0) > params.tie_tolerance(0.5));
        assert!((params.tie_tolerance(0.5) - 1e-9).abs() < f64::EPSILON);
    }
}
