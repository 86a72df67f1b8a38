//! Exterior/hole classification of multi-path shapes.
//!
//! The exterior of a shape is its largest closed path, whatever the
//! listing order. Another closed path is a hole only when its winding is
//! opposite the exterior's and its centroid lies inside the exterior.
//! Paths failing either check become independent exteriors; a centroid on
//! the exterior edge is ambiguous and reported separately.

use layer_types::{Containment, Identifier, Layer, Path, Point2, Shape, Winding};
use tracing::debug;

use crate::closure::{ClosureMethod, resolve_path};
use crate::error::ClassifyResult;
use crate::params::ClassifyParams;

/// Role of a path after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathRole {
    /// Solid outer boundary.
    Exterior,
    /// Confirmed void inside an exterior.
    Hole,
    /// Open path or zero-area ring; encloses nothing.
    Open,
    /// Containment could not be decided.
    Ambiguous,
}

impl PathRole {
    /// Lowercase tag used in output and render hand-off.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exterior => "exterior",
            Self::Hole => "hole",
            Self::Open => "open",
            Self::Ambiguous => "ambiguous",
        }
    }
}

impl std::fmt::Display for PathRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a path could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ambiguity {
    /// Opposite winding, but the centroid lies on the exterior edge.
    BoundaryContainment,
}

impl Ambiguity {
    /// Tag used in output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BoundaryContainment => "boundary_containment",
        }
    }
}

/// A closure-resolved path with its position in the source shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// Index of the path within its shape.
    pub index: usize,
    /// The resolved path.
    pub path: Path,
    /// How closure was decided.
    pub method: ClosureMethod,
}

impl ResolvedPath {
    /// Build from parts.
    #[must_use]
    pub const fn new(index: usize, path: Path, method: ClosureMethod) -> Self {
        Self {
            index,
            path,
            method,
        }
    }

    /// Enclosed area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.path.area()
    }

    /// Winding of the path.
    #[must_use]
    pub fn winding(&self) -> Winding {
        self.path.winding()
    }

    /// Centroid of the path.
    #[must_use]
    pub fn centroid(&self) -> Option<Point2<f64>> {
        self.path.centroid()
    }
}

/// One exterior with its confirmed holes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedShape {
    /// Identifier of the source shape.
    pub identifier: Option<Identifier>,
    /// The exterior boundary.
    pub exterior: ResolvedPath,
    /// Confirmed holes, in source order.
    pub holes: Vec<ResolvedPath>,
    /// Winding check result for the relationship this shape records.
    pub winding_confirmed: bool,
    /// Containment check result for the relationship this shape records.
    pub containment_confirmed: bool,
    /// Split off the primary exterior because a hole check failed.
    pub promoted: bool,
    /// The exterior was chosen from tied areas by source order.
    pub area_tie: bool,
}

impl ClassifiedShape {
    /// Number of confirmed holes.
    #[must_use]
    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    /// Exterior area minus hole areas.
    #[must_use]
    pub fn net_area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(ResolvedPath::area).sum();
        (self.exterior.area() - holes).max(0.0)
    }
}

/// A path excluded from hole statistics for review.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousPath {
    /// The path.
    pub path: ResolvedPath,
    /// Why it is ambiguous.
    pub reason: Ambiguity,
}

/// Full classification of one source shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeClassification {
    /// Index of the shape within its layer.
    pub shape_index: usize,
    /// Identifier of the shape.
    pub identifier: Option<Identifier>,
    /// Number of paths in the source shape.
    pub path_count: usize,
    /// The primary exterior first, then promoted exteriors in source order.
    pub solids: Vec<ClassifiedShape>,
    /// Open or zero-area paths.
    pub open_paths: Vec<ResolvedPath>,
    /// Paths whose containment was ambiguous.
    pub ambiguous: Vec<AmbiguousPath>,
    /// The exterior was not the first listed path.
    pub exterior_reordered: bool,
    /// Hole count a "every path after the first is a hole" rule would give.
    pub naive_hole_count: usize,
}

impl ShapeClassification {
    /// Whether any closed path was found.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        !self.solids.is_empty()
    }

    /// The largest-area exterior and its holes.
    #[must_use]
    pub fn primary(&self) -> Option<&ClassifiedShape> {
        self.solids.first()
    }

    /// Total confirmed holes across all solids.
    #[must_use]
    pub fn confirmed_holes(&self) -> usize {
        self.solids.iter().map(ClassifiedShape::hole_count).sum()
    }

    /// The exterior was picked from tied areas.
    #[must_use]
    pub fn has_area_tie(&self) -> bool {
        self.solids.iter().any(|s| s.area_tie)
    }

    /// The path-count heuristic disagrees with the confirmed hole count.
    #[must_use]
    pub fn count_mismatch(&self) -> bool {
        self.naive_hole_count != self.confirmed_holes()
    }

    /// Every path with its role, in source order.
    #[must_use]
    pub fn tagged_paths(&self) -> Vec<(PathRole, &ResolvedPath)> {
        let mut tagged: Vec<(PathRole, &ResolvedPath)> = Vec::with_capacity(self.path_count);
        for solid in &self.solids {
            tagged.push((PathRole::Exterior, &solid.exterior));
            tagged.extend(solid.holes.iter().map(|h| (PathRole::Hole, h)));
        }
        tagged.extend(self.open_paths.iter().map(|p| (PathRole::Open, p)));
        tagged.extend(self.ambiguous.iter().map(|a| (PathRole::Ambiguous, &a.path)));
        tagged.sort_by_key(|(_, p)| p.index);
        tagged
    }
}

/// Classify a shape's closure-resolved paths.
///
/// Paths must be in source order. Ties in area are broken toward the
/// earlier path.
#[must_use]
pub fn classify_paths(
    paths: Vec<ResolvedPath>,
    identifier: Option<Identifier>,
    shape_index: usize,
    params: &ClassifyParams,
) -> ShapeClassification {
    let path_count = paths.len();
    let first_index = paths.first().map_or(0, |p| p.index);

    let (candidates, open_paths): (Vec<_>, Vec<_>) = paths
        .into_iter()
        .partition(|p| p.path.is_closed() && p.area() > params.min_solid_area);

    let mut result = ShapeClassification {
        shape_index,
        identifier,
        path_count,
        solids: Vec::new(),
        open_paths,
        ambiguous: Vec::new(),
        exterior_reordered: false,
        naive_hole_count: path_count.saturating_sub(1),
    };

    let Some(exterior_pos) = largest_area_position(&candidates, params) else {
        debug!(shape_index, path_count, "no closed path in shape");
        return result;
    };

    let mut candidates = candidates;
    let exterior = candidates.remove(exterior_pos);
    let exterior_area = exterior.area();
    let tolerance = params.tie_tolerance(exterior_area);
    let area_tie = candidates
        .iter()
        .any(|c| (c.area() - exterior_area).abs() <= tolerance);
    let exterior_winding = exterior.winding();
    result.exterior_reordered = exterior.index != first_index;

    let mut holes = Vec::new();
    let mut promoted = Vec::new();
    for candidate in candidates {
        let opposite = candidate.winding() != exterior_winding;
        let containment = candidate
            .centroid()
            .map_or(Containment::Outside, |c| {
                exterior.path.contains(&c, params.boundary_tolerance)
            });

        match (opposite, containment) {
            (true, Containment::Inside) => holes.push(candidate),
            (true, Containment::Boundary) => result.ambiguous.push(AmbiguousPath {
                path: candidate,
                reason: Ambiguity::BoundaryContainment,
            }),
            (_, containment) => promoted.push(ClassifiedShape {
                identifier,
                exterior: candidate,
                holes: Vec::new(),
                winding_confirmed: opposite,
                containment_confirmed: containment == Containment::Inside,
                promoted: true,
                area_tie: false,
            }),
        }
    }

    let confirmed = !holes.is_empty();
    result.solids.push(ClassifiedShape {
        identifier,
        exterior,
        holes,
        winding_confirmed: confirmed,
        containment_confirmed: confirmed,
        promoted: false,
        area_tie,
    });
    result.solids.extend(promoted);

    debug!(
        shape_index,
        path_count,
        solids = result.solids.len(),
        holes = result.confirmed_holes(),
        ambiguous = result.ambiguous.len(),
        reordered = result.exterior_reordered,
        "classified shape"
    );
    result
}

/// Position of the largest-area candidate; the earliest wins a tie.
fn largest_area_position(candidates: &[ResolvedPath], params: &ClassifyParams) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (pos, candidate) in candidates.iter().enumerate() {
        let area = candidate.area();
        match best {
            Some((_, best_area)) if area <= best_area + params.tie_tolerance(best_area) => {}
            _ => best = Some((pos, area)),
        }
    }
    best.map(|(pos, _)| pos)
}

/// Resolve and classify every path of `shape`.
///
/// # Errors
///
/// Returns an error if a path has non-finite coordinates or an invalid arc.
pub fn classify_shape(
    shape: &Shape,
    shape_index: usize,
    params: &ClassifyParams,
) -> ClassifyResult<ShapeClassification> {
    let paths = shape
        .paths()
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            resolve_path(raw, index, &params.closure)
                .map(|res| ResolvedPath::new(index, res.path, res.method))
        })
        .collect::<ClassifyResult<Vec<_>>>()?;
    Ok(classify_paths(paths, shape.identifier(), shape_index, params))
}

/// Classify every shape of a layer, in layer order.
///
/// # Errors
///
/// Returns the first shape error encountered.
pub fn classify_layer(
    layer: &Layer,
    params: &ClassifyParams,
) -> ClassifyResult<Vec<ShapeClassification>> {
    layer
        .shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| classify_shape(shape, i, params))
        .collect()
}
