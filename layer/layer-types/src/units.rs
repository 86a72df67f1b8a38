//! Height and identifier newtypes.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A layer height in millimetres.
///
/// Heights are totally ordered (via [`f64::total_cmp`]) so they can key
/// sorted maps; this is what makes per-height output deterministic.
#[derive(Debug, Clone, Copy)]
pub struct Height(f64);

impl Height {
    /// Create a height from a value in millimetres.
    #[must_use]
    pub const fn from_mm(mm: f64) -> Self {
        Self(mm)
    }

    /// The height in millimetres.
    #[must_use]
    pub const fn mm(self) -> f64 {
        self.0
    }

    /// Whether the height is a finite number.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl PartialEq for Height {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Height {}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Height {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Height {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}mm", self.0)
    }
}

/// Integer tag grouping the shapes of one physical part across layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(i64);

impl Identifier {
    /// Wrap a raw identifier value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw identifier value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// String key for an optional identifier; shapes without one group under `"none"`.
#[must_use]
pub fn identifier_key(identifier: Option<Identifier>) -> String {
    identifier.map_or_else(|| "none".to_string(), |id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_height_ordering() {
        let heights: BTreeSet<Height> = [3.0, 1.0, 2.5, 1.0]
            .into_iter()
            .map(Height::from_mm)
            .collect();
        let ordered: Vec<f64> = heights.iter().map(|h| h.mm()).collect();
        assert_eq!(ordered, vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_height_display() {
        assert_eq!(Height::from_mm(47.15).to_string(), "47.150mm");
        assert!(!Height::from_mm(f64::NAN).is_finite());
    }

    #[test]
    fn test_identifier_key() {
        assert_eq!(identifier_key(Some(Identifier::new(17))), "17");
        assert_eq!(identifier_key(None), "none");
    }
}
