//! Normalization of the output tree into interchange-safe JSON.
//!
//! The run output is first described as a [`Node`] tree. Leaves may be
//! plain primitives or any [`NativeValue`] (heights, identifiers, tags),
//! which [`normalize`] unwraps into its primitive before encoding.
//! Sequences and string-keyed maps are walked recursively. An
//! [`Node::Opaque`] leaf, or a float that JSON cannot carry, fails the
//! whole conversion.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use layer_holes::{Ambiguity, ClosureMethod, PathRole};
use layer_types::{Height, Identifier, Point2, Winding};
use serde_json::{Map, Number, Value};

use crate::error::{SerializationError, SerializationResult};
use crate::unit::FileStatus;

/// A primitive extracted from a wrapped value.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Float; must be finite to encode.
    Float(f64),
    /// String.
    Text(String),
}

/// A value that can report its native primitive.
pub trait NativeValue: fmt::Debug + Send + Sync {
    /// The primitive this value stands for.
    fn native(&self) -> Native;
}

impl NativeValue for Height {
    fn native(&self) -> Native {
        Native::Float(self.mm())
    }
}

impl NativeValue for Identifier {
    fn native(&self) -> Native {
        Native::Int(self.value())
    }
}

impl NativeValue for Winding {
    fn native(&self) -> Native {
        Native::Text(self.as_str().to_string())
    }
}

impl NativeValue for PathRole {
    fn native(&self) -> Native {
        Native::Text(self.as_str().to_string())
    }
}

impl NativeValue for Ambiguity {
    fn native(&self) -> Native {
        Native::Text(self.as_str().to_string())
    }
}

impl NativeValue for ClosureMethod {
    fn native(&self) -> Native {
        let tag = match self {
            Self::Coincident => "coincident",
            Self::CircleFit => "circle_fit",
            Self::ArcSweep => "arc_sweep",
            Self::Open => "open",
        };
        Native::Text(tag.to_string())
    }
}

impl NativeValue for FileStatus {
    fn native(&self) -> Native {
        Native::Text(self.as_str().to_string())
    }
}

impl NativeValue for Duration {
    fn native(&self) -> Native {
        Native::Float(self.as_secs_f64())
    }
}

/// Output tree.
#[derive(Debug)]
pub enum Node {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Float.
    Float(f64),
    /// String.
    Text(String),
    /// Wrapped value, unwrapped on normalization.
    Native(Box<dyn NativeValue>),
    /// Ordered sequence.
    Seq(Vec<Node>),
    /// String-keyed mapping.
    Map(BTreeMap<String, Node>),
    /// A value of a type with no native form; never encodable.
    Opaque(&'static str),
}

impl Node {
    /// Wrap a native-capable value.
    pub fn native(value: impl NativeValue + 'static) -> Self {
        Self::Native(Box::new(value))
    }

    /// Stand-in for a value of type `T` that has no native form.
    #[must_use]
    pub fn opaque<T: ?Sized>() -> Self {
        Self::Opaque(std::any::type_name::<T>())
    }

    /// A point as `[x, y]`.
    #[must_use]
    pub fn point(p: &Point2<f64>) -> Self {
        Self::Seq(vec![Self::Float(p.x), Self::Float(p.y)])
    }

    /// An empty map.
    #[must_use]
    pub const fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Add `key` to a map node.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `self` is not a map; release builds leave it
    /// unchanged.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Self>) -> Self {
        debug_assert!(
            matches!(self, Self::Map(_)),
            "Node::with called on a non-map node"
        );
        if let Self::Map(entries) = &mut self {
            entries.insert(key.to_string(), value.into());
        }
        self
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Node {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<usize> for Node {
    fn from(v: usize) -> Self {
        Self::UInt(u64::try_from(v).unwrap_or(u64::MAX))
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<Self>> for Node {
    fn from(v: Vec<Self>) -> Self {
        Self::Seq(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Node {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Convert a tree to JSON.
///
/// # Errors
///
/// Returns [`SerializationError::UnsupportedType`] for an opaque leaf and
/// [`SerializationError::NonFinite`] for NaN or infinite floats.
pub fn normalize(node: &Node) -> SerializationResult<Value> {
    normalize_at(node, "$")
}

fn normalize_at(node: &Node, location: &str) -> SerializationResult<Value> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Int(i) => Value::from(*i),
        Node::UInt(u) => Value::from(*u),
        Node::Float(f) => float(*f, location)?,
        Node::Text(s) => Value::String(s.clone()),
        Node::Native(value) => match value.native() {
            Native::Bool(b) => Value::Bool(b),
            Native::Int(i) => Value::from(i),
            Native::UInt(u) => Value::from(u),
            Native::Float(f) => float(f, location)?,
            Native::Text(s) => Value::String(s),
        },
        Node::Seq(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| normalize_at(item, &format!("{location}[{i}]")))
                .collect::<SerializationResult<Vec<_>>>()?,
        ),
        Node::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), normalize_at(value, &format!("{location}.{key}"))?);
            }
            Value::Object(map)
        }
        Node::Opaque(type_name) => {
            return Err(SerializationError::UnsupportedType {
                type_name: *type_name,
                location: location.to_string(),
            });
        }
    })
}

fn float(value: f64, location: &str) -> SerializationResult<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| SerializationError::NonFinite {
            value,
            location: location.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_values_are_unwrapped() {
        let node = Node::map()
            .with("z", Node::native(Height::from_mm(1.25)))
            .with("id", Node::native(Identifier::new(42)))
            .with("winding", Node::native(Winding::Clockwise))
            .with("status", Node::native(FileStatus::Excluded))
            .with("centroid", Node::point(&Point2::new(1.0, -2.5)))
            .with("missing", None::<f64>)
            .with("tags", vec![Node::from("a"), Node::from(3_usize)]);

        let value = normalize(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "z": 1.25,
                "id": 42,
                "winding": "CW",
                "status": "excluded",
                "centroid": [1.0, -2.5],
                "missing": null,
                "tags": ["a", 3],
            })
        );
    }

    #[test]
    fn test_opaque_leaf_is_fatal() {
        struct Handle;
        let node = Node::map().with(
            "per_file",
            vec![Node::map().with("reader", Node::opaque::<Handle>())],
        );
        let err = normalize(&node).unwrap_err();
        match err {
            SerializationError::UnsupportedType {
                type_name,
                location,
            } => {
                assert!(type_name.ends_with("Handle"));
                assert_eq!(location, "$.per_file[0].reader");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Node::with called on a non-map node")]
    fn test_with_on_sequence_panics() {
        let _ = Node::Seq(Vec::new()).with("key", 1_i64);
    }

    #[test]
    fn test_non_finite_float_is_fatal() {
        let node = Node::map().with("area", Node::native(Height::from_mm(f64::NAN)));
        assert!(matches!(
            normalize(&node),
            Err(SerializationError::NonFinite { .. })
        ));
        assert!(normalize(&Node::Float(f64::INFINITY)).is_err());
    }
}
