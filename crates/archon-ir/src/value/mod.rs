
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Metadata
///
/// String-keyed bag of JSON-compatible values attached to IR nodes.
///

pub type Metadata = BTreeMap<String, Value>;

///
/// Value
///
/// Leaf and container values allowed in metadata and attribute arguments.
/// `Opaque` models a host value with no JSON form (a function handle, a
/// channel); it cannot be serialized and the ABI validator rejects it.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    List(Vec<Self>),
    Map(BTreeMap<String, Self>),

    #[serde(skip)]
    Opaque(Opaque),
}

impl Value {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Truthiness used by attribute-driven passes: `true`, `"true"`, non-zero.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => s.eq_ignore_ascii_case("true"),
            Self::Int(i) => *i != 0,
            Self::Uint(u) => *u != 0,
            Self::Null | Self::Float(_) | Self::List(_) | Self::Map(_) | Self::Opaque(_) => false,
        }
    }

    /// Name of the value's kind, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int64",
            Self::Uint(_) => "uint64",
            Self::Float(_) => "float64",
            Self::Text(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Opaque(opaque) => opaque.type_name.as_str(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items.into_iter().map(Self::Text).collect())
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(map: BTreeMap<String, Self>) -> Self {
        Self::Map(map)
    }
}

///
/// Opaque
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Opaque {
    pub type_name: String,
}

impl Opaque {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

///
/// HasMetadata
///
/// Uniform access to the optional metadata slot carried by IR nodes.
/// `metadata_mut` materializes an empty map on first write.
///

pub trait HasMetadata {
    fn metadata(&self) -> Option<&Metadata>;

    fn metadata_slot(&mut self) -> &mut Option<Metadata>;

    fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata_slot().get_or_insert_with(Metadata::new)
    }

    fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata().and_then(|m| m.get(key))
    }

    fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta(key).and_then(Value::as_str)
    }

    fn meta_flag(&self, key: &str) -> bool {
        self.meta(key).is_some_and(Value::is_truthy)
    }

    fn set_meta(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata_mut().insert(key.to_string(), value.into());
    }
}

/// Implement [`HasMetadata`] for structs with a `metadata: Option<Metadata>` field.
#[macro_export]
macro_rules! impl_has_metadata {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::value::HasMetadata for $ty {
                fn metadata(&self) -> Option<&$crate::value::Metadata> {
                    self.metadata.as_ref()
                }

                fn metadata_slot(&mut self) -> &mut Option<$crate::value::Metadata> {
                    &mut self.metadata
                }
            }
        )+
    };
}
