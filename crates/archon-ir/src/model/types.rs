use crate::model::Field;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// TypeKind
///
/// Closed set of IR type kinds. Anything outside the set survives
/// deserialization as `Other` so the semantic validator can report it.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
#[remain::sorted]
pub enum TypeKind {
    Any,
    Bool,
    Entity,
    Enum,
    File,
    Float,
    Int,
    Int64,
    Json,
    List,
    Map,
    Other(String),
    #[default]
    String,
    Time,
    Uuid,
}

impl TypeKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Entity => "entity",
            Self::Enum => "enum",
            Self::File => "file",
            Self::Float => "float",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Json => "json",
            Self::List => "list",
            Self::Map => "map",
            Self::Other(raw) => raw.as_str(),
            Self::String => "string",
            Self::Time => "time",
            Self::Uuid => "uuid",
        }
    }

    /// Scalar kinds need no further structure to be well-formed.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Any
                | Self::Bool
                | Self::Enum
                | Self::File
                | Self::Float
                | Self::Int
                | Self::Int64
                | Self::Json
                | Self::String
                | Self::Time
                | Self::Uuid
        )
    }
}

impl From<String> for TypeKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<&str> for TypeKind {
    fn from(raw: &str) -> Self {
        match raw {
            "any" => Self::Any,
            "bool" => Self::Bool,
            "entity" => Self::Entity,
            "enum" => Self::Enum,
            "file" => Self::File,
            "float" => Self::Float,
            "int" => Self::Int,
            "int64" => Self::Int64,
            "json" => Self::Json,
            "list" => Self::List,
            "map" => Self::Map,
            "string" => Self::String,
            "time" => Self::Time,
            "uuid" => Self::Uuid,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<TypeKind> for String {
    fn from(kind: TypeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// TypeRef
///
/// List requires `item`; map requires both `key` and `item`; entity requires
/// `name`. Inline fields describe anonymous list items synthesized by the
/// normalizer.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TypeRef {
    pub kind: TypeKind,
    pub name: String,
    pub item: Option<Box<Self>>,
    pub key: Option<Box<Self>>,
    pub inline_fields: Vec<Field>,
}

impl TypeRef {
    #[must_use]
    pub fn scalar(kind: TypeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Entity,
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn list(item: Self) -> Self {
        Self {
            kind: TypeKind::List,
            item: Some(Box::new(item)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn map(key: Self, item: Self) -> Self {
        Self {
            kind: TypeKind::Map,
            key: Some(Box::new(key)),
            item: Some(Box::new(item)),
            ..Self::default()
        }
    }

    /// Whether this type (or its list item) is a list.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.kind == TypeKind::List
    }
}
