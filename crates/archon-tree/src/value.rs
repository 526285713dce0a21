use crate::{attribute::Attribute, expr::Expr, position::Position};
use derive_more::Display;
use std::fmt;

///
/// ValueKind
///
/// Kind of a tree value after unification. `Any` is an unconstrained
/// top value; `Struct` and `List` may still hold abstract members.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum ValueKind {
    #[default]
    #[display("_")]
    Any,
    #[display("bool")]
    Bool,
    #[display("float")]
    Float,
    #[display("int")]
    Int,
    #[display("list")]
    List,
    #[display("null")]
    Null,
    #[display("number")]
    Number,
    #[display("string")]
    String,
    #[display("struct")]
    Struct,
}

impl ValueKind {
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Float | Self::Int | Self::Null | Self::Number | Self::String
        )
    }
}

///
/// Scalar
///

#[derive(Clone, Debug, Display, PartialEq)]
pub enum Scalar {
    #[display("null")]
    Null,
    #[display("{_0}")]
    Bool(bool),
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    Float(f64),
    #[display("{_0:?}")]
    Text(String),
}

impl Scalar {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::String,
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
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

///
/// TreeField
///
/// One member of a struct value. Labels are raw: definitions keep their
/// `#` prefix and hidden members their `_` prefix.
///

#[derive(Clone, Copy)]
pub struct TreeField<'a> {
    pub label: &'a str,
    pub optional: bool,
    pub value: &'a dyn ConfigValue,
}

impl TreeField<'_> {
    #[must_use]
    pub fn is_definition(&self) -> bool {
        self.label.starts_with('#')
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.label.starts_with('_')
    }

    /// Label without definition marker or optional/required suffix.
    #[must_use]
    pub fn clean_label(&self) -> &str {
        self.label
            .trim_start_matches('#')
            .trim_end_matches(['?', '!'])
    }
}

impl fmt::Debug for TreeField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeField")
            .field("label", &self.label)
            .field("optional", &self.optional)
            .field("kind", &self.value.kind())
            .finish()
    }
}

///
/// ConfigValue
///
/// Read-only view over one value of the configuration tree. The trait is
/// object safe so a front-end can hand out `&dyn ConfigValue` for any node.
///

pub trait ConfigValue: fmt::Debug {
    fn kind(&self) -> ValueKind;

    /// True for scalars with a value, structs, and lists with known
    /// elements.
    fn is_concrete(&self) -> bool;

    /// Struct members in declaration order, including definitions,
    /// hidden members and optional members.
    fn fields(&self) -> Vec<TreeField<'_>>;

    /// Direct member lookup by raw label.
    fn field(&self, label: &str) -> Option<&dyn ConfigValue>;

    /// Concrete list elements; empty for anything else.
    fn elements(&self) -> Vec<&dyn ConfigValue>;

    /// Element constraint of an open list such as `[...#Item]`.
    fn element_template(&self) -> Option<&dyn ConfigValue>;

    fn as_str(&self) -> Option<&str>;

    fn as_int(&self) -> Option<i64>;

    fn as_bool(&self) -> Option<bool>;

    fn as_float(&self) -> Option<f64>;

    /// Default of a disjunction (`*"draft" | "active"`) or the value
    /// itself when it is a concrete scalar.
    fn default_value(&self) -> Option<&dyn ConfigValue>;

    fn attributes(&self) -> &[Attribute];

    fn position(&self) -> Option<&Position>;

    /// Selector path of a reference (`#Order`, `domain.Order`), if the
    /// value was written as one.
    fn reference(&self) -> Option<&str>;

    /// Constraint expression the value was declared with.
    fn expr(&self) -> Option<&Expr>;

    //
    // provided
    //

    /// Dotted member lookup. An empty path yields `None`.
    fn lookup(&self, path: &str) -> Option<&dyn ConfigValue> {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let mut cur = self.field(segments.next()?)?;
        for seg in segments {
            cur = cur.field(seg)?;
        }

        Some(cur)
    }

    fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().iter().find(|a| a.name == name)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn str_at(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(ConfigValue::as_str)
    }

    /// Trimmed string at `path`, empty when absent or not a string.
    fn string_at(&self, path: &str) -> String {
        self.str_at(path).map(str::trim).unwrap_or_default().to_string()
    }

    fn bool_at(&self, path: &str) -> Option<bool> {
        self.lookup(path).and_then(ConfigValue::as_bool)
    }

    fn int_at(&self, path: &str) -> Option<i64> {
        self.lookup(path).and_then(ConfigValue::as_int)
    }

    #[allow(clippy::cast_precision_loss)]
    fn float_at(&self, path: &str) -> Option<f64> {
        let v = self.lookup(path)?;
        v.as_float().or_else(|| v.as_int().map(|n| n as f64))
    }

    /// String list at `path`. A single string is returned as a one-element
    /// list; non-string elements are skipped.
    fn strings_at(&self, path: &str) -> Vec<String> {
        let Some(v) = self.lookup(path) else {
            return Vec::new();
        };
        if let Some(s) = v.as_str() {
            return vec![s.to_string()];
        }

        v.elements()
            .into_iter()
            .filter_map(ConfigValue::as_str)
            .map(ToString::to_string)
            .collect()
    }

    /// Concrete scalar rendered as a string: text as-is, numbers and
    /// booleans formatted.
    fn scalar_text(&self) -> Option<String> {
        if let Some(s) = self.as_str() {
            return Some(s.to_string());
        }
        if let Some(b) = self.as_bool() {
            return Some(b.to_string());
        }
        if let Some(n) = self.as_int() {
            return Some(n.to_string());
        }

        self.as_float().map(|f| f.to_string())
    }
}
