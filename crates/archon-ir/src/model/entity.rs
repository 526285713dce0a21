use crate::{
    impl_has_metadata,
    model::TypeRef,
    value::{Metadata, Value},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Entity
///
/// A domain aggregate. Method request/response aggregates reuse this shape
/// but live on the method rather than in `Schema::entities`.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Entity {
    pub name: String,
    pub description: String,

    /// Owning service name; empty for shared entities.
    pub owner: String,
    pub fields: Vec<Field>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsm: Option<Fsm>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    pub ui: EntityUi,
    pub metadata: Option<Metadata>,
    pub source: String,
}

impl Entity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether the normalizer flagged this entity as transport-only.
    #[must_use]
    pub fn is_dto(&self) -> bool {
        use crate::value::HasMetadata;
        self.meta_flag("dto")
    }
}

///
/// EntityUi
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct EntityUi {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crud: Option<CrudConfig>,
}

///
/// CrudConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct CrudConfig {
    pub enabled: bool,
    pub custom: bool,
    pub views: BTreeMap<String, bool>,
    pub perms: BTreeMap<String, String>,
}

///
/// Field
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Field {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub optional: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    pub is_secret: bool,
    pub is_pii: bool,

    /// Transport/UI-only field; not part of the domain model.
    pub skip_domain: bool,

    pub validate_tag: String,
    pub env_var: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_meta: Option<FileMeta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<FieldUi>,

    pub metadata: Option<Metadata>,
    pub source: String,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// A field is required unless optional or its validator says otherwise.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.optional
            || self
                .validate_tag
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case("required"))
    }
}

///
/// Attribute
///
/// A name plus keyed arguments. A bare argument is stored as a `true`
/// flag under its own text; the first one is also kept under `"_"`.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Attribute {
    pub name: String,
    pub args: BTreeMap<String, Value>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    #[must_use]
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arg(key).and_then(Value::as_str)
    }

    /// Argument text with surrounding quotes removed.
    #[must_use]
    pub fn arg_text(&self, key: &str) -> Option<&str> {
        self.arg_str(key).map(|s| s.trim().trim_matches('"'))
    }

    #[must_use]
    pub fn arg_flag(&self, key: &str) -> bool {
        self.arg(key).is_some_and(Value::is_truthy)
    }
}

///
/// Constraints
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u64>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub regex: String,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl Constraints {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

///
/// FileMeta
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct FileMeta {
    /// `file` or `image`.
    pub kind: String,
    pub thumbnail: bool,
}

///
/// FieldUi
///
/// Presentation hints read from `@ui(...)`. Enumerated string hints are
/// checked by the semantic validator, not here.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct FieldUi {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub placeholder: String,
    pub helper_text: String,
    pub order: i64,
    pub hidden: bool,
    pub disabled: bool,
    pub full_width: bool,
    pub rows: i64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub currency: String,
    pub source: String,
    pub options: Vec<String>,
    pub multiple: bool,
    pub accept: String,
    pub max_size: i64,
    pub component: String,
    pub columns: i64,
    pub importance: String,
    pub input_kind: String,
    pub intent: String,
    pub density: String,
    pub label_mode: String,
    pub surface: String,
}

///
/// Fsm
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Fsm {
    pub field: String,
    pub states: Vec<String>,

    /// from-state -> to-states
    pub transitions: BTreeMap<String, Vec<String>>,
}

impl Fsm {
    /// Transition targets or sources that are not declared states.
    #[must_use]
    pub fn undeclared_states(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .transitions
            .iter()
            .flat_map(|(from, to)| std::iter::once(from).chain(to.iter()))
            .filter(|state| !self.states.contains(state))
            .cloned()
            .collect();
        out.sort();
        out.dedup();

        out
    }
}

///
/// Index
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
}

impl_has_metadata!(Entity, Field);
