use crate::{
    flow::FlowStep,
    impl_has_metadata,
    model::{Attribute, Entity, Field},
    value::Metadata,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Service
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Service {
    pub name: String,
    pub description: String,
    pub methods: Vec<Method>,
    pub publishes: Vec<String>,

    /// event -> handler method
    pub subscribes: BTreeMap<String, String>,
    pub uses: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    pub requires_sql: bool,
    pub requires_mongo: bool,
    pub requires_redis: bool,
    pub requires_nats: bool,
    pub requires_s3: bool,

    pub metadata: Option<Metadata>,
    pub source: String,
}

impl Service {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

///
/// Method
///
/// `input` and `output` are anonymous aggregates owned by the method.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Method {
    pub name: String,
    pub description: String,
    pub input: Entity,
    pub output: Entity,
    pub sources: Vec<Source>,
    pub cache_ttl: String,
    pub cache_tags: Vec<String>,
    pub throws: Vec<String>,
    pub publishes: Vec<String>,
    pub broadcasts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    pub idempotent: bool,
    pub dedupe_key: String,
    pub outbox: bool,

    #[serde(rename = "impl", skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Impl>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flow: Vec<FlowStep>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    pub metadata: Option<Metadata>,
    pub source: String,
}

impl Method {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

///
/// Source
///
/// Where a method reads or writes its data.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Source {
    pub name: String,

    /// `sql`, `mongo`, `redis`, `s3` or `external`.
    pub kind: String,
    pub entity: String,
    pub collection: String,
    pub query: BTreeMap<String, String>,
    pub filter: BTreeMap<String, String>,
    pub metadata: Option<Metadata>,
}

///
/// Pagination
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Pagination {
    /// `offset` or `cursor`.
    #[serde(rename = "type")]
    pub kind: String,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Pagination {
    /// Inferred for list-returning methods that declare nothing.
    #[must_use]
    pub fn offset_default() -> Self {
        Self {
            kind: "offset".to_string(),
            default_limit: 20,
            max_limit: 100,
        }
    }
}

///
/// Impl
///
/// Inline implementation code attached to a method.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Impl {
    pub lang: String,
    pub code: String,
    pub imports: Vec<String>,
    pub requires_tx: bool,
    pub flow_first_bypass: bool,
    pub flow_first_bypass_reason: String,
}

///
/// Event
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Event {
    pub name: String,
    pub fields: Vec<Field>,
    pub metadata: Option<Metadata>,
    pub source: String,
}

///
/// ErrorDef
///
/// A business error with its wire code and HTTP status.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct ErrorDef {
    pub name: String,
    pub code: i64,
    pub http_status: i64,
    pub message: String,
    pub source: String,
}

///
/// Schedule
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Schedule {
    pub name: String,
    pub service: String,
    pub action: String,

    /// cron expression
    pub at: String,

    /// duration
    pub every: String,
    pub publish: String,
    pub payload: Vec<Field>,
}

impl_has_metadata!(Service, Method, Source, Event);
