//! Normalizer definitions: the tree's content in a flat, typed form before
//! IR assembly. Types the IR already models exactly (sources, pagination,
//! repositories, auth, notifications) are reused as-is.

use archon_ir::{
    flow::FlowStep,
    impl_has_metadata,
    model::{
        Attribute, Auth, CircuitBreaker, Constraints, CrudConfig, ErrorDef, FieldUi, FileMeta,
        Fsm, Impl, Index, NotificationChannels, NotificationMuting, NotificationPolicies,
        Pagination, Project, RateLimit, Rbac, Repository, RetryPolicy, Slo, Source, Target,
        Template, TestHints, TypeRef, View,
    },
    value::{HasMetadata, Metadata},
};
use std::collections::BTreeMap;

///
/// DbMeta
///
/// `@db(type=..., primary_key, unique, index)`.
///

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbMeta {
    pub sql_type: String,
    pub primary_key: bool,
    pub unique: bool,
    pub index: bool,
}

impl DbMeta {
    pub const DEFAULT_SQL_TYPE: &str = "TEXT";
}

impl Default for DbMeta {
    fn default() -> Self {
        Self {
            sql_type: Self::DEFAULT_SQL_TYPE.to_string(),
            primary_key: false,
            unique: false,
            index: false,
        }
    }
}

///
/// FieldDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,

    /// Concrete scalar default, rendered as text; empty when none.
    pub default: String,
    pub db: DbMeta,
    pub validate_tag: String,
    pub env_var: String,
    pub is_secret: bool,
    pub is_pii: bool,
    pub skip_domain: bool,

    /// Synthesized item entity of an inline list (`<Owner><Field>Item`).
    pub item_type_name: String,
    pub item_fields: Vec<Self>,

    pub constraints: Option<Constraints>,
    pub file_meta: Option<FileMeta>,
    pub ui: Option<FieldUi>,

    /// Every attribute as written; hooks dispatch on these.
    pub attributes: Vec<Attribute>,
    pub metadata: Option<Metadata>,
    pub source: String,
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        self.ty.is_list()
    }
}

///
/// EntityDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityDef {
    pub name: String,
    pub description: String,
    pub owner: String,
    pub fields: Vec<FieldDef>,
    pub fsm: Option<Fsm>,
    pub indexes: Vec<Index>,
    pub attributes: Vec<Attribute>,
    pub crud: Option<CrudConfig>,
    pub metadata: Option<Metadata>,
    pub source: String,
}

impl EntityDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn is_dto(&self) -> bool {
        self.meta_flag("dto")
    }

    #[must_use]
    pub fn has_list_field(&self) -> bool {
        self.fields.iter().any(FieldDef::is_list)
    }
}

///
/// MethodDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub description: String,
    pub input: EntityDef,
    pub output: EntityDef,
    pub sources: Vec<Source>,
    pub cache_ttl: String,
    pub cache_tags: Vec<String>,
    pub throws: Vec<String>,
    pub publishes: Vec<String>,
    pub broadcasts: Vec<String>,
    pub pagination: Option<Pagination>,
    pub idempotent: bool,
    pub dedupe_key: String,
    pub outbox: bool,
    pub implementation: Option<Impl>,
    pub flow: Vec<FlowStep>,
    pub attributes: Vec<Attribute>,
    pub metadata: Option<Metadata>,
    pub source: String,
}

impl MethodDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the operation declared an output block.
    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.output.name.is_empty()
    }
}

///
/// ServiceDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceDef {
    pub name: String,
    pub description: String,
    pub methods: Vec<MethodDef>,
    pub publishes: Vec<String>,
    pub subscribes: BTreeMap<String, String>,
    pub uses: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub requires_sql: bool,
    pub requires_mongo: bool,
    pub requires_redis: bool,
    pub requires_nats: bool,
    pub requires_s3: bool,
    pub metadata: Option<Metadata>,
    pub source: String,
}

impl ServiceDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

///
/// EndpointDef
///
/// Flat endpoint record; auth and SLO are grouped only at assembly.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EndpointDef {
    pub method: String,
    pub path: String,
    pub service: String,
    pub rpc: String,
    pub description: String,
    pub messages: Vec<String>,
    pub room_param: String,
    pub auth_type: String,
    pub permission: String,
    pub auth_roles: Vec<String>,
    pub auth_check: String,
    pub auth_inject: Vec<String>,
    pub cache_ttl: String,
    pub cache_tags: Vec<String>,
    pub invalidate: Vec<String>,
    pub optimistic_update: String,
    pub rate_limit: Option<RateLimit>,
    pub circuit_breaker: Option<CircuitBreaker>,
    pub retry: Option<RetryPolicy>,
    pub timeout: String,
    pub max_body_size: i64,
    pub idempotent: bool,
    pub dedupe_key: String,
    pub errors: Vec<String>,
    pub pagination: Option<Pagination>,
    pub view: String,
    pub slo: Slo,
    pub test_hints: Option<TestHints>,
    pub metadata: Option<Metadata>,
    pub source: String,
}

impl EndpointDef {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }
}

///
/// EventDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub metadata: Option<Metadata>,
    pub source: String,
}

///
/// ConfigDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigDef {
    pub fields: Vec<FieldDef>,
}

///
/// ScheduleDef
///

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleDef {
    pub name: String,
    pub service: String,
    pub action: String,
    pub at: String,
    pub every: String,
    pub publish: String,
    pub payload: Vec<PayloadField>,
}

///
/// PayloadField
///
/// Literal schedule payload entry; `ty` is `int`, `bool` or `string`.
///

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PayloadField {
    pub name: String,
    pub ty: String,
    pub value: String,
}

///
/// ScenarioDef
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioDef {
    pub name: String,
    pub description: String,
    pub steps: Vec<ScenarioStep>,
    pub source: String,
}

///
/// ScenarioStep
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioStep {
    pub name: String,
    pub action: String,
    pub input: Metadata,
    pub expect: ScenarioExpect,
    pub export: BTreeMap<String, String>,
}

///
/// ScenarioExpect
///

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioExpect {
    pub status: i64,
    pub body: Metadata,
}

impl Default for ScenarioExpect {
    fn default() -> Self {
        Self {
            status: 200,
            body: Metadata::new(),
        }
    }
}

///
/// TransformersDef
///
/// In-tree `#Transformers` toggles.
///

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformersDef {
    pub timestamps: bool,
    pub soft_delete: bool,
    pub image: bool,
    pub thumb_suffix: String,
    pub validation: bool,
}

impl Default for TransformersDef {
    fn default() -> Self {
        Self {
            timestamps: true,
            soft_delete: true,
            image: true,
            thumb_suffix: "_thumb".to_string(),
            validation: true,
        }
    }
}

///
/// Definitions
///
/// Everything one normalization run produced.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Definitions {
    pub project: Project,
    pub entities: Vec<EntityDef>,
    pub services: Vec<ServiceDef>,
    pub events: Vec<EventDef>,
    pub errors: Vec<ErrorDef>,
    pub endpoints: Vec<EndpointDef>,
    pub repos: Vec<Repository>,
    pub config: Option<ConfigDef>,
    pub auth: Option<Auth>,
    pub rbac: Option<Rbac>,
    pub schedules: Vec<ScheduleDef>,
    pub views: Vec<View>,
    pub scenarios: Vec<ScenarioDef>,
    pub templates: Vec<Template>,
    pub notification_channels: Option<NotificationChannels>,
    pub notification_policies: Option<NotificationPolicies>,
    pub notification_muting: Option<NotificationMuting>,

    /// `#Transformers`, when the tree declares one.
    pub transformers: Option<TransformersDef>,
    pub infra: crate::registry::InfraContextPatch,
}

impl Definitions {
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.project.target
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceDef> {
        self.services.iter().find(|s| s.name == name)
    }
}

impl_has_metadata!(FieldDef, EntityDef, MethodDef, ServiceDef, EndpointDef, EventDef);
