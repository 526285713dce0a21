mod endpoint;
mod entity;
mod infra;
mod service;
mod types;

pub use endpoint::*;
pub use entity::*;
pub use infra::*;
pub use service::*;
pub use types::*;

use crate::{graph::DependencyGraph, impl_has_metadata, value::Metadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// Schema
///
/// Root of the IR. Built once by assembly, then mutated in place by the
/// migrator, transformers and hooks, and read-only after validation.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Schema {
    pub ir_version: String,
    pub project: Project,
    pub entities: Vec<Entity>,
    pub services: Vec<Service>,
    pub events: Vec<Event>,
    pub errors: Vec<ErrorDef>,
    pub endpoints: Vec<Endpoint>,
    pub repos: Vec<Repository>,
    pub config: Config,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbac: Option<Rbac>,

    pub schedules: Vec<Schedule>,
    pub views: Vec<View>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationsConfig>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<Template>,

    pub metadata: Option<Metadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<DependencyGraph>,
}

impl Schema {
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn entity_names(&self) -> BTreeSet<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Recompute the dependency graph from the current entities and services.
    pub fn refresh_graph(&mut self) {
        self.graph = Some(DependencyGraph::build(self));
    }
}

///
/// Project
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub version: String,
    pub target: Target,
}

///
/// Target
///
/// Generation target. Interpreted only by downstream emitters.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Target {
    pub lang: String,
    pub framework: String,
    pub db: String,
    pub cache: String,
    pub queue: String,
    pub storage: String,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            lang: "go".to_string(),
            framework: "chi".to_string(),
            db: "postgres".to_string(),
            cache: "redis".to_string(),
            queue: "nats".to_string(),
            storage: "s3".to_string(),
        }
    }
}

impl_has_metadata!(Schema);
