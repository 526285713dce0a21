//! Attribute hooks. The registry walks the schema once (entities, then each
//! entity's fields, then services, then each service's methods) and calls
//! every hook registered for each attribute it meets, in the scopes the
//! hook asked for. A hook only rewrites the node it is handed.

mod builtin;


pub use builtin::*;

use crate::error::{HookError, TransformError};
use archon_ir::model::{Attribute, Entity, Field, Method, Schema, Service};
use std::collections::BTreeMap;

///
/// HookScope
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[remain::sorted]
pub enum HookScope {
    Entity,
    Field,
    Method,
    Service,
}

impl HookScope {
    pub const ALL: &'static [Self] = &[Self::Entity, Self::Field, Self::Method, Self::Service];
}

///
/// Hook
///

pub trait Hook {
    /// Attribute name this hook answers to.
    fn attribute(&self) -> &str;

    fn scopes(&self) -> &'static [HookScope] {
        HookScope::ALL
    }

    fn on_field(&self, _entity: &str, _field: &mut Field, _attr: &Attribute) -> Result<(), HookError> {
        Ok(())
    }

    fn on_entity(&self, _entity: &mut Entity, _attr: &Attribute) -> Result<(), HookError> {
        Ok(())
    }

    fn on_service(&self, _service: &mut Service, _attr: &Attribute) -> Result<(), HookError> {
        Ok(())
    }

    fn on_method(&self, _service: &str, _method: &mut Method, _attr: &Attribute) -> Result<(), HookError> {
        Ok(())
    }
}

///
/// HookRegistry
///

#[derive(Default)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Vec<Box<dyn Hook>>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// db, validate, image, file, env, cache and crud.
    #[must_use]
    pub fn builtin(thumb_suffix: &str) -> Self {
        let mut reg = Self::new();
        reg.register(DbHook);
        reg.register(ValidateHook);
        reg.register(ImageHook::new(thumb_suffix));
        reg.register(FileHook);
        reg.register(EnvHook);
        reg.register(CacheHook);
        reg.register(CrudHook);

        reg
    }

    pub fn register(&mut self, hook: impl Hook + 'static) {
        self.hooks
            .entry(hook.attribute().to_string())
            .or_default()
            .push(Box::new(hook));
    }

    /// Attribute names with at least one hook, sorted.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        self.hooks.keys().map(String::as_str).collect()
    }

    fn hooks_for(
        &self,
        attribute: &str,
        scope: HookScope,
    ) -> impl Iterator<Item = &(dyn Hook + 'static)> {
        self.hooks
            .get(attribute)
            .into_iter()
            .flatten()
            .map(|h| &**h)
            .filter(move |h| h.scopes().contains(&scope))
    }

    /// Walk the schema, stopping at the first hook failure.
    pub fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        let mut calls = 0_usize;

        for entity in &mut schema.entities {
            for attr in entity.attributes.clone() {
                for hook in self.hooks_for(&attr.name, HookScope::Entity) {
                    hook.on_entity(entity, &attr)
                        .map_err(|e| HookError::OnEntity {
                            attribute: attr.name.clone(),
                            entity: entity.name.clone(),
                            source: Box::new(e),
                        })?;
                    calls += 1;
                }
            }

            for field in &mut entity.fields {
                for attr in field.attributes.clone() {
                    for hook in self.hooks_for(&attr.name, HookScope::Field) {
                        hook.on_field(&entity.name, field, &attr)
                            .map_err(|e| HookError::OnField {
                                attribute: attr.name.clone(),
                                entity: entity.name.clone(),
                                field: field.name.clone(),
                                source: Box::new(e),
                            })?;
                        calls += 1;
                    }
                }
            }
        }

        for svc in &mut schema.services {
            for attr in svc.attributes.clone() {
                for hook in self.hooks_for(&attr.name, HookScope::Service) {
                    hook.on_service(svc, &attr)
                        .map_err(|e| HookError::OnService {
                            attribute: attr.name.clone(),
                            service: svc.name.clone(),
                            source: Box::new(e),
                        })?;
                    calls += 1;
                }
            }

            for m in &mut svc.methods {
                for attr in m.attributes.clone() {
                    for hook in self.hooks_for(&attr.name, HookScope::Method) {
                        hook.on_method(&svc.name, m, &attr)
                            .map_err(|e| HookError::OnMethod {
                                attribute: attr.name.clone(),
                                service: svc.name.clone(),
                                method: m.name.clone(),
                                source: Box::new(e),
                            })?;
                        calls += 1;
                    }
                }
            }
        }

        tracing::info!(calls, "attribute hooks applied");

        Ok(())
    }
}
