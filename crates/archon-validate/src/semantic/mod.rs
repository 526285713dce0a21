//! Semantic validation of a transformed schema.
//!
//! Every check runs and reports into one [`ErrorTree`]; the caller gets all
//! issues at once, sorted, or nothing.

mod model;
mod template;
mod types;
mod ui;

#[cfg(test)]
mod tests;

use crate::ThisError;
use archon_ir::{
    err,
    error::ErrorTree,
    model::{Entity, Field, Schema, Service},
};
use std::collections::{BTreeMap, BTreeSet};

///
/// SemanticError
///

#[derive(Debug, ThisError)]
#[error("ir semantic validation failed:\n{0}")]
pub struct SemanticError(pub ErrorTree);

impl SemanticError {
    /// Sorted issue lines.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        self.0.flatten()
    }
}

/// Run every semantic check over `schema`.
pub fn validate_semantics(schema: &Schema) -> Result<(), SemanticError> {
    let entities: BTreeMap<&str, &Entity> =
        schema.entities.iter().map(|e| (e.name.as_str(), e)).collect();
    let mut errs = ErrorTree::new();

    model::check_entities(&mut errs, schema);
    for entity in &schema.entities {
        for field in &entity.fields {
            check_field(&mut errs, &entities, format!("entity {} field {}", entity.name, field.name), field);
        }
    }

    for svc in &schema.services {
        for m in &svc.methods {
            for (side, aggregate) in [("input", &m.input), ("output", &m.output)] {
                for field in &aggregate.fields {
                    let route = format!("service {} method {} {side} field {}", svc.name, m.name, field.name);
                    check_field(&mut errs, &entities, route, field);
                }
            }
            for src in &m.sources {
                let name = src.entity.trim();
                if !name.is_empty() && !entities.contains_key(name) {
                    errs.add_at(
                        format!("service {} method {}", svc.name, m.name),
                        format!("source references unknown entity {name:?}"),
                    );
                }
            }
        }
    }

    check_repositories(&mut errs, schema, &entities);
    model::check_finder_names(&mut errs, schema);
    check_endpoints(&mut errs, schema);
    model::check_endpoint_routes(&mut errs, schema);
    if let Some(cycle) = find_service_cycle(&schema.services) {
        err!(errs, "service dependency cycle detected: {}", cycle.join(" -> "));
    }
    template::check_catalogue(&mut errs, schema);
    template::check_notification_refs(&mut errs, schema);

    if errs.is_empty() {
        tracing::debug!("semantic validation passed");
    } else {
        tracing::warn!(issues = errs.len(), "semantic validation failed");
    }

    errs.result().map_err(SemanticError)
}

fn check_field(errs: &mut ErrorTree, entities: &BTreeMap<&str, &Entity>, route: String, field: &Field) {
    types::check_type_ref(errs, entities, &route, &field.ty);
    ui::check_field_ui(errs, &route, field);
}

// Column names compare lower-cased with `_` and `-` removed.
fn column_key(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect()
}

fn check_repositories(errs: &mut ErrorTree, schema: &Schema, entities: &BTreeMap<&str, &Entity>) {
    for repo in &schema.repos {
        let route = format!("repository {}", repo.name);
        let Some(entity) = entities.get(repo.entity.as_str()) else {
            errs.add_at(route, format!("references unknown entity {:?}", repo.entity));
            continue;
        };
        let columns: BTreeSet<String> = entity.fields.iter().map(|f| column_key(&f.name)).collect();

        for finder in &repo.finders {
            let where_fields = finder.where_clauses.iter().map(|w| ("where", w.field.as_str()));
            let selected = finder.select.iter().map(|s| ("select", s.as_str()));

            for (clause, col) in where_fields.chain(selected) {
                if !col.trim().is_empty() && !columns.contains(&column_key(col)) {
                    errs.add_at(
                        format!("{route} finder {}", finder.name),
                        format!("{clause} field {col:?} does not exist on entity {}", repo.entity),
                    );
                }
            }
        }
    }
}

fn check_endpoints(errs: &mut ErrorTree, schema: &Schema) {
    for ep in &schema.endpoints {
        let route = format!("endpoint {}", ep.route());
        match schema.service(&ep.service) {
            None => errs.add_at(route, format!("references unknown service {:?}", ep.service)),
            Some(svc) if !svc.has_method(&ep.rpc) => errs.add_at(
                route,
                format!("references unknown RPC {:?} on service {}", ep.rpc, ep.service),
            ),
            Some(_) => {}
        }
    }
}

/// First cycle over `uses` edges, as `[A, B, A]`. Services are visited in
/// declaration order and unknown dependencies are ignored.
#[must_use]
pub fn find_service_cycle(services: &[Service]) -> Option<Vec<String>> {
    let by_name: BTreeMap<&str, &Service> = services.iter().map(|s| (s.name.as_str(), s)).collect();
    let mut visited = BTreeSet::new();
    let mut path = Vec::new();

    services
        .iter()
        .find_map(|s| visit(&s.name, &by_name, &mut visited, &mut path))
}

fn visit<'a>(
    name: &'a str,
    by_name: &BTreeMap<&'a str, &'a Service>,
    visited: &mut BTreeSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    if let Some(start) = path.iter().position(|p| *p == name) {
        let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
        cycle.push(name.to_string());
        return Some(cycle);
    }
    if !visited.insert(name) {
        return None;
    }

    path.push(name);
    if let Some(svc) = by_name.get(name) {
        for dep in &svc.uses {
            if let Some((&dep, _)) = by_name.get_key_value(dep.as_str())
                && let Some(cycle) = visit(dep, by_name, visited, path)
            {
                return Some(cycle);
            }
        }
    }
    path.pop();

    None
}
