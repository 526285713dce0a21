//! Repository extraction.
//!
//! A repository exists for every entity a service `owns`, every member of a
//! `Repositories` block and every member of a legacy `*Repository` label.
//! Finders are only declared in the `Repositories` block.

use crate::{helpers::source_of, types::map_declared_type};
use archon_ir::model::{Finder, Repository, TypeKind, WhereClause};
use archon_tree::ConfigValue;
use std::{collections::BTreeMap, path::Path};

const DEFAULT_PARAM_TYPE: &str = "string";

/// Repositories from the API tree's `Services.*.owns` and the repository
/// tree, deduplicated by name in discovery order.
#[must_use]
pub fn extract_repositories(
    api: Option<&dyn ConfigValue>,
    repos: Option<&dyn ConfigValue>,
    root: Option<&Path>,
) -> Vec<Repository> {
    let mut out: Vec<Repository> = Vec::new();
    let mut add = |entity: &str| {
        let entity = entity.trim();
        if entity.is_empty() {
            return;
        }
        let name = format!("{entity}Repository");
        if out.iter().all(|r| r.name != name) {
            out.push(Repository {
                name,
                entity: entity.to_string(),
                ..Repository::default()
            });
        }
    };

    for tree in [api, repos].into_iter().flatten() {
        if let Some(services) = tree.field("Services") {
            for svc in services.fields() {
                for entity in svc.value.strings_at("owns") {
                    add(&entity);
                }
            }
        }
        if let Some(block) = tree.field("Repositories") {
            for entry in block.fields() {
                add(entry.clean_label());
            }
        }
        for legacy in tree.fields() {
            if legacy.label.ends_with("Repository") && legacy.label != "Repositories" {
                for entry in legacy.value.fields() {
                    add(entry.clean_label());
                }
            }
        }
    }

    let mut finders = repos.map(|r| extract_finders(r, root)).unwrap_or_default();
    for repo in &mut out {
        if let Some(list) = finders.remove(&repo.entity) {
            repo.finders = list;
        }
    }

    tracing::debug!(repositories = out.len(), "extracted repositories");

    out
}

/// Finders per entity from `Repositories.<Entity>.finders`. Unnamed finders
/// and where clauses without a field are dropped.
#[must_use]
pub fn extract_finders(tree: &dyn ConfigValue, root: Option<&Path>) -> BTreeMap<String, Vec<Finder>> {
    let Some(block) = tree.field("Repositories") else {
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for entry in block.fields() {
        let entity = entry.clean_label().trim();
        let Some(list) = entry.value.field("finders") else {
            continue;
        };
        if entity.is_empty() {
            continue;
        }

        let finders: Vec<Finder> = list
            .elements()
            .into_iter()
            .filter_map(|fv| parse_finder(fv, root))
            .collect();
        out.insert(entity.to_string(), finders);
    }

    out
}

fn parse_finder(fv: &dyn ConfigValue, root: Option<&Path>) -> Option<Finder> {
    let name = fv.string_at("name");
    if name.is_empty() {
        return None;
    }

    Some(Finder {
        name,
        action: fv.string_at("action"),
        returns: fv.string_at("returns"),
        return_type: fv.string_at("return_type"),
        select: non_blank(fv.strings_at("select")),
        scan_fields: non_blank(fv.strings_at("scan_fields")),
        where_clauses: fv
            .field("where")
            .map(|w| w.elements().into_iter().filter_map(parse_where).collect())
            .unwrap_or_default(),
        order_by: fv.string_at("order_by"),
        limit: fv.int_at("limit").filter(|n| *n > 0).unwrap_or(0),
        for_update: fv.bool_at("for_update").unwrap_or(false),
        custom_sql: fv.string_at("sql"),
        source: source_of(fv, root),
    })
}

fn parse_where(wv: &dyn ConfigValue) -> Option<WhereClause> {
    let field = wv.string_at("field");
    if field.is_empty() {
        return None;
    }

    let mut param = wv.string_at("param");
    if param.is_empty() {
        param.clone_from(&field);
    }

    Some(WhereClause {
        op: wv.string_at("op"),
        param_type: param_type(&wv.string_at("param_type")),
        field,
        param,
    })
}

// Declared parameter types map onto IR kind names; unknown names pass through.
fn param_type(raw: &str) -> String {
    if raw.is_empty() {
        return DEFAULT_PARAM_TYPE.to_string();
    }

    match map_declared_type(raw) {
        Some(ty) if ty.kind.is_scalar() && ty.kind != TypeKind::Any => ty.kind.to_string(),
        _ => raw.to_string(),
    }
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items.into_iter().filter(|s| !s.trim().is_empty()).collect()
}
