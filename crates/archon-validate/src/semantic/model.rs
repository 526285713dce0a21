use archon_ir::{
    err,
    error::ErrorTree,
    model::{Entity, Schema},
};
use std::collections::BTreeSet;

/// Entity names are unique; owners name a declared service; FSM
/// transitions stay within the declared states.
pub fn check_entities(errs: &mut ErrorTree, schema: &Schema) {
    let mut seen = BTreeSet::new();

    for entity in &schema.entities {
        let name = entity.name.trim();
        if name.is_empty() {
            err!(errs, "entity with empty name");
            continue;
        }
        if !seen.insert(name) {
            err!(errs, "entity {name:?} is duplicated");
        }

        check_owner(errs, schema, entity);
        check_fsm(errs, entity);
    }
}

fn check_owner(errs: &mut ErrorTree, schema: &Schema, entity: &Entity) {
    let owner = entity.owner.trim();
    if owner.is_empty() || schema.services.iter().any(|s| names_service(owner, &s.name)) {
        return;
    }

    errs.add_at(
        format!("entity {}", entity.name),
        format!("owner {owner:?} is not a known service"),
    );
}

// Same tolerance as the flow ownership rule: no case, one trailing `s`.
fn names_service(owner: &str, service: &str) -> bool {
    let owner = owner.to_lowercase();
    let service = service.to_lowercase();

    owner == service || format!("{owner}s") == service || format!("{service}s") == owner
}

fn check_fsm(errs: &mut ErrorTree, entity: &Entity) {
    let Some(fsm) = &entity.fsm else {
        return;
    };
    let route = format!("entity {} fsm", entity.name);

    for state in fsm.undeclared_states() {
        errs.add_at(route.clone(), format!("transition references undeclared state {state:?}"));
    }
    for (from, to) in &fsm.transitions {
        let mut targets = BTreeSet::new();
        for target in to {
            if !targets.insert(target.as_str()) {
                errs.add_at(route.clone(), format!("duplicate transition {from:?} -> {target:?}"));
            }
        }
    }
}

/// Method and path identify an endpoint.
pub fn check_endpoint_routes(errs: &mut ErrorTree, schema: &Schema) {
    let mut seen = BTreeSet::new();

    for ep in &schema.endpoints {
        let route = ep.route();
        if !seen.insert(route.clone()) {
            err!(errs, "endpoint {route} is duplicated");
        }
    }
}

/// Finder names are unique within their repository.
pub fn check_finder_names(errs: &mut ErrorTree, schema: &Schema) {
    for repo in &schema.repos {
        let mut seen = BTreeSet::new();
        for finder in &repo.finders {
            if !seen.insert(finder.name.trim()) {
                errs.add_at(
                    format!("repository {}", repo.name),
                    format!("finder {:?} is duplicated", finder.name.trim()),
                );
            }
        }
    }
}
