use archon_ir::{
    error::ErrorTree,
    model::{Entity, TypeKind, TypeRef},
};
use std::collections::BTreeMap;

/// Well-formedness of a type reference, recursively. Nested positions are
/// reported as `route[]`, `route<key>` and `route<value>`.
pub(super) fn check_type_ref(
    errs: &mut ErrorTree,
    entities: &BTreeMap<&str, &Entity>,
    route: &str,
    ty: &TypeRef,
) {
    match &ty.kind {
        TypeKind::Entity => {
            let name = ty.name.trim();
            if name.is_empty() {
                errs.add_at(route, "has entity type without name");
            } else if !entities.contains_key(name) {
                errs.add_at(route, format!("references unknown entity type {name:?}"));
            }
        }
        TypeKind::List => match ty.item.as_deref() {
            Some(item) => check_type_ref(errs, entities, &format!("{route}[]"), item),
            None => errs.add_at(route, "list type has no item type"),
        },
        TypeKind::Map => match (ty.key.as_deref(), ty.item.as_deref()) {
            (Some(key), Some(item)) => {
                check_type_ref(errs, entities, &format!("{route}<key>"), key);
                check_type_ref(errs, entities, &format!("{route}<value>"), item);
            }
            _ => errs.add_at(route, "map type has no key/item type"),
        },
        TypeKind::Other(raw) => errs.add_at(route, format!("has unsupported type kind {raw:?}")),
        // scalars
        _ => {}
    }
}
