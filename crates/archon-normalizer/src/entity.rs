//! Entity and field extraction.

use crate::{
    defs::{DbMeta, EntityDef, FieldDef},
    helpers::{clean_name, export_name, is_struct, source_of, string_members, trimmed_strings},
    types::{align_with_sql, constraints_from, detect_type},
};
use archon_ir::{
    model::{CrudConfig, FieldUi, FileMeta, Fsm, Index, TypeKind, TypeRef},
    value::HasMetadata,
};
use archon_flow::ir_attribute;
use archon_tree::{Attribute, ConfigValue, TreeField, ValueKind};
use std::{collections::BTreeMap, path::Path};

/// File basenames whose entities are shared rather than owned.
const SHARED_FILES: &[&str] = &["domain", "types", "common", "entities"];

/// Labels inside an entity that configure it instead of declaring a field.
const RESERVED_LABELS: &[&str] = &["fsm", "indexes", "methods"];

const CRUD_VIEWS: &[&str] = &["list", "details", "create", "edit"];

///
/// FieldScope
///
/// Where a field list lives; decides secret auto-classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldScope {
    /// Domain entity: names containing `password`/`token` are secrets.
    Domain,

    /// Method request/response: names are API contract, never auto-secret.
    Contract,

    /// Synthesized list item: names containing `password` are secrets.
    Inline,
}

impl FieldScope {
    fn is_auto_secret(self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match self {
            Self::Domain => name.contains("password") || name.contains("token"),
            Self::Contract => false,
            Self::Inline => name.contains("password"),
        }
    }
}

/// Entities declared in a domain tree, in declaration order.
#[must_use]
pub fn extract_entities(tree: &dyn ConfigValue, root: Option<&Path>) -> Vec<EntityDef> {
    let entities: Vec<EntityDef> = tree
        .fields()
        .into_iter()
        .filter(|f| is_entity_label(f))
        .filter(|f| is_struct(f.value))
        .map(|f| parse_entity(f.clean_label(), f.value, FieldScope::Domain, root))
        .collect();

    tracing::debug!(entities = entities.len(), "extracted entities");

    entities
}

fn is_entity_label(field: &TreeField<'_>) -> bool {
    let name = field.clean_label();
    if field.is_hidden() || name.is_empty() {
        return false;
    }

    !(name.ends_with("Service") || name.ends_with("API") || name == "AppConfig" || name == "RBAC")
}

/// Parse one entity. `scope` is [`FieldScope::Contract`] for method
/// input/output aggregates.
#[must_use]
pub fn parse_entity(
    name: &str,
    value: &dyn ConfigValue,
    scope: FieldScope,
    root: Option<&Path>,
) -> EntityDef {
    let mut entity = EntityDef {
        name: name.to_string(),
        description: value.string_at("description"),
        owner: resolve_owner(value),
        attributes: value.attributes().iter().map(ir_attribute).collect(),
        source: source_of(value, root),
        ..EntityDef::default()
    };

    if let Some(storage) = value.attribute("storage").and_then(|a| a.positional(0)) {
        entity.set_meta("storage", storage.trim_matches('"'));
    }
    let dto_only = value.attribute("dto").is_some_and(|a| a.flag("only"));
    if dto_only || value.bool_at("_dto") == Some(true) {
        entity.set_meta("dto", true);
    }
    if value.has_attribute("timestamps") {
        entity.set_meta("timestamps", true);
    }
    if value.has_attribute("softDelete") || value.has_attribute("soft_delete") {
        entity.set_meta("soft_delete", true);
    }

    for field in value.fields() {
        let label = field.clean_label();
        if field.is_definition()
            || field.is_hidden()
            || label == "description"
            || RESERVED_LABELS.contains(&label)
        {
            continue;
        }
        if label == "ui" && field.value.exists("crud") {
            entity.crud = Some(parse_crud(field.value));
        }

        let mut parsed = parse_field(name, &field, scope, root);
        parsed.skip_domain |= dto_only;
        entity.fields.push(parsed);
    }

    if let Some(fsm) = value.field("fsm") {
        entity.fsm = parse_fsm(fsm);
    }
    if let Some(indexes) = value.field("indexes") {
        entity.indexes = parse_indexes(name, indexes);
    }

    entity
}

// Explicit `_owner`, then `@owner(...)`, then the declaring file name.
fn resolve_owner(value: &dyn ConfigValue) -> String {
    let explicit = value.string_at("_owner");
    if !explicit.is_empty() {
        return explicit;
    }
    if let Some(owner) = value.attribute("owner").and_then(|a| a.positional(0)) {
        return owner.trim_matches('"').to_string();
    }

    value
        .position()
        .and_then(|pos| Path::new(&pos.file).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !SHARED_FILES.contains(stem))
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Parse one field of `owner`.
#[must_use]
pub fn parse_field(
    owner: &str,
    field: &TreeField<'_>,
    scope: FieldScope,
    root: Option<&Path>,
) -> FieldDef {
    let value = field.value;
    let name = clean_name(field.clean_label()).to_string();

    let mut def = FieldDef {
        ty: detect_type(&name, value),
        optional: field.optional || field.label.ends_with('?'),
        source: source_of(value, root),
        skip_domain: field.label == "ui",
        ..FieldDef::new(name.clone(), TypeRef::default())
    };

    if let Some(default) = value.default_value()
        && default.is_concrete()
        && !matches!(default.kind(), ValueKind::Struct | ValueKind::List)
        && let Some(text) = default.scalar_text()
    {
        def.default = text;
    }

    def.attributes = value.attributes().iter().map(ir_attribute).collect();
    if let Some(db) = value.attribute("db") {
        def.db = parse_db(db);
        align_with_sql(&mut def.ty, &def.db.sql_type);
    }

    def.validate_tag = match value.attribute("validate") {
        Some(a) => a.unquoted().to_string(),
        None if name == "email" => "email".to_string(),
        None if name.to_ascii_lowercase().contains("url") => "url".to_string(),
        None => String::new(),
    };

    if let Some(env) = value.attribute("env") {
        def.env_var = env.unquoted().to_string();
    }
    if let Some(ui) = value.attribute("ui") {
        def.ui = Some(parse_ui(ui));
    }
    if value.attribute("dto").is_some_and(|a| a.flag("only")) {
        def.skip_domain = true;
    }

    def.is_secret = value.has_attribute("secret") || scope.is_auto_secret(&name);
    apply_privacy(&mut def, value);
    def.file_meta = parse_file_meta(value);
    def.constraints = value.expr().and_then(constraints_from);

    if def.is_list() {
        expand_list_item(owner, &mut def, value, root);
    }

    def
}

fn parse_db(attr: &Attribute) -> DbMeta {
    let sql_type = attr
        .get("type")
        .map(|t| t.trim_matches('"'))
        .filter(|t| !t.is_empty())
        .unwrap_or(DbMeta::DEFAULT_SQL_TYPE);

    DbMeta {
        sql_type: sql_type.to_string(),
        primary_key: attr.flag("primary_key") || attr.flag("pk"),
        unique: attr.flag("unique"),
        index: attr.flag("index"),
    }
}

fn apply_privacy(def: &mut FieldDef, value: &dyn ConfigValue) {
    if let Some(pii) = value.attribute("pii") {
        def.is_pii = true;
        let classification = pii.get("classification").or_else(|| pii.positional(0));
        if let Some(c) = classification.filter(|c| !c.is_empty()) {
            def.set_meta("pii_classification", c.trim_matches('"'));
        }
    }
    if let Some(encrypt) = value.attribute("encrypt") {
        let mode = encrypt
            .get("mode")
            .or_else(|| encrypt.positional(0))
            .map(|m| m.trim_matches('"'))
            .filter(|m| !m.is_empty())
            .unwrap_or("randomized");
        def.set_meta("encrypt", mode);
    }
    if value.has_attribute("redact") {
        def.set_meta("redact", true);
    }
}

fn parse_file_meta(value: &dyn ConfigValue) -> Option<FileMeta> {
    if value.has_attribute("image") {
        return Some(FileMeta {
            kind: "image".to_string(),
            thumbnail: true,
        });
    }

    value.attribute("file").map(|file| FileMeta {
        kind: file
            .get("kind")
            .map(|k| k.trim_matches('"'))
            .filter(|k| !k.is_empty())
            .unwrap_or("auto")
            .to_string(),
        thumbnail: file.get("thumbnail") == Some("true"),
    })
}

// Lists of inline structs get a synthesized item entity.
fn expand_list_item(owner: &str, def: &mut FieldDef, value: &dyn ConfigValue, root: Option<&Path>) {
    if let Some(item) = def.ty.item.as_deref()
        && item.kind == TypeKind::Entity
    {
        def.item_type_name = item.name.clone();
        return;
    }

    let Some(template) = value.element_template() else {
        return;
    };
    if template.kind() != ValueKind::Struct || template.reference().is_some() {
        return;
    }

    let item_name = if def.name == "data" {
        format!("{}Data", export_name(owner))
    } else {
        format!("{}{}Item", export_name(owner), export_name(&def.name))
    };

    def.item_fields = template
        .fields()
        .iter()
        .filter(|f| !f.is_definition() && !f.is_hidden())
        .map(|f| parse_field(&item_name, f, FieldScope::Inline, root))
        .collect();
    def.ty = TypeRef::list(TypeRef {
        kind: TypeKind::Any,
        name: item_name.clone(),
        ..TypeRef::default()
    });
    def.item_type_name = item_name;
}

/// `@ui(type=..., label=..., ...)` presentation hints.
#[must_use]
pub fn parse_ui(attr: &Attribute) -> FieldUi {
    let text = |key: &str| {
        attr.get(key)
            .map(|v| v.trim_matches('"').to_string())
            .unwrap_or_default()
    };
    let int = |key: &str| attr.get(key).and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0);
    let float = |key: &str| attr.get(key).and_then(|v| v.trim().parse::<f64>().ok());

    FieldUi {
        kind: text("type"),
        label: text("label"),
        placeholder: text("placeholder"),
        helper_text: text("helperText"),
        order: int("order"),
        hidden: attr.flag("hidden"),
        disabled: attr.flag("disabled"),
        full_width: attr.get("fullWidth") != Some("false"),
        rows: int("rows"),
        min: float("min"),
        max: float("max"),
        step: float("step"),
        currency: text("currency"),
        source: text("source"),
        options: text("options")
            .split('|')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(ToString::to_string)
            .collect(),
        multiple: attr.flag("multiple"),
        accept: text("accept"),
        max_size: int("maxSize"),
        component: text("component"),
        columns: int("columns"),
        importance: text("importance"),
        input_kind: text("inputKind"),
        intent: text("intent"),
        density: text("density"),
        label_mode: text("labelMode"),
        surface: text("surface"),
    }
}

fn parse_crud(ui: &dyn ConfigValue) -> CrudConfig {
    let mut crud = CrudConfig {
        enabled: ui.bool_at("crud.enabled").unwrap_or(true),
        custom: ui.bool_at("crud.custom").unwrap_or(false),
        views: CRUD_VIEWS.iter().map(|v| ((*v).to_string(), true)).collect(),
        perms: BTreeMap::new(),
    };

    if let Some(views) = ui.lookup("crud.views") {
        for view in views.fields() {
            if let Some(enabled) = view.value.as_bool() {
                crud.views.insert(view.clean_label().to_string(), enabled);
            }
        }
    }
    crud.perms = string_members(ui.lookup("crud.permissions"))
        .into_iter()
        .filter(|(_, perm)| !perm.is_empty())
        .collect();

    crud
}

/// State machine; transitions accept struct form (`from: [to...]`) and list
/// form (`[{from, to}]`), merged.
fn parse_fsm(value: &dyn ConfigValue) -> Option<Fsm> {
    let mut fsm = Fsm {
        field: value.string_at("field"),
        states: trimmed_strings(value, "states"),
        transitions: BTreeMap::new(),
    };

    let mut add = |from: &str, to: Vec<String>| {
        let targets = fsm.transitions.entry(from.to_string()).or_default();
        for t in to {
            if !targets.contains(&t) {
                targets.push(t);
            }
        }
    };

    if let Some(transitions) = value.field("transitions") {
        match transitions.kind() {
            ValueKind::Struct => {
                for t in transitions.fields() {
                    let from = t.clean_label().to_string();
                    let to = t
                        .value
                        .as_str()
                        .map_or_else(|| strings_of(t.value), |s| vec![s.trim().to_string()]);
                    add(&from, to);
                }
            }
            ValueKind::List => {
                for t in transitions.elements() {
                    let from = t.string_at("from");
                    if !from.is_empty() {
                        add(&from, trimmed_strings(t, "to"));
                    }
                }
            }
            _ => {}
        }
    }

    if fsm.states.is_empty() {
        for (from, to) in &fsm.transitions {
            for state in std::iter::once(from).chain(to) {
                if !fsm.states.contains(state) {
                    fsm.states.push(state.clone());
                }
            }
        }
    }

    (!fsm.field.is_empty() || !fsm.transitions.is_empty()).then_some(fsm)
}

fn strings_of(value: &dyn ConfigValue) -> Vec<String> {
    value
        .elements()
        .into_iter()
        .filter_map(ConfigValue::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_indexes(entity: &str, value: &dyn ConfigValue) -> Vec<Index> {
    value
        .elements()
        .into_iter()
        .filter_map(|idx| {
            let fields = trimmed_strings(idx, "fields");
            if fields.is_empty() {
                return None;
            }
            let name = match idx.string_at("name") {
                n if n.is_empty() => format!("idx_{}_{}", entity.to_lowercase(), fields.join("_")),
                n => n,
            };

            Some(Index {
                name,
                fields,
                unique: idx.bool_at("unique").unwrap_or(false),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_tree::{BoundOp, Expr, Node, Scalar};

    fn attr(node: Node, src: &str) -> Node {
        node.attr(src).expect("attribute should parse")
    }

    fn order() -> Node {
        Node::structure()
            .field("description", Node::text("A customer order"))
            .field("id", attr(Node::string_type(), "@db(type=UUID, primary_key)"))
            .field("status", Node::string_type().with_default(Node::text("draft")))
            .field("email", Node::string_type())
            .field("apiToken", Node::string_type())
            .field("placedAt", attr(Node::string_type(), "@db(type=TIMESTAMPTZ)"))
            .optional(
                "quantity",
                Node::int_type().with_expr(Expr::bound(BoundOp::Ge, Scalar::Int(1))),
            )
            .field(
                "lines",
                Node::list_of(
                    Node::structure()
                        .field("sku", Node::string_type())
                        .field("qty", Node::int_type()),
                ),
            )
            .field(
                "fsm",
                Node::structure()
                    .field("field", Node::text("status"))
                    .field("states", Node::texts(["draft", "paid"]))
                    .field(
                        "transitions",
                        Node::structure().field("draft", Node::texts(["paid"])),
                    ),
            )
            .field(
                "indexes",
                Node::list([Node::structure()
                    .field("fields", Node::texts(["email"]))
                    .field("unique", Node::boolean(true))]),
            )
            .at("/app/cue/domain/orders.cue", 4, 1)
    }

    #[test]
    fn entity_basics() {
        let e = parse_entity("Order", &order(), FieldScope::Domain, Some(Path::new("/app")));

        assert_eq!(e.description, "A customer order");
        assert_eq!(e.owner, "orders", "owner comes from the file name");
        assert_eq!(e.source, "cue/domain/orders.cue:4");
        let names: Vec<_> = e.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "status", "email", "apiToken", "placedAt", "quantity", "lines"]);
    }

    #[test]
    fn field_attributes_and_conventions() {
        let e = parse_entity("Order", &order(), FieldScope::Domain, None);

        let id = e.field("id").expect("id");
        assert_eq!(id.db.sql_type, "UUID");
        assert!(id.db.primary_key);

        assert_eq!(e.field("status").map(|f| f.default.as_str()), Some("draft"));
        assert_eq!(e.field("email").map(|f| f.validate_tag.as_str()), Some("email"));
        assert!(e.field("apiToken").is_some_and(|f| f.is_secret));
        assert_eq!(e.field("placedAt").map(|f| f.ty.kind.clone()), Some(TypeKind::Time));

        let qty = e.field("quantity").expect("quantity");
        assert!(qty.optional);
        assert_eq!(qty.constraints.as_ref().and_then(|c| c.min), Some(1.0));
    }

    #[test]
    fn contract_fields_are_not_auto_secret() {
        let e = parse_entity("Order", &order(), FieldScope::Contract, None);

        assert!(e.field("apiToken").is_some_and(|f| !f.is_secret));
    }

    #[test]
    fn inline_password_names_are_secret_in_any_case() {
        for name in ["password", "userPassword", "password_hash"] {
            assert!(FieldScope::Inline.is_auto_secret(name), "{name} should be secret");
        }
        assert!(!FieldScope::Inline.is_auto_secret("apiToken"), "only passwords inside items");

        let v = Node::structure().field(
            "members",
            Node::list_of(
                Node::structure()
                    .field("name", Node::string_type())
                    .field("userPassword", Node::string_type()),
            ),
        );
        let e = parse_entity("Team", &v, FieldScope::Domain, None);
        let items = &e.field("members").expect("members").item_fields;

        assert!(items.iter().any(|f| f.name == "userPassword" && f.is_secret));
        assert!(items.iter().any(|f| f.name == "name" && !f.is_secret));
    }

    #[test]
    fn inline_list_items_are_synthesized() {
        let e = parse_entity("Order", &order(), FieldScope::Domain, None);
        let lines = e.field("lines").expect("lines");

        assert_eq!(lines.item_type_name, "OrderLinesItem");
        assert_eq!(lines.ty.item.as_ref().map(|i| i.name.as_str()), Some("OrderLinesItem"));
        let item_names: Vec<_> = lines.item_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(item_names, ["sku", "qty"]);
    }

    #[test]
    fn data_lists_use_the_data_suffix() {
        let v = Node::structure().field(
            "data",
            Node::list_of(Node::structure().field("password", Node::string_type())),
        );
        let e = parse_entity("listUsersResponse", &v, FieldScope::Contract, None);
        let data = e.field("data").expect("data");

        assert_eq!(data.item_type_name, "ListUsersResponseData");
        assert!(data.item_fields[0].is_secret, "inline password stays secret");
    }

    #[test]
    fn fsm_and_indexes() {
        let e = parse_entity("Order", &order(), FieldScope::Domain, None);

        let fsm = e.fsm.expect("fsm");
        assert_eq!(fsm.field, "status");
        assert_eq!(fsm.transitions.get("draft"), Some(&vec!["paid".to_string()]));
        assert!(fsm.undeclared_states().is_empty());

        assert_eq!(e.indexes.len(), 1);
        assert_eq!(e.indexes[0].name, "idx_order_email");
        assert!(e.indexes[0].unique);
    }

    #[test]
    fn fsm_list_form_merges_with_struct_form() {
        let fsm = Node::structure().field("field", Node::text("status")).field(
            "transitions",
            Node::list([
                Node::structure()
                    .field("from", Node::text("draft"))
                    .field("to", Node::text("paid")),
                Node::structure()
                    .field("from", Node::text("draft"))
                    .field("to", Node::texts(["paid", "void"])),
            ]),
        );

        let parsed = parse_fsm(&fsm).expect("fsm");
        assert_eq!(parsed.transitions["draft"], ["paid", "void"]);
        assert_eq!(parsed.states, ["draft", "paid", "void"], "states derived from transitions");
    }

    #[test]
    fn privacy_and_file_attributes() {
        let v = Node::structure()
            .field("ssn", attr(Node::string_type(), "@pii(classification=high)"))
            .field("card", attr(Node::string_type(), "@encrypt()"))
            .field("avatar", attr(Node::string_type(), "@image()"))
            .field("doc", attr(Node::string_type(), "@file(kind=pdf, thumbnail=true)"));
        let e = parse_entity("User", &v, FieldScope::Domain, None);

        let ssn = e.field("ssn").expect("ssn");
        assert!(ssn.is_pii);
        assert_eq!(ssn.meta_str("pii_classification"), Some("high"));
        assert_eq!(e.field("card").and_then(|f| f.meta_str("encrypt")), Some("randomized"));

        let avatar = e.field("avatar").and_then(|f| f.file_meta.clone()).expect("image");
        assert_eq!((avatar.kind.as_str(), avatar.thumbnail), ("image", true));
        let doc = e.field("doc").and_then(|f| f.file_meta.clone()).expect("file");
        assert_eq!((doc.kind.as_str(), doc.thumbnail), ("pdf", true));
    }

    #[test]
    fn ui_hints_and_crud() {
        let v = Node::structure()
            .field(
                "notes",
                attr(Node::string_type(), "@ui(type=textarea, rows=4, fullWidth=false)"),
            )
            .field(
                "ui",
                Node::structure().field(
                    "crud",
                    Node::structure()
                        .field("views", Node::structure().field("edit", Node::boolean(false)))
                        .field(
                            "permissions",
                            Node::structure().field("create", Node::text("orders.create")),
                        ),
                ),
            );
        let e = parse_entity("Order", &v, FieldScope::Domain, None);

        let ui = e.field("notes").and_then(|f| f.ui.clone()).expect("ui");
        assert_eq!((ui.kind.as_str(), ui.rows, ui.full_width), ("textarea", 4, false));

        let crud = e.crud.clone().expect("crud");
        assert!(crud.enabled);
        assert_eq!(crud.views.get("edit"), Some(&false));
        assert_eq!(crud.views.get("list"), Some(&true));
        assert_eq!(crud.perms.get("create").map(String::as_str), Some("orders.create"));
        assert!(e.field("ui").is_some_and(|f| f.skip_domain));
    }

    #[test]
    fn extraction_skips_services_and_reserved_names() {
        let tree = Node::structure()
            .field("#Order", Node::structure().field("id", Node::string_type()))
            .field("#OrderService", Node::structure())
            .field("PublicAPI", Node::structure())
            .field("#AppConfig", Node::structure())
            .field("_hidden", Node::structure())
            .field("#Shared", Node::structure().at("/app/domain/common.cue", 1, 1));

        let names: Vec<_> = extract_entities(&tree, None).into_iter().map(|e| (e.name, e.owner)).collect();

        assert_eq!(names, [("Order".to_string(), String::new()), ("Shared".to_string(), String::new())]);
    }

    #[test]
    fn dto_and_owner_attributes() {
        let v = attr(attr(Node::structure(), "@dto(only=true)"), "@owner(billing)")
            .field("total", Node::int_type());
        let e = parse_entity("InvoiceView", &v, FieldScope::Domain, None);

        assert!(e.is_dto());
        assert_eq!(e.owner, "billing");
        assert!(e.fields[0].skip_domain);
    }
}
