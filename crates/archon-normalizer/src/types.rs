//! Type detection: tree values to IR type references, plus structural
//! constraint extraction from declared expressions.

use crate::helpers::is_exported_name;
use archon_ir::model::{Constraints, TypeKind, TypeRef};
use archon_tree::{BoundOp, ConfigValue, Expr, Scalar, ValueKind};

/// Detect the IR type of a field value.
#[must_use]
pub fn detect_type(field_name: &str, value: &dyn ConfigValue) -> TypeRef {
    // explicit `{ type: "..." }` declaration
    if value.kind() == ValueKind::Struct
        && let Some(declared) = value.str_at("type")
        && let Some(ty) = map_declared_type(declared)
    {
        return ty;
    }

    if field_name == "permissions" {
        return TypeRef::list(TypeRef::scalar(TypeKind::String));
    }

    if let Some(entity) = referenced_entity(value) {
        return TypeRef::entity(entity);
    }

    match value.kind() {
        ValueKind::String => TypeRef::scalar(TypeKind::String),
        ValueKind::Int => TypeRef::scalar(TypeKind::Int),
        ValueKind::Float | ValueKind::Number => TypeRef::scalar(TypeKind::Float),
        ValueKind::Bool => TypeRef::scalar(TypeKind::Bool),
        ValueKind::List => list_type(value),
        ValueKind::Struct => string_map(),
        ValueKind::Any | ValueKind::Null => TypeRef::scalar(TypeKind::Any),
    }
}

fn list_type(value: &dyn ConfigValue) -> TypeRef {
    if let Some(template) = value.element_template() {
        if let Some(entity) = referenced_entity(template) {
            return TypeRef::list(TypeRef::entity(entity));
        }
        if template.kind() == ValueKind::String {
            return TypeRef::list(TypeRef::scalar(TypeKind::String));
        }
    }

    let elements = value.elements();
    let concrete: Vec<_> = elements.iter().filter(|e| e.is_concrete()).collect();
    if !concrete.is_empty() && concrete.iter().all(|e| e.kind() == ValueKind::String) {
        return TypeRef::list(TypeRef::scalar(TypeKind::String));
    }

    TypeRef::list(TypeRef::scalar(TypeKind::Any))
}

/// Entity name behind a reference such as `#Order`, `Order` or
/// `domain.Order`.
fn referenced_entity(value: &dyn ConfigValue) -> Option<String> {
    let reference = value.reference()?;
    let selectors: Vec<&str> = reference.split('.').filter(|s| !s.is_empty()).collect();
    let last = *selectors.last()?;

    if let Some(name) = last.strip_prefix('#') {
        return (!name.is_empty()).then(|| name.to_string());
    }
    if selectors.len() == 1 && value.kind() == ValueKind::Struct && is_exported_name(last) {
        return Some(last.to_string());
    }
    if selectors.len() > 1 && selectors[selectors.len() - 2] == "domain" {
        return Some(last.to_string());
    }

    None
}

fn string_map() -> TypeRef {
    TypeRef::map(TypeRef::scalar(TypeKind::String), TypeRef::scalar(TypeKind::Any))
}

/// Map a declared type name (`"string"`, `"[]Item"`, `"*time.Time"`).
/// Unions of literals collapse to string.
#[must_use]
pub fn map_declared_type(declared: &str) -> Option<TypeRef> {
    let t = declared.trim().trim_matches('"').trim_start_matches('*').trim();
    if t.is_empty() {
        return None;
    }
    if t.contains('|') {
        return Some(TypeRef::scalar(TypeKind::String));
    }
    if let Some(item) = t.strip_prefix("[]") {
        let item = map_declared_type(item).unwrap_or_else(|| TypeRef::scalar(TypeKind::Any));
        return Some(TypeRef::list(item));
    }

    let kind = match t.to_ascii_lowercase().as_str() {
        "string" | "email" | "url" | "phone" | "password" => TypeKind::String,
        "uuid" => TypeKind::Uuid,
        "int" | "int32" => TypeKind::Int,
        "int64" | "money" => TypeKind::Int64,
        "float" | "float32" | "float64" | "number" => TypeKind::Float,
        "bool" | "boolean" => TypeKind::Bool,
        "time" | "time.time" | "datetime" | "timestamp" => TypeKind::Time,
        "json" | "object" | "map" => return Some(string_map()),
        "any" => TypeKind::Any,
        _ => return None,
    };

    Some(TypeRef::scalar(kind))
}

/// Align a string field with its SQL column type.
pub fn align_with_sql(ty: &mut TypeRef, sql_type: &str) {
    if ty.kind == TypeKind::String && sql_type.to_ascii_uppercase().contains("TIMESTAMP") {
        ty.kind = TypeKind::Time;
    }
}

/// Numeric, length, pattern and enum constraints read structurally from a
/// declared expression. `None` when nothing applies.
#[must_use]
pub fn constraints_from(expr: &Expr) -> Option<Constraints> {
    let mut out = Constraints::default();

    for part in expr.conjuncts() {
        match part {
            Expr::Bound { op, value } => match op {
                BoundOp::Gt | BoundOp::Ge => out.min = value.as_f64(),
                BoundOp::Lt | BoundOp::Le => out.max = value.as_f64(),
                BoundOp::Match => {
                    if let Some(s) = value.as_str() {
                        out.regex = s.to_string();
                    }
                }
                BoundOp::Ne | BoundOp::NotMatch => {}
            },
            Expr::Call { func, args } => {
                let n = args.first().and_then(length_arg);
                match func.as_str() {
                    "strings.MinRunes" | "len.Min" => out.min_len = n,
                    "strings.MaxRunes" | "len.Max" => out.max_len = n,
                    _ => {}
                }
            }
            Expr::Or(_) => {
                if let Some(values) = part.string_disjuncts() {
                    out.enum_values = values.into_iter().map(ToString::to_string).collect();
                }
            }
            Expr::Ident(_) | Expr::Literal(_) | Expr::And(_) => {}
        }
    }

    (!out.is_empty()).then_some(out)
}

fn length_arg(arg: &Scalar) -> Option<u64> {
    match arg {
        Scalar::Int(n) => u64::try_from(*n).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_tree::Node;

    fn kind_of(ty: &TypeRef) -> (&str, Option<&str>) {
        (ty.kind.as_str(), ty.item.as_ref().map(|i| i.kind.as_str()))
    }

    #[test]
    fn scalar_kinds_map_directly() {
        assert_eq!(kind_of(&detect_type("x", &Node::string_type())), ("string", None));
        assert_eq!(kind_of(&detect_type("x", &Node::int(3))), ("int", None));
        assert_eq!(kind_of(&detect_type("x", &Node::float_type())), ("float", None));
        assert_eq!(kind_of(&detect_type("x", &Node::boolean(true))), ("bool", None));
        assert_eq!(kind_of(&detect_type("x", &Node::any())), ("any", None));
    }

    #[test]
    fn declared_types_win() {
        let v = Node::structure().field("type", Node::text("int64"));
        assert_eq!(kind_of(&detect_type("x", &v)), ("int64", None));

        let v = Node::structure().field("type", Node::text("[]string"));
        assert_eq!(kind_of(&detect_type("x", &v)), ("list", Some("string")));

        let v = Node::structure().field("type", Node::text("\"a\" | \"b\""));
        assert_eq!(kind_of(&detect_type("x", &v)), ("string", None));
    }

    #[test]
    fn references_become_entities() {
        let v = Node::structure().with_ref("#Customer");
        assert_eq!(detect_type("customer", &v), TypeRef::entity("Customer"));

        let v = Node::structure().with_ref("domain.Invoice");
        assert_eq!(detect_type("invoice", &v), TypeRef::entity("Invoice"));

        let v = Node::list_of(Node::structure().with_ref("#Line"));
        assert_eq!(detect_type("lines", &v), TypeRef::list(TypeRef::entity("Line")));
    }

    #[test]
    fn list_kinds() {
        let tags = Node::list_of(Node::string_type());
        assert_eq!(kind_of(&detect_type("tags", &tags)), ("list", Some("string")));

        let concrete = Node::texts(["a", "b"]);
        assert_eq!(kind_of(&detect_type("xs", &concrete)), ("list", Some("string")));

        let mixed = Node::list([Node::text("a"), Node::int(1)]);
        assert_eq!(kind_of(&detect_type("xs", &mixed)), ("list", Some("any")));
    }

    #[test]
    fn permissions_are_string_lists() {
        let v = Node::any();
        assert_eq!(kind_of(&detect_type("permissions", &v)), ("list", Some("string")));
    }

    #[test]
    fn timestamp_columns_are_times() {
        let mut ty = TypeRef::scalar(TypeKind::String);
        align_with_sql(&mut ty, "timestamptz");
        assert_eq!(ty.kind, TypeKind::Time);

        let mut ty = TypeRef::scalar(TypeKind::Int);
        align_with_sql(&mut ty, "TIMESTAMP");
        assert_eq!(ty.kind, TypeKind::Int, "only string fields are realigned");
    }

    #[test]
    fn constraints_combine_conjuncts() {
        let expr = Expr::And(vec![
            Expr::Ident("string".into()),
            Expr::call("strings.MinRunes", vec![Scalar::Int(3)]),
            Expr::call("strings.MaxRunes", vec![Scalar::Int(64)]),
            Expr::bound(BoundOp::Match, Scalar::Text("^[a-z]+$".into())),
        ]);

        let c = constraints_from(&expr).expect("constraints");
        assert_eq!((c.min_len, c.max_len), (Some(3), Some(64)));
        assert_eq!(c.regex, "^[a-z]+$");

        let range = Expr::And(vec![
            Expr::bound(BoundOp::Ge, Scalar::Int(0)),
            Expr::bound(BoundOp::Lt, Scalar::Float(100.5)),
        ]);
        let c = constraints_from(&range).expect("range");
        assert_eq!((c.min, c.max), (Some(0.0), Some(100.5)));
    }

    #[test]
    fn string_disjunctions_are_enums() {
        let expr = Expr::Or(vec![Expr::text("draft"), Expr::text("active")]);
        let c = constraints_from(&expr).expect("enum");
        assert_eq!(c.enum_values, ["draft", "active"]);

        assert!(constraints_from(&Expr::Ident("int".into())).is_none());
    }
}
