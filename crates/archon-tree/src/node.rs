use crate::{
    attribute::Attribute,
    error::TreeError,
    expr::Expr,
    position::Position,
    value::{ConfigValue, Scalar, TreeField, ValueKind},
};

///
/// NodeField
///

#[derive(Clone, Debug, PartialEq)]
struct NodeField {
    label: String,
    optional: bool,
    value: Node,
}

///
/// Node
///
/// Owned in-memory tree value. Built with the chained constructors below
/// or decoded from JSON; front-ends with their own evaluator implement
/// [`ConfigValue`] directly instead.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    kind: ValueKind,
    scalar: Option<Scalar>,
    fields: Vec<NodeField>,
    elements: Option<Vec<Self>>,
    template: Option<Box<Self>>,
    default: Option<Box<Self>>,
    attributes: Vec<Attribute>,
    position: Option<Position>,
    reference: Option<String>,
    expr: Option<Expr>,
}

impl Node {
    //
    // abstract values
    //

    #[must_use]
    pub fn of_kind(kind: ValueKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn any() -> Self {
        Self::of_kind(ValueKind::Any)
    }

    #[must_use]
    pub fn string_type() -> Self {
        Self::of_kind(ValueKind::String).with_expr(Expr::Ident("string".into()))
    }

    #[must_use]
    pub fn int_type() -> Self {
        Self::of_kind(ValueKind::Int).with_expr(Expr::Ident("int".into()))
    }

    #[must_use]
    pub fn float_type() -> Self {
        Self::of_kind(ValueKind::Float).with_expr(Expr::Ident("float".into()))
    }

    #[must_use]
    pub fn bool_type() -> Self {
        Self::of_kind(ValueKind::Bool).with_expr(Expr::Ident("bool".into()))
    }

    //
    // concrete values
    //

    #[must_use]
    pub fn scalar(value: Scalar) -> Self {
        Self {
            kind: value.kind(),
            scalar: Some(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::scalar(Scalar::Text(s.into()))
    }

    #[must_use]
    pub fn int(n: i64) -> Self {
        Self::scalar(Scalar::Int(n))
    }

    #[must_use]
    pub fn float(f: f64) -> Self {
        Self::scalar(Scalar::Float(f))
    }

    #[must_use]
    pub fn boolean(b: bool) -> Self {
        Self::scalar(Scalar::Bool(b))
    }

    #[must_use]
    pub fn null() -> Self {
        Self::scalar(Scalar::Null)
    }

    #[must_use]
    pub fn structure() -> Self {
        Self::of_kind(ValueKind::Struct)
    }

    #[must_use]
    pub fn list(elements: impl IntoIterator<Item = Self>) -> Self {
        Self {
            kind: ValueKind::List,
            elements: Some(elements.into_iter().collect()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn texts<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Self::list(items.into_iter().map(Self::text))
    }

    /// Open list `[...template]`.
    #[must_use]
    pub fn list_of(template: Self) -> Self {
        Self {
            kind: ValueKind::List,
            template: Some(Box::new(template)),
            ..Self::default()
        }
    }

    //
    // builders
    //

    #[must_use]
    pub fn field(mut self, label: impl Into<String>, value: Self) -> Self {
        self.push_field(label, false, value);
        self
    }

    #[must_use]
    pub fn optional(mut self, label: impl Into<String>, value: Self) -> Self {
        self.push_field(label, true, value);
        self
    }

    /// Insert or replace a struct member, turning the node into a struct.
    pub fn push_field(&mut self, label: impl Into<String>, optional: bool, value: Self) {
        let label = label.into();
        self.kind = ValueKind::Struct;

        match self.fields.iter_mut().find(|f| f.label == label) {
            Some(existing) => {
                existing.optional = optional;
                existing.value = value;
            }
            None => self.fields.push(NodeField {
                label,
                optional,
                value,
            }),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Parse and attach `@name(args)`.
    pub fn attr(self, src: &str) -> Result<Self, TreeError> {
        Ok(self.with_attr(Attribute::parse(src)?))
    }

    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.position = Some(Position::new(file, line, column));
        self
    }

    #[must_use]
    pub fn with_ref(mut self, path: impl Into<String>) -> Self {
        self.reference = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Self) -> Self {
        self.default = Some(Box::new(default));
        self
    }

    #[must_use]
    pub fn with_expr(mut self, expr: Expr) -> Self {
        self.expr = Some(expr);
        self
    }

    /// Decode a JSON document. Object keys ending in `?` become optional
    /// members with the marker stripped.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, TreeError> {
        decode_json(value, "")
    }

    pub fn from_json_str(json: &str) -> Result<Self, TreeError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|_| TreeError::Unsupported {
                path: "<document>".to_string(),
            })?;

        Self::from_json(&value)
    }
}

fn decode_json(value: &serde_json::Value, path: &str) -> Result<Node, TreeError> {
    use serde_json::Value as J;

    Ok(match value {
        J::Null => Node::null(),
        J::Bool(b) => Node::boolean(*b),
        J::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Node::int(i),
            (None, Some(f)) => Node::float(f),
            (None, None) => {
                return Err(TreeError::Unsupported {
                    path: path.to_string(),
                });
            }
        },
        J::String(s) => Node::text(s.clone()),
        J::Array(items) => Node::list(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_json(item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        J::Object(map) => {
            let mut node = Node::structure();
            for (key, item) in map {
                let (label, optional) = key
                    .strip_suffix('?')
                    .map_or((key.as_str(), false), |l| (l, true));
                let child_path = if path.is_empty() {
                    label.to_string()
                } else {
                    format!("{path}.{label}")
                };
                node.push_field(label, optional, decode_json(item, &child_path)?);
            }
            node
        }
    })
}

impl ConfigValue for Node {
    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn is_concrete(&self) -> bool {
        self.scalar.is_some() || self.kind == ValueKind::Struct || self.elements.is_some()
    }

    fn fields(&self) -> Vec<TreeField<'_>> {
        self.fields
            .iter()
            .map(|f| TreeField {
                label: &f.label,
                optional: f.optional,
                value: &f.value,
            })
            .collect()
    }

    fn field(&self, label: &str) -> Option<&dyn ConfigValue> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| &f.value as &dyn ConfigValue)
    }

    fn elements(&self) -> Vec<&dyn ConfigValue> {
        self.elements
            .iter()
            .flatten()
            .map(|e| e as &dyn ConfigValue)
            .collect()
    }

    fn element_template(&self) -> Option<&dyn ConfigValue> {
        self.template.as_deref().map(|t| t as &dyn ConfigValue)
    }

    fn as_str(&self) -> Option<&str> {
        self.scalar.as_ref().and_then(Scalar::as_str)
    }

    fn as_int(&self) -> Option<i64> {
        match self.scalar {
            Some(Scalar::Int(n)) => Some(n),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self.scalar {
            Some(Scalar::Bool(b)) => Some(b),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self.scalar {
            Some(Scalar::Float(f)) => Some(f),
            _ => None,
        }
    }

    fn default_value(&self) -> Option<&dyn ConfigValue> {
        if let Some(d) = self.default.as_deref() {
            return Some(d);
        }

        self.scalar.as_ref().map(|_| self as &dyn ConfigValue)
    }

    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> Node {
        Node::structure()
            .field("id", Node::string_type())
            .field(
                "status",
                Node::string_type()
                    .with_default(Node::text("draft"))
                    .with_expr(Expr::Or(vec![Expr::text("draft"), Expr::text("paid")])),
            )
            .optional("note", Node::string_type())
            .field("lines", Node::list_of(Node::structure().with_ref("#OrderLine")))
    }

    #[test]
    fn lookup_walks_dotted_paths() {
        let root = Node::structure().field("app", Node::structure().field("name", Node::text("shop")));

        assert_eq!(root.str_at("app.name"), Some("shop"));
        assert!(root.lookup("app.missing").is_none());
        assert!(root.lookup("").is_none(), "empty path has no target");
    }

    #[test]
    fn fields_keep_declaration_order_and_optionality() {
        let order = order();
        let fields = order.fields();

        let labels: Vec<_> = fields.iter().map(|f| f.label).collect();
        assert_eq!(labels, ["id", "status", "note", "lines"]);
        assert!(fields[2].optional);
    }

    #[test]
    fn default_prefers_disjunction_default() {
        let order = order();
        let status = ConfigValue::field(&order, "status").expect("status exists");

        assert!(!status.is_concrete());
        assert_eq!(status.default_value().and_then(ConfigValue::as_str), Some("draft"));
        assert!(ConfigValue::field(&order, "id").and_then(ConfigValue::default_value).is_none());
        assert!(Node::int(3).default_value().is_some(), "concrete scalars default to themselves");
    }

    #[test]
    fn open_list_exposes_template_reference() {
        let order = order();
        let lines = ConfigValue::field(&order, "lines").expect("lines exists");

        assert!(lines.elements().is_empty());
        assert!(!lines.is_concrete());
        assert_eq!(
            lines.element_template().and_then(ConfigValue::reference),
            Some("#OrderLine")
        );
    }

    #[test]
    fn strings_at_accepts_single_string() {
        let root = Node::structure()
            .field("one", Node::text("a"))
            .field("many", Node::texts(["a", "b"]));

        assert_eq!(root.strings_at("one"), ["a"]);
        assert_eq!(root.strings_at("many"), ["a", "b"]);
        assert!(root.strings_at("none").is_empty());
    }

    #[test]
    fn json_decoding_marks_optional_members() {
        let node = Node::from_json(&json!({
            "name?": "x",
            "limit": 10,
            "ratio": 0.5,
            "tags": ["a", 1],
        }))
        .expect("json should decode");

        let fields = node.fields();
        let name = fields
            .iter()
            .find(|f| f.label == "name")
            .expect("marker is stripped from the label");
        assert!(name.optional);
        assert_eq!(node.int_at("limit"), Some(10));
        assert_eq!(node.float_at("ratio"), Some(0.5));
        assert_eq!(node.float_at("limit"), Some(10.0));
        assert_eq!(node.strings_at("tags"), ["a"], "non-strings are skipped");
    }

    #[test]
    fn json_decoding_keeps_member_order() {
        let node = Node::from_json_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#)
            .expect("json should decode");
        let labels: Vec<_> = node.fields().iter().map(|f| f.label).collect();

        assert_eq!(labels, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn attributes_are_found_by_name() {
        let field = Node::string_type()
            .attr("@db(type=TEXT, unique)")
            .expect("attribute should parse")
            .attr("@secret")
            .expect("attribute should parse");

        assert!(field.has_attribute("secret"));
        assert_eq!(field.attribute("db").and_then(|a| a.get("type")), Some("TEXT"));
        assert!(!field.has_attribute("pii"));
    }

    #[test]
    fn push_field_replaces_existing_label() {
        let mut node = Node::structure().field("a", Node::int(1));
        node.push_field("a", true, Node::int(2));

        assert_eq!(node.fields().len(), 1);
        assert_eq!(node.int_at("a"), Some(2));
    }
}
