//! Flow parsing from the configuration tree.

use crate::{autocomplete::autocomplete, error::FlowError};
use archon_ir::{
    flow::{ArgValue, ChildKey, FlowStep, Location},
    model::Attribute,
    value::Value,
};
use archon_tree::{self as tree, ConfigValue, ValueKind};
use std::{collections::BTreeMap, path::PathBuf};

///
/// ParseContext
///

#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    /// Project root; step file names are made relative to it.
    pub root: Option<PathBuf>,

    /// Tree path of the flow list, e.g. `CreateOrder.flow`.
    pub path: String,
}

impl ParseContext {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            root: None,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn child(&self, segment: &str) -> Self {
        Self {
            root: self.root.clone(),
            path: format!("{}.{segment}", self.path),
        }
    }

    /// Location of `value` with its file made root-relative.
    #[must_use]
    pub fn location(&self, value: &dyn ConfigValue, path: impl Into<String>) -> Location {
        let location = match value.position() {
            Some(pos) => {
                let pos = self.root.as_ref().map_or_else(|| pos.clone(), |r| pos.relative_to(r));
                Location::new(pos.file, pos.line, pos.column)
            }
            None => Location::default(),
        };

        location.with_path(path)
    }
}

/// Parse a flow list and auto-complete it.
pub fn parse_steps(value: &dyn ConfigValue, ctx: &ParseContext) -> Result<Vec<FlowStep>, FlowError> {
    parse_raw(value, ctx).map(autocomplete)
}

/// Parse a flow list without auto-completion.
pub fn parse_raw(value: &dyn ConfigValue, ctx: &ParseContext) -> Result<Vec<FlowStep>, FlowError> {
    if value.kind() != ValueKind::List {
        return Err(FlowError::NotAList {
            path: ctx.path.clone(),
        });
    }

    let mut steps = Vec::new();
    for (i, item) in value.elements().into_iter().enumerate() {
        let action = item.string_at("action");
        if action.is_empty() {
            continue;
        }

        let path = format!("{}[{i}]", ctx.path);
        let mut step = FlowStep::new(action).at(ctx.location(item, &path));
        step.attributes = item.attributes().iter().map(ir_attribute).collect();

        read_args(&mut step, item);
        if step.action == "logic.Call" {
            normalize_call_args(&mut step);
        }
        read_children(&mut step, item, &ParseContext {
            root: ctx.root.clone(),
            path,
        });

        steps.push(step);
    }

    Ok(steps)
}

fn read_args(step: &mut FlowStep, item: &dyn ConfigValue) {
    for field in item.fields() {
        let label = field.label;
        if label == "action" || label.starts_with('#') || ChildKey::from_label(label).is_some() {
            continue;
        }

        let value = field.value;
        if step.action == "entity.PatchValidated" && label == "fields" {
            if value.kind() == ValueKind::Struct {
                let rules = read_field_rules(value);
                if !rules.is_empty() {
                    step.args.insert(label.to_string(), ArgValue::Fields(rules));
                }
            }
            continue;
        }
        if !value.is_concrete() && value.kind() != ValueKind::List {
            continue;
        }

        let arg = match value.kind() {
            ValueKind::List => {
                let items: Vec<String> = value
                    .elements()
                    .into_iter()
                    .filter_map(|e| e.scalar_text())
                    .collect();
                if label == "params" {
                    step.params = items;
                    continue;
                }
                ArgValue::List(items)
            }
            ValueKind::Bool => match value.as_bool() {
                Some(b) => ArgValue::Bool(b),
                None => continue,
            },
            ValueKind::String | ValueKind::Int | ValueKind::Float | ValueKind::Number => {
                match value.scalar_text() {
                    Some(s) => ArgValue::Text(s),
                    None => continue,
                }
            }
            _ => continue,
        };

        // Hidden labels are also visible under their plain name.
        if let Some(plain) = label.strip_prefix('_') {
            step.args.insert(plain.to_string(), arg.clone());
        }
        step.args.insert(label.to_string(), arg);
    }
}

// field -> rule -> value; booleans become "true" / "false".
fn read_field_rules(value: &dyn ConfigValue) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for field in value.fields() {
        if field.value.kind() != ValueKind::Struct {
            continue;
        }

        let rules: BTreeMap<String, String> = field
            .value
            .fields()
            .into_iter()
            .filter_map(|rule| {
                let text = match rule.value.kind() {
                    ValueKind::String => rule.value.as_str().map(ToString::to_string),
                    ValueKind::Bool => rule.value.as_bool().map(|b| b.to_string()),
                    _ => None,
                }?;
                Some((rule.label.trim_matches('"').to_string(), text))
            })
            .collect();

        if !rules.is_empty() {
            out.insert(field.label.trim_matches('"').to_string(), rules);
        }
    }

    out
}

// `logic.Call` args are always a list of strings.
fn normalize_call_args(step: &mut FlowStep) {
    let args = match step.args.remove("args") {
        Some(ArgValue::Text(s)) if !s.is_empty() => vec![s],
        Some(ArgValue::List(items)) => items.into_iter().filter(|s| !s.is_empty()).collect(),
        _ => Vec::new(),
    };
    step.args.insert("args".to_string(), ArgValue::List(args));
}

fn read_children(step: &mut FlowStep, item: &dyn ConfigValue, ctx: &ParseContext) {
    for key in ChildKey::ALL {
        let Some(value) = item.field(key.label()) else {
            continue;
        };

        if key == ChildKey::Cases {
            if value.kind() != ValueKind::Struct {
                continue;
            }
            let cases_ctx = ctx.child(key.label());
            for case in value.fields() {
                let label = case.label.trim_matches('"');
                if let Ok(branch) = parse_raw(case.value, &cases_ctx.child(label)) {
                    step.set_case(label, branch);
                }
            }
            continue;
        }

        if let Ok(children) = parse_raw(value, &ctx.child(key.label())) {
            step.set_children(key, children);
        }
    }
}

/// Tree attribute in IR form. Bare arguments become `true` flags and the
/// first one is also stored under `_`.
#[must_use]
pub fn ir_attribute(attr: &tree::Attribute) -> Attribute {
    let mut out = Attribute::new(attr.name.clone());
    for arg in &attr.args {
        match &arg.key {
            Some(key) => {
                out.args.insert(key.clone(), Value::text(arg.value.clone()));
            }
            None => {
                if !out.args.contains_key("_") {
                    out.args.insert("_".to_string(), Value::text(arg.value.clone()));
                }
                out.args.insert(arg.value.clone(), Value::Bool(true));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_tree::Node;

    fn step(action: &str) -> Node {
        Node::structure().field("action", Node::text(action))
    }

    fn parse(flow: Node) -> Vec<FlowStep> {
        parse_raw(&flow, &ParseContext::new("CreateOrder.flow")).expect("flow should parse")
    }

    #[test]
    fn steps_without_action_are_skipped() {
        let steps = parse(Node::list([
            Node::structure().field("output", Node::text("x")),
            step("repo.Find").field("source", Node::text("Order")),
        ]));

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].arg_str("source"), Some("Order"));
        assert_eq!(steps[0].location.path, "CreateOrder.flow[1]", "index counts skipped items");
    }

    #[test]
    fn non_list_flow_is_an_error() {
        let err = parse_raw(&step("repo.Find"), &ParseContext::new("Op.flow"))
            .expect_err("struct is not a flow");

        assert_eq!(err.to_string(), "Op.flow: flow must be a list of steps");
    }

    #[test]
    fn children_are_stored_under_prefixed_keys() {
        let flow = Node::list([step("flow.If")
            .field("condition", Node::text("req.Total > 0"))
            .field("then", Node::list([step("repo.Save").field("input", Node::text("order"))]))
            .field("else", Node::list([step("logic.Check")]))]);

        let steps = parse(flow);
        let then = steps[0].children(ChildKey::Then).expect("then branch");

        assert_eq!(then[0].action, "repo.Save");
        assert_eq!(then[0].location.path, "CreateOrder.flow[0].then[0]");
        assert!(steps[0].has_children(ChildKey::Else));
        assert!(steps[0].arg("then").is_none(), "child labels are not plain args");
    }

    #[test]
    fn cases_are_parsed_per_label() {
        let flow = Node::list([step("flow.Switch")
            .field("value", Node::text("req.Role"))
            .field(
                "cases",
                Node::structure()
                    .field("owner", Node::list([step("repo.Find")]))
                    .field("ignored", Node::text("not a list")),
            )]);

        let steps = parse(flow);
        let cases = steps[0].cases().expect("cases parsed");

        assert_eq!(cases.keys().collect::<Vec<_>>(), ["owner"]);
        assert_eq!(cases["owner"][0].location.path, "CreateOrder.flow[0].cases.owner[0]");
    }

    #[test]
    fn hidden_labels_are_duplicated_and_params_split_out() {
        let flow = Node::list([step("logic.Call")
            .field("func", Node::text("Notify"))
            .field("_async", Node::boolean(true))
            .field("params", Node::texts(["ctx", "req"]))
            .field("args", Node::text("order"))]);

        let steps = parse(flow);

        assert_eq!(steps[0].arg("async"), Some(&ArgValue::Bool(true)));
        assert_eq!(steps[0].arg("_async"), Some(&ArgValue::Bool(true)));
        assert_eq!(steps[0].params, ["ctx", "req"]);
        assert_eq!(
            steps[0].arg("args"),
            Some(&ArgValue::List(vec!["order".to_string()])),
            "logic.Call args are normalized to a list"
        );
    }

    #[test]
    fn abstract_values_are_skipped() {
        let flow = Node::list([step("repo.Find").field("output", Node::string_type())]);

        assert!(parse(flow)[0].arg("output").is_none());
    }

    #[test]
    fn patch_validated_fields_become_rule_maps() {
        let flow = Node::list([step("entity.PatchValidated").field(
            "fields",
            Node::structure()
                .field(
                    "Email",
                    Node::structure()
                        .field("normalize", Node::text("lower"))
                        .field("required", Node::boolean(true)),
                )
                .field("Empty", Node::structure()),
        )]);

        let steps = parse(flow);
        let Some(ArgValue::Fields(fields)) = steps[0].arg("fields") else {
            panic!("fields should be a rule map: {:?}", steps[0].args);
        };

        assert_eq!(fields.len(), 1, "fields without rules are dropped");
        assert_eq!(fields["Email"]["normalize"], "lower");
        assert_eq!(fields["Email"]["required"], "true");
    }

    #[test]
    fn locations_are_made_root_relative() {
        let flow = Node::list([step("repo.Find").at("/app/api/orders.cue", 7, 5)]);
        let ctx = ParseContext::new("Op.flow").with_root("/app");

        let steps = parse_raw(&flow, &ctx).expect("flow should parse");

        assert_eq!(steps[0].location.file, "api/orders.cue");
        assert_eq!(steps[0].location.line, 7);
    }

    #[test]
    fn bare_attribute_args_become_flags() {
        let attr = tree::Attribute::parse("@db(type=TEXT, unique)").expect("attribute parses");
        let ir = ir_attribute(&attr);

        assert_eq!(ir.arg_str("type"), Some("TEXT"));
        assert!(ir.arg_flag("unique"));
        assert_eq!(ir.arg_str("_"), Some("unique"));
    }
}
