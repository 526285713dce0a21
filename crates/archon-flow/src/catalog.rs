//! Action catalogue: the contract of every known flow action.

use archon_ir::flow::{ArgValue, ChildKey, FlowStep, visit_steps};
use convert_case::{Case, Casing};
use std::collections::BTreeSet;

/// Prefixes of action families. An unknown action under one of these is
/// tolerated; anything else is reported as unknown.
pub const KNOWN_PREFIXES: &[&str] = &[
    "repo.",
    "mapping.",
    "logic.",
    "event.",
    "fsm.",
    "flow.",
    "tx.",
    "list.",
    "notification.",
    "audit.",
    "auth.",
    "entity.",
    "field.",
    "str.",
    "enum.",
    "time.",
    "map.",
];

///
/// Violation
///
/// Result of a custom constraint. Location and step context are attached
/// by the validator.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Violation {
    pub code: String,
    pub message: String,
    pub hint: String,
}

impl Violation {
    fn new(code: &str, message: impl Into<String>, hint: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            hint: hint.to_string(),
        }
    }
}

///
/// ActionSpec
///

#[derive(Clone, Copy, Debug)]
pub struct ActionSpec {
    pub action: &'static str,
    pub required_args: &'static [&'static str],
    pub required_children: &'static [ChildKey],

    /// Arguments naming a variable the step introduces.
    pub declares: &'static [&'static str],
    pub requires_tx: bool,
    pub constraint: Option<fn(&FlowStep) -> Option<Violation>>,

    /// Example shown with missing-argument diagnostics.
    pub hint: &'static str,
}

impl ActionSpec {
    const fn new(action: &'static str) -> Self {
        Self {
            action,
            required_args: &[],
            required_children: &[],
            declares: &[],
            requires_tx: false,
            constraint: None,
            hint: "See action contract in flow semantics",
        }
    }

    const fn args(mut self, args: &'static [&'static str]) -> Self {
        self.required_args = args;
        self
    }

    const fn children(mut self, children: &'static [ChildKey]) -> Self {
        self.required_children = children;
        self
    }

    const fn declares(mut self, args: &'static [&'static str]) -> Self {
        self.declares = args;
        self
    }

    const fn tx(mut self) -> Self {
        self.requires_tx = true;
        self
    }

    const fn constraint(mut self, f: fn(&FlowStep) -> Option<Violation>) -> Self {
        self.constraint = Some(f);
        self
    }

    const fn hint(mut self, hint: &'static str) -> Self {
        self.hint = hint;
        self
    }

    /// Missing-argument and missing-child violations for `step`.
    #[must_use]
    pub fn missing(&self, step: &FlowStep) -> Vec<Violation> {
        let args = self
            .required_args
            .iter()
            .filter(|arg| !step.has_arg(arg))
            .map(|arg| self.missing_violation(arg));
        let children = self
            .required_children
            .iter()
            .filter(|key| !step.has_children(**key))
            .map(|key| self.missing_violation(key.label()));

        args.chain(children).collect()
    }

    fn missing_violation(&self, name: &str) -> Violation {
        Violation {
            code: missing_code(name),
            message: format!("{} missing '{name}'", self.action),
            hint: self.hint.to_string(),
        }
    }
}

/// `MISSING_<NAME>` with the name in screaming snake case.
#[must_use]
pub fn missing_code(name: &str) -> String {
    format!("MISSING_{}", name.to_case(Case::Constant))
}

const UPSERT_HINT: &str =
    r#"{action: "repo.Upsert", source: "Entity", find: "FindBy...", input: "...", output: "item"}"#;
const ENRICH_HINT: &str = r#"{action: "list.Enrich", ..., set: "AuthorName=Name,AuthorLogo=Logo"}"#;

// Sorted by action name; `spec_for` relies on it.
static CATALOG: &[ActionSpec] = &[
    ActionSpec::new("audit.Log").args(&["actor", "company", "event"]),
    ActionSpec::new("auth.CheckRole").args(&["user", "roles"]),
    ActionSpec::new("auth.RequireRole")
        .args(&["userID", "companyID", "roles"])
        .declares(&["output"]),
    ActionSpec::new("entity.PatchNonZero").args(&["target", "from", "fields"]),
    ActionSpec::new("entity.PatchValidated")
        .args(&["target", "from"])
        .constraint(patch_validated_rules),
    ActionSpec::new("enum.Validate").args(&["value", "allowed", "throw"]),
    ActionSpec::new("event.Publish").args(&["name"]),
    ActionSpec::new("field.CopyNonEmpty").args(&["from", "to"]),
    ActionSpec::new("flow.Block").children(&[ChildKey::Do]),
    ActionSpec::new("flow.For")
        .args(&["each", "as"])
        .children(&[ChildKey::Do]),
    ActionSpec::new("flow.If")
        .args(&["condition"])
        .children(&[ChildKey::Then]),
    ActionSpec::new("flow.Switch")
        .args(&["value"])
        .constraint(switch_has_case),
    ActionSpec::new("fsm.Transition").args(&["entity", "to"]),
    ActionSpec::new("list.Append").args(&["to", "item"]),
    ActionSpec::new("list.Enrich")
        .args(&["items", "lookupSource", "lookupInput", "set"])
        .constraint(enrich_set_format)
        .hint(r#"{action: "list.Enrich", items: "items", lookupSource: "Company", lookupInput: "item.CompanyID", set: "Name=Name"}"#),
    ActionSpec::new("list.Filter")
        .args(&["from", "condition", "output"])
        .declares(&["output"]),
    ActionSpec::new("list.Paginate")
        .args(&["input", "offset", "limit", "output"])
        .declares(&["output"]),
    ActionSpec::new("list.Sort").args(&["items", "by"]),
    ActionSpec::new("logic.Call")
        .args(&["func"])
        .hint(r#"{action: "logic.Call", func: "DoThing", args: ["a", "b"]}"#),
    ActionSpec::new("logic.Check").args(&["condition", "throw"]),
    ActionSpec::new("map.Build")
        .args(&["from", "key", "value", "output"])
        .declares(&["output"]),
    ActionSpec::new("mapping.Assign")
        .args(&["to", "value"])
        .hint(r#"{action: "mapping.Assign", to: "x.Field", value: "..."}"#),
    ActionSpec::new("mapping.Map").declares(&["output", "to"]),
    ActionSpec::new("notification.Dispatch").args(&["message"]),
    ActionSpec::new("repo.Delete"),
    ActionSpec::new("repo.Find").declares(&["output"]),
    ActionSpec::new("repo.Get").declares(&["output"]),
    ActionSpec::new("repo.GetForUpdate").tx().declares(&["output"]),
    ActionSpec::new("repo.List").declares(&["output"]),
    ActionSpec::new("repo.Query")
        .args(&["method"])
        .declares(&["output"])
        .hint(r#"{action: "repo.Query", source: "Entity", method: "ListBy...", input: "...", output: "items"}"#),
    ActionSpec::new("repo.Save"),
    ActionSpec::new("repo.Upsert")
        .args(&["source", "find", "input", "output"])
        .declares(&["output"])
        .constraint(upsert_has_branch)
        .hint(UPSERT_HINT),
    ActionSpec::new("str.Normalize")
        .args(&["input", "output"])
        .declares(&["output"]),
    ActionSpec::new("time.CheckExpiry").args(&["value", "throw"]),
    ActionSpec::new("time.Parse")
        .args(&["value", "output"])
        .declares(&["output"]),
    ActionSpec::new("tx.Block").children(&[ChildKey::Do]),
];

/// Every catalogued action, sorted by name.
#[must_use]
pub const fn catalog() -> &'static [ActionSpec] {
    CATALOG
}

#[must_use]
pub fn spec_for(action: &str) -> Option<&'static ActionSpec> {
    CATALOG
        .binary_search_by(|spec| spec.action.cmp(action))
        .ok()
        .map(|i| &CATALOG[i])
}

/// Empty actions count as known; they are dropped during parsing.
#[must_use]
pub fn is_known_prefix(action: &str) -> bool {
    action.is_empty() || KNOWN_PREFIXES.iter().any(|p| action.starts_with(p))
}

/// Variables introduced anywhere in `steps`.
#[must_use]
pub fn declared_variables(steps: &[FlowStep]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    visit_steps(steps, &mut |step| {
        let Some(spec) = spec_for(&step.action) else {
            return;
        };
        let named = spec
            .declares
            .iter()
            .map(|arg| step.arg_text(arg))
            .find(|name| !name.is_empty());

        match named {
            Some(name) => {
                out.insert(name.to_string());
            }
            None if step.action == "auth.RequireRole" => {
                out.insert("currentUser".to_string());
            }
            None => {}
        }
    });

    out
}

//
// constraints
//

fn upsert_has_branch(step: &FlowStep) -> Option<Violation> {
    if step.has_children(ChildKey::IfNew) || step.has_children(ChildKey::IfExists) {
        return None;
    }

    Some(Violation::new(
        "MISSING_BRANCHES",
        "repo.Upsert requires at least one branch: ifNew or ifExists",
        r#"{action: "repo.Upsert", ..., ifNew: [ ... ]}"#,
    ))
}

fn switch_has_case(step: &FlowStep) -> Option<Violation> {
    if step.has_children(ChildKey::Cases) {
        return None;
    }

    Some(Violation::new(
        "MISSING_CASES",
        "flow.Switch requires at least one case",
        r#"{action: "flow.Switch", value: "req.Role", cases: {owner: [ ... ]}}"#,
    ))
}

fn enrich_set_format(step: &FlowStep) -> Option<Violation> {
    let raw = step.arg_str("set").unwrap_or_default();
    if raw.trim().is_empty() {
        return Some(Violation::new(
            "MISSING_SET",
            "list.Enrich missing 'set'",
            ENRICH_HINT,
        ));
    }

    let well_formed = raw.split(',').all(|pair| {
        let parts: Vec<&str> = pair.trim().split('=').collect();
        matches!(parts.as_slice(), [target, lookup]
            if !target.is_empty()
                && !lookup.is_empty()
                && *target == target.trim()
                && *lookup == lookup.trim())
    });
    if well_formed {
        return None;
    }

    Some(Violation::new(
        "INVALID_SET_FORMAT",
        "list.Enrich 'set' must be comma-separated TargetField=LookupField pairs without spaces around '='",
        ENRICH_HINT,
    ))
}

fn patch_validated_rules(step: &FlowStep) -> Option<Violation> {
    let fields = match step.arg("fields") {
        Some(ArgValue::Fields(fields)) if !fields.is_empty() => fields,
        _ => {
            return Some(Violation::new(
                "MISSING_FIELDS",
                "entity.PatchValidated requires non-empty 'fields' map",
                r#"{action: "entity.PatchValidated", fields: { Email: { normalize: "lower" } }}"#,
            ));
        }
    };

    for (name, rules) in fields {
        let rule = |key: &str| rules.get(key).map_or("", |v| v.trim());

        if name.trim().is_empty() {
            return Some(Violation::new(
                "INVALID_FIELD_NAME",
                "entity.PatchValidated contains empty field name",
                r#"{action: "entity.PatchValidated", fields: { Email: { ... } }}"#,
            ));
        }
        if !matches!(rule("normalize"), "" | "trim" | "lower" | "upper") {
            return Some(Violation::new(
                "INVALID_NORMALIZE",
                "entity.PatchValidated has invalid normalize rule",
                r#"{ normalize: "trim" | "lower" | "upper" }"#,
            ));
        }
        if !matches!(rule("format"), "" | "email" | "phone") {
            return Some(Violation::new(
                "INVALID_FORMAT",
                "entity.PatchValidated has invalid format rule",
                r#"{ format: "email" | "phone" }"#,
            ));
        }
        let unique = rule("unique");
        if !unique.is_empty() && !unique.starts_with("FindBy") {
            return Some(Violation::new(
                "INVALID_UNIQUE_METHOD",
                "entity.PatchValidated unique method should start with FindBy",
                r#"{ unique: "FindByTaxID" }"#,
            ));
        }
    }

    None
}
