//! Flow validation.
//!
//! Two walks over a method's steps report through one de-duplicating sink:
//! the catalogue walk checks arguments, children and transaction scope; the
//! declarative walk checks entity access and inline code.

#[cfg(test)]
mod tests;

use crate::{
    catalog::{Violation, is_known_prefix, spec_for},
    syntax::{SurfaceSyntax, SyntaxChecker},
};
use archon_diag::{Dedup, DiagnosticKind, DiagnosticSink, Fix, Warning};
use archon_ir::{
    flow::{ArgValue, FlowStep, visit_steps},
    model::Entity,
};
use convert_case::{Case, Casing};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

const REPO_ACTIONS: &[&str] = &[
    "repo.Delete",
    "repo.Find",
    "repo.Get",
    "repo.GetForUpdate",
    "repo.List",
    "repo.Query",
    "repo.Save",
    "repo.Upsert",
];

const STATUS_LITERALS: &[&str] = &[
    "draft",
    "active",
    "pending",
    "published",
    "closed",
    "approved",
    "rejected",
    "cancelled",
];

///
/// EntityInfo
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EntityInfo {
    /// Owning service; empty for shared entities.
    pub owner: String,
    pub dto: bool,
}

///
/// EntityCatalog
///
/// Domain entities visible to flows, keyed by name.
///

#[derive(Clone, Debug, Default)]
pub struct EntityCatalog {
    entities: BTreeMap<String, EntityInfo>,
}

impl EntityCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, info: EntityInfo) {
        self.entities.insert(name.into(), info);
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, owner: impl Into<String>, dto: bool) -> Self {
        self.insert(
            name,
            EntityInfo {
                owner: owner.into(),
                dto,
            },
        );
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityInfo> {
        self.entities.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<'a> FromIterator<&'a Entity> for EntityCatalog {
    fn from_iter<I: IntoIterator<Item = &'a Entity>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for entity in iter {
            catalog.insert(
                entity.name.clone(),
                EntityInfo {
                    owner: entity.owner.clone(),
                    dto: entity.is_dto(),
                },
            );
        }

        catalog
    }
}

///
/// OwnershipPolicy
///
/// Which services may touch which entities through repositories.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnershipPolicy {
    /// Entities any service may access, compared case-insensitively.
    pub shared_entities: BTreeSet<String>,

    /// Services exempt from the rule, compared case-insensitively.
    pub exempt_services: BTreeSet<String>,
}

impl Default for OwnershipPolicy {
    fn default() -> Self {
        Self {
            shared_entities: ["Company", "APIKey"].map(String::from).into(),
            exempt_services: ["admin", "audit"].map(String::from).into(),
        }
    }
}

impl OwnershipPolicy {
    /// Whether `service` may access `entity` owned by `owner`.
    #[must_use]
    pub fn allows(&self, service: &str, entity: &str, owner: &str) -> bool {
        owner.is_empty()
            || self
                .shared_entities
                .iter()
                .any(|s| s.eq_ignore_ascii_case(entity))
            || owner_matches(owner, service)
            || self
                .exempt_services
                .iter()
                .any(|s| s.eq_ignore_ascii_case(service))
    }
}

// Case-insensitive, tolerating one trailing `s` on either side.
fn owner_matches(owner: &str, service: &str) -> bool {
    let owner = owner.to_lowercase();
    let service = service.to_lowercase();

    owner == service || format!("{owner}s") == service || format!("{service}s") == owner
}

///
/// FlowValidator
///

pub struct FlowValidator {
    entities: EntityCatalog,
    policy: OwnershipPolicy,
    checker: Box<dyn SyntaxChecker>,
}

impl fmt::Debug for FlowValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowValidator")
            .field("entities", &self.entities.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FlowValidator {
    #[must_use]
    pub fn new(entities: EntityCatalog) -> Self {
        Self {
            entities,
            policy: OwnershipPolicy::default(),
            checker: Box::new(SurfaceSyntax),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: OwnershipPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_checker(mut self, checker: impl SyntaxChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    #[must_use]
    pub const fn entities(&self) -> &EntityCatalog {
        &self.entities
    }

    /// Validate the flow of `service.op` and report into `sink`. Returns the
    /// number of diagnostics reported.
    pub fn validate<S>(&self, service: &str, op: &str, steps: &[FlowStep], sink: &mut S) -> usize
    where
        S: DiagnosticSink + ?Sized,
    {
        let mut out = Dedup::new(Vec::new());
        let scope = Scope { service, op };

        self.walk_catalog(&scope, steps, false, &mut out);
        self.walk_declarative(&scope, steps, &mut out);

        let warnings = out.into_inner();
        let count = warnings.len();
        for w in warnings {
            sink.report(w);
        }

        let mut total = 0;
        visit_steps(steps, &mut |_| total += 1);
        tracing::debug!(service, op, steps = total, diagnostics = count, "validated flow");

        count
    }

    //
    // catalogue walk
    //

    fn walk_catalog(&self, scope: &Scope<'_>, steps: &[FlowStep], in_tx: bool, out: &mut impl DiagnosticSink) {
        for (i, step) in steps.iter().enumerate() {
            let n = i + 1;

            match spec_for(&step.action) {
                Some(spec) => {
                    let violations = spec.missing(step).into_iter().chain(spec.constraint.and_then(|f| f(step)));
                    for v in violations {
                        out.report(scope.violation(v, step, n));
                    }

                    if spec.requires_tx && !in_tx {
                        out.report(
                            scope
                                .warning("TX_REQUIRED", format!("{} outside tx.Block", step.action), step, n)
                                .hint(r#"{action: "tx.Block", do: [ ... ]}"#),
                        );
                    }
                }
                None if !is_known_prefix(&step.action) => {
                    out.report(
                        scope
                            .warning("UNKNOWN_ACTION", format!("unknown action '{}'", step.action), step, n)
                            .hint(r#"{action: "repo.Find" | "mapping.Assign" | "flow.If" ...}"#),
                    );
                }
                None => {}
            }

            let child_tx = in_tx || step.action == "tx.Block";
            for children in step.child_lists() {
                self.walk_catalog(scope, children, child_tx, out);
            }
        }
    }

    //
    // declarative walk
    //

    fn walk_declarative(&self, scope: &Scope<'_>, steps: &[FlowStep], out: &mut impl DiagnosticSink) {
        for (i, step) in steps.iter().enumerate() {
            let n = i + 1;
            for w in self.check_step(scope, step, n) {
                out.report(w);
            }

            for children in step.child_lists() {
                self.walk_declarative(scope, children, out);
            }
        }
    }

    fn check_step(&self, scope: &Scope<'_>, step: &FlowStep, n: usize) -> Vec<Warning> {
        let mut found = Vec::new();
        let action = step.action.as_str();

        match action {
            a if REPO_ACTIONS.contains(&a) => {
                found.extend(self.check_access(scope, step, step.arg_text("source"), n));
            }
            "list.Enrich" => {
                found.extend(self.check_access(scope, step, step.arg_text("lookupSource"), n));
            }
            "mapping.Map" => {
                let output = match step.arg_text("output") {
                    "" => step.arg_text("to"),
                    o => o,
                };
                let is_new = output.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("new"));
                if is_new && !step.has_arg("entity") {
                    found.push(
                        scope
                            .warning("MISSING_ENTITY", format!("mapping.Map '{output}' missing 'entity'"), step, n)
                            .hint(format!(
                                r#"{{action: "mapping.Map", output: "{output}", entity: "Entity"}}"#
                            )),
                    );
                }
            }
            "mapping.Assign" => {
                let value = step.arg_text("value");
                found.extend(self.check_code(scope, step, value, n));
                if let Some(w) = status_literal(scope, step, value, n) {
                    found.push(w);
                }
            }
            "event.Publish" => {
                let payload = step.arg_text("payload");
                if !payload.is_empty() && !payload.starts_with("domain.") {
                    found.push(
                        scope
                            .warning(
                                "PAYLOAD_NOT_DOMAIN",
                                format!("event.Publish payload should use domain.{payload}{{...}}"),
                                step,
                                n,
                            )
                            .hint(r#"{action: "event.Publish", name: "OrderCreated", payload: "domain.OrderCreated{...}"}"#),
                    );
                }
            }
            "logic.Check" | "flow.If" => {
                found.extend(self.check_code(scope, step, step.arg_text("condition"), n));
            }
            "entity.PatchValidated" => {
                if has_unique_rule(step) && !step.has_arg("source") {
                    found.push(
                        scope
                            .warning(
                                "MISSING_SOURCE",
                                "entity.PatchValidated with unique checks requires explicit 'source' repository entity",
                                step,
                                n,
                            )
                            .hint(r#"{action: "entity.PatchValidated", source: "Company", ...}"#),
                    );
                }
            }
            _ => {}
        }

        found
    }

    fn check_access(&self, scope: &Scope<'_>, step: &FlowStep, entity: &str, n: usize) -> Vec<Warning> {
        let mut found = Vec::new();
        if entity.is_empty() {
            return found;
        }

        let Some(info) = self.entities.get(entity) else {
            found.push(
                scope
                    .warning(
                        "UNKNOWN_ENTITY",
                        format!("Entity '{entity}' is not defined in any domain definition"),
                        step,
                        n,
                    )
                    .hint("Define the entity in the domain schema or check spelling"),
            );
            return found;
        };

        // A DTO hit still gets the ownership check.
        if info.dto {
            found.push(
                scope
                    .warning(
                        "DTO_AS_REPO",
                        format!("Entity '{entity}' is a DTO-only entity and cannot be accessed via repository"),
                        step,
                        n,
                    )
                    .hint("Remove @dto(only=true) or use a real domain entity"),
            );
        }

        if !self.policy.allows(scope.service, entity, &info.owner) {
            let mut w = scope
                .warning(
                    "ARCHITECTURE_VIOLATION",
                    format!(
                        "Service '{}' is not allowed to directly access entity '{entity}' (owned by '{}')",
                        scope.service, info.owner
                    ),
                    step,
                    n,
                )
                .hint(format!("Use events or call {}Service", info.owner.to_case(Case::Pascal)));
            w.kind = DiagnosticKind::Architecture;
            found.push(w);
        }

        found
    }

    fn check_code(&self, scope: &Scope<'_>, step: &FlowStep, code: &str, n: usize) -> Option<Warning> {
        let err = self.checker.check(code).err()?;

        Some(
            scope
                .warning(
                    "GO_SYNTAX_ERROR",
                    format!("{}: inline code has invalid syntax: {err}", step.action),
                    step,
                    n,
                )
                .hint("Check the inline code syntax inside the string."),
        )
    }
}

fn status_literal(scope: &Scope<'_>, step: &FlowStep, value: &str, n: usize) -> Option<Warning> {
    if value.is_empty() || value.contains(['"', '.', '(']) {
        return None;
    }
    if !STATUS_LITERALS.contains(&value.to_lowercase().as_str()) {
        return None;
    }

    let quoted = format!("\"{value}\"");
    let fix = Fix::replace(&quoted)
        .with_rationale("status values are string literals")
        .at(&step.location);

    Some(
        scope
            .warning(
                "NEEDS_QUOTES",
                format!(r#"mapping.Assign '{value}' needs quotes: "\"{value}\"""#),
                step,
                n,
            )
            .hint(format!("value: {quoted:?}"))
            .auto_fix(fix),
    )
}

fn has_unique_rule(step: &FlowStep) -> bool {
    match step.arg("fields") {
        Some(ArgValue::Fields(fields)) => fields
            .values()
            .any(|rules| rules.get("unique").is_some_and(|u| !u.trim().is_empty())),
        _ => false,
    }
}

///
/// Scope
///

struct Scope<'a> {
    service: &'a str,
    op: &'a str,
}

impl Scope<'_> {
    fn warning(&self, code: &str, message: impl Into<String>, step: &FlowStep, n: usize) -> Warning {
        Warning::flow(code, message)
            .op(self.op)
            .step(n)
            .action(&step.action)
            .at(&step.location)
    }

    fn violation(&self, v: Violation, step: &FlowStep, n: usize) -> Warning {
        self.warning(&v.code, v.message, step, n).hint(v.hint)
    }
}
