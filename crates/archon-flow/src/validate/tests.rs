use super::*;
use crate::syntax::NoSyntaxCheck;
use archon_diag::{CollectSink, FixKind};
use archon_ir::flow::{ChildKey, Location};

fn entities() -> EntityCatalog {
    EntityCatalog::new()
        .with("Order", "Orders", false)
        .with("Invoice", "Billing", false)
        .with("Company", "Accounts", false)
        .with("Tag", "", false)
        .with("OrderView", "Orders", true)
}

fn run(service: &str, steps: &[FlowStep]) -> CollectSink {
    let mut sink = CollectSink::new();
    FlowValidator::new(entities()).validate(service, "Op", steps, &mut sink);
    sink
}

fn at(line: u32) -> Location {
    Location::new("api/service.cue", line, 5)
}

fn get_for_update() -> FlowStep {
    FlowStep::new("repo.GetForUpdate")
        .with_arg("source", "Order")
        .with_arg("output", "order")
        .at(at(3))
}

#[test]
fn get_for_update_requires_transaction() {
    let sink = run("Orders", &[get_for_update()]);

    assert_eq!(sink.codes(), ["TX_REQUIRED"]);
    let w = &sink.warnings()[0];
    assert_eq!(w.message, "repo.GetForUpdate outside tx.Block");
    assert_eq!((w.op.as_str(), w.step, w.line), ("Op", 1, 3));
}

#[test]
fn tx_block_satisfies_transaction_scope() {
    let flow = [FlowStep::new("tx.Block").with_children(ChildKey::Do, vec![get_for_update()])];

    let sink = run("Orders", &flow);

    assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.codes());
}

#[test]
fn transaction_scope_reaches_nested_branches() {
    let inner = FlowStep::new("flow.If")
        .with_arg("condition", "req.Lock")
        .with_children(ChildKey::Then, vec![get_for_update()]);
    let flow = [FlowStep::new("tx.Block").with_children(ChildKey::Do, vec![inner])];

    assert!(run("Orders", &flow).is_empty());
}

#[test]
fn upsert_needs_a_branch() {
    let upsert = FlowStep::new("repo.Upsert")
        .with_arg("source", "Order")
        .with_arg("find", "FindByCode")
        .with_arg("input", "req.Code")
        .with_arg("output", "order");

    assert_eq!(run("Orders", &[upsert.clone()]).codes(), ["MISSING_BRANCHES"]);

    let with_branch = upsert.with_children(
        ChildKey::IfNew,
        vec![FlowStep::new("repo.Save").with_arg("source", "Order")],
    );
    assert!(run("Orders", &[with_branch]).is_empty());
}

#[test]
fn foreign_entity_access_is_an_architecture_violation() {
    let find = FlowStep::new("repo.Find")
        .with_arg("source", "Invoice")
        .with_arg("output", "invoice");

    let sink = run("Reporting", &[find.clone()]);

    assert_eq!(sink.codes(), ["ARCHITECTURE_VIOLATION"]);
    let w = &sink.warnings()[0];
    assert_eq!(w.kind, DiagnosticKind::Architecture);
    assert!(w.hint.contains("BillingService"), "hint should name the owner: {}", w.hint);

    assert!(run("Billing", &[find]).is_empty(), "owner may access its entity");
}

#[test]
fn ownership_tolerates_plural_and_exempt_services() {
    let find = FlowStep::new("repo.Find").with_arg("source", "Order");

    for service in ["orders", "Order", "Admin", "audit"] {
        let sink = run(service, std::slice::from_ref(&find));
        assert!(sink.is_empty(), "{service} should be allowed: {:?}", sink.codes());
    }
}

#[test]
fn shared_entities_are_open_to_every_service() {
    let flow = [
        FlowStep::new("repo.Find").with_arg("source", "Company").at(at(1)),
        FlowStep::new("repo.Find").with_arg("source", "Tag").at(at(2)),
    ];

    assert!(run("Reporting", &flow).is_empty());
}

#[test]
fn shared_whitelist_is_configurable() {
    let policy = OwnershipPolicy {
        shared_entities: BTreeSet::from(["Invoice".to_string()]),
        ..OwnershipPolicy::default()
    };
    let mut sink = CollectSink::new();
    let flow = [FlowStep::new("repo.Find").with_arg("source", "Invoice")];

    FlowValidator::new(entities())
        .with_policy(policy)
        .validate("Reporting", "Op", &flow, &mut sink);

    assert!(sink.is_empty());
}

#[test]
fn shared_whitelist_ignores_case() {
    let policy = OwnershipPolicy {
        shared_entities: BTreeSet::from(["invoice".to_string()]),
        ..OwnershipPolicy::default()
    };
    let mut sink = CollectSink::new();
    let flow = [FlowStep::new("repo.Find").with_arg("source", "Invoice")];

    FlowValidator::new(entities())
        .with_policy(policy)
        .validate("Reporting", "Op", &flow, &mut sink);

    assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.codes());
}

#[test]
fn foreign_dto_access_reports_both_problems() {
    let flow = [FlowStep::new("repo.List").with_arg("source", "OrderView").at(at(4))];

    let sink = run("Reporting", &flow);

    assert_eq!(sink.codes(), ["DTO_AS_REPO", "ARCHITECTURE_VIOLATION"]);
}

#[test]
fn unknown_and_dto_entities_are_reported() {
    let flow = [
        FlowStep::new("repo.Find").with_arg("source", "Ghost").at(at(1)),
        FlowStep::new("repo.List").with_arg("source", "OrderView").at(at(2)),
        FlowStep::new("list.Enrich")
            .with_arg("items", "orders")
            .with_arg("lookupSource", "Invoice")
            .with_arg("lookupInput", "o.InvoiceID")
            .with_arg("set", "Total=Total")
            .at(at(3)),
    ];

    let sink = run("Orders", &flow);

    assert_eq!(sink.codes(), ["UNKNOWN_ENTITY", "DTO_AS_REPO", "ARCHITECTURE_VIOLATION"]);
}

#[test]
fn unknown_action_outside_known_families() {
    let flow = [
        FlowStep::new("http.Get").at(at(1)),
        FlowStep::new("repo.Archive").at(at(2)),
    ];

    let sink = run("Orders", &flow);

    assert_eq!(sink.codes(), ["UNKNOWN_ACTION"], "known families tolerate new actions");
    assert_eq!(sink.warnings()[0].message, "unknown action 'http.Get'");
}

#[test]
fn bare_status_literal_gets_a_quoting_fix() {
    let step = FlowStep::new("mapping.Assign")
        .with_arg("to", "order.Status")
        .with_arg("value", "Draft")
        .at(at(9).with_path("Orders.CreateOrder.flow[0]"));

    let sink = run("Orders", &[step]);

    assert_eq!(sink.codes(), ["NEEDS_QUOTES"]);
    let w = &sink.warnings()[0];
    assert!(w.can_auto_apply);
    assert_eq!(w.suggested_fix[0].kind, FixKind::Replace);
    assert_eq!(w.suggested_fix[0].text, "\"Draft\"");
    assert_eq!(w.suggested_fix[0].path, "Orders.CreateOrder.flow[0]");
}

#[test]
fn quoted_and_qualified_values_pass_the_status_guard() {
    for value in ["\"draft\"", "domain.StatusDraft", "strings.ToLower(x)", "total"] {
        let step = FlowStep::new("mapping.Assign")
            .with_arg("to", "order.Status")
            .with_arg("value", value);
        let sink = run("Orders", &[step]);
        assert!(sink.is_empty(), "{value}: {:?}", sink.codes());
    }
}

#[test]
fn inline_code_is_syntax_checked() {
    let flow = [
        FlowStep::new("mapping.Assign")
            .with_arg("to", "order.Total")
            .with_arg("value", "sum(lines")
            .at(at(1)),
        FlowStep::new("logic.Check")
            .with_arg("condition", "{{.Guard}} &&")
            .with_arg("throw", "ErrDenied")
            .at(at(2)),
    ];

    let sink = run("Orders", &flow);
    assert_eq!(sink.codes(), ["GO_SYNTAX_ERROR"], "template placeholders are skipped");

    let mut relaxed = CollectSink::new();
    FlowValidator::new(entities())
        .with_checker(NoSyntaxCheck)
        .validate("Orders", "Op", &flow, &mut relaxed);
    assert!(relaxed.is_empty());
}

#[test]
fn new_mapping_needs_an_entity() {
    let flow = [FlowStep::new("mapping.Map").with_arg("to", "newOrder")];

    let sink = run("Orders", &flow);

    assert_eq!(sink.codes(), ["MISSING_ENTITY"]);
    assert!(sink.warnings()[0].hint.contains(r#"output: "newOrder""#));
}

#[test]
fn publish_payload_should_be_a_domain_type() {
    let flow = [FlowStep::new("event.Publish")
        .with_arg("name", "OrderCreated")
        .with_arg("payload", "OrderCreated{ID: order.ID}")];

    assert_eq!(run("Orders", &flow).codes(), ["PAYLOAD_NOT_DOMAIN"]);
}

#[test]
fn unique_patch_rules_require_a_source() {
    let rules = BTreeMap::from([("unique".to_string(), "FindByTaxID".to_string())]);
    let fields = BTreeMap::from([("TaxID".to_string(), rules)]);
    let step = FlowStep::new("entity.PatchValidated")
        .with_arg("target", "company")
        .with_arg("from", "req")
        .with_arg("fields", ArgValue::Fields(fields));

    assert_eq!(run("Accounts", &[step.clone()]).codes(), ["MISSING_SOURCE"]);
    assert!(run("Accounts", &[step.with_arg("source", "Company")]).is_empty());
}

#[test]
fn duplicate_findings_are_reported_once() {
    // `set` is both a required argument and checked by the format rule.
    let flow = [FlowStep::new("list.Enrich")
        .with_arg("items", "orders")
        .with_arg("lookupSource", "Tag")
        .with_arg("lookupInput", "o.TagID")
        .at(at(4))];

    let sink = run("Orders", &flow);

    assert_eq!(sink.codes(), ["MISSING_SET"]);
}

#[test]
fn validate_returns_the_reported_count() {
    let mut sink: Vec<Warning> = Vec::new();
    let flow = [FlowStep::new("flow.If").at(at(1))];

    let count = FlowValidator::new(entities()).validate("Orders", "Op", &flow, &mut sink);

    assert_eq!(count, 2);
    assert_eq!(sink.len(), 2, "MISSING_CONDITION and MISSING_THEN");
}

#[test]
fn catalog_builds_from_ir_entities() {
    let order = Entity {
        owner: "Orders".into(),
        ..Entity::new("Order")
    };
    let catalog: EntityCatalog = [&order].into_iter().collect();

    assert_eq!(catalog.get("Order").map(|e| e.owner.as_str()), Some("Orders"));
    assert!(!catalog.contains("Invoice"));
}
