use super::*;
use archon_ir::model::{
    Endpoint, FieldUi, Finder, Fsm, Method, NotificationChannelSpec, NotificationChannels,
    NotificationPolicies, NotificationPolicyRule, NotificationsConfig, Repository, Source, Template,
    TypeKind, TypeRef, WhereClause,
};

fn order() -> Entity {
    Entity {
        fields: vec![
            Field::new("id", TypeRef::scalar(TypeKind::String)),
            Field::new("customer_id", TypeRef::scalar(TypeKind::Uuid)),
            Field::new("lines", TypeRef::list(TypeRef::entity("OrderLine"))),
        ],
        ..Entity::new("Order")
    }
}

fn line() -> Entity {
    Entity {
        fields: vec![Field::new("qty", TypeRef::scalar(TypeKind::Int))],
        ..Entity::new("OrderLine")
    }
}

fn base() -> Schema {
    let mut svc = Service::new("Orders");
    svc.methods.push(Method::new("GetOrder"));

    Schema {
        entities: vec![order(), line()],
        services: vec![svc],
        ..Schema::default()
    }
}

fn issues(schema: &Schema) -> Vec<String> {
    validate_semantics(schema).map_or_else(|e| e.issues(), |()| Vec::new())
}

fn email(id: &str) -> Template {
    Template {
        id: id.to_string(),
        channel: "email".to_string(),
        subject: "Welcome {{ .User.Name }}".to_string(),
        text: "Hello {{ .User.Name }}".to_string(),
        required_vars: vec!["User".to_string()],
        ..Template::default()
    }
}

#[test]
fn well_formed_schema_passes() {
    let result = validate_semantics(&base());

    assert!(result.is_ok(), "unexpected error: {result:?}");
}

#[test]
fn type_refs_are_checked_recursively() {
    let mut schema = base();
    schema.entities[0].fields.extend([
        Field::new("ghost", TypeRef::entity("Ghost")),
        Field::new("tags", TypeRef::list(TypeRef::entity(""))),
        Field {
            ty: TypeRef {
                kind: TypeKind::Map,
                item: Some(Box::new(TypeRef::scalar(TypeKind::String))),
                ..TypeRef::default()
            },
            ..Field::new("attrs", TypeRef::default())
        },
        Field::new("blob", TypeRef::scalar(TypeKind::Other("blob".to_string()))),
    ]);

    assert_eq!(
        issues(&schema),
        vec![
            "entity Order field attrs: map type has no key/item type",
            "entity Order field blob: has unsupported type kind \"blob\"",
            "entity Order field ghost: references unknown entity type \"Ghost\"",
            "entity Order field tags[]: has entity type without name",
        ]
    );
}

#[test]
fn method_fields_and_sources_are_checked() {
    let mut schema = base();
    let m = &mut schema.services[0].methods[0];
    m.output
        .fields
        .push(Field::new("order", TypeRef::entity("Orderr")));
    m.sources.push(Source {
        entity: "Invoice".to_string(),
        ..Source::default()
    });

    assert_eq!(
        issues(&schema),
        vec![
            "service Orders method GetOrder output field order: references unknown entity type \"Orderr\"",
            "service Orders method GetOrder: source references unknown entity \"Invoice\"",
        ]
    );
}

#[test]
fn repository_columns_compare_normalized() {
    let mut schema = base();
    schema.repos = vec![
        Repository {
            name: "OrderRepo".to_string(),
            entity: "Order".to_string(),
            finders: vec![Finder {
                name: "ByCustomer".to_string(),
                select: vec!["ID".to_string(), "total".to_string()],
                where_clauses: vec![WhereClause {
                    field: "customer-id".to_string(),
                    ..WhereClause::default()
                }],
                ..Finder::default()
            }],
            ..Repository::default()
        },
        Repository {
            name: "GhostRepo".to_string(),
            entity: "Ghost".to_string(),
            ..Repository::default()
        },
    ];

    assert_eq!(
        issues(&schema),
        vec![
            "repository GhostRepo: references unknown entity \"Ghost\"",
            "repository OrderRepo finder ByCustomer: select field \"total\" does not exist on entity Order",
        ]
    );
}

#[test]
fn entity_names_must_be_unique() {
    let mut schema = base();
    schema.entities.push(line());

    assert_eq!(issues(&schema), vec!["entity \"OrderLine\" is duplicated"]);
}

#[test]
fn owners_must_name_a_declared_service() {
    let mut schema = base();
    schema.entities[0].owner = "orders".to_string();
    schema.entities[1].owner = "Billing".to_string();

    assert_eq!(
        issues(&schema),
        vec!["entity OrderLine: owner \"Billing\" is not a known service"],
        "plural and case differences still resolve"
    );
}

#[test]
fn fsm_transitions_stay_within_declared_states() {
    let mut schema = base();
    schema.entities[0].fsm = Some(Fsm {
        field: "status".to_string(),
        states: vec!["draft".to_string(), "paid".to_string()],
        transitions: [
            ("draft".to_string(), vec!["paid".to_string(), "paid".to_string()]),
            ("paid".to_string(), vec!["refunded".to_string()]),
        ]
        .into(),
    });

    assert_eq!(
        issues(&schema),
        vec![
            "entity Order fsm: duplicate transition \"draft\" -> \"paid\"",
            "entity Order fsm: transition references undeclared state \"refunded\"",
        ]
    );
}

#[test]
fn endpoint_routes_must_be_unique() {
    let get = || Endpoint {
        service: "Orders".to_string(),
        rpc: "GetOrder".to_string(),
        ..Endpoint::new("GET", "/orders/{id}")
    };
    let mut schema = base();
    schema.endpoints = vec![
        get(),
        Endpoint {
            method: "get".to_string(),
            ..get()
        },
        Endpoint::new("DELETE", "/orders/{id}"),
    ];
    schema.endpoints[2].service = "Orders".to_string();
    schema.endpoints[2].rpc = "GetOrder".to_string();

    assert_eq!(issues(&schema), vec!["endpoint GET /orders/{id} is duplicated"]);
}

#[test]
fn finder_names_are_unique_per_repository() {
    let finder = |name: &str| Finder {
        name: name.to_string(),
        select: vec!["id".to_string()],
        ..Finder::default()
    };
    let mut schema = base();
    schema.repos = vec![
        Repository {
            name: "OrderRepo".to_string(),
            entity: "Order".to_string(),
            finders: vec![finder("ById"), finder("ById"), finder("ByCustomer")],
            ..Repository::default()
        },
        Repository {
            name: "OrderArchive".to_string(),
            entity: "Order".to_string(),
            finders: vec![finder("ById")],
            ..Repository::default()
        },
    ];

    assert_eq!(
        issues(&schema),
        vec!["repository OrderRepo: finder \"ById\" is duplicated"]
    );
}

#[test]
fn endpoints_must_resolve_to_an_rpc() {
    let mut schema = base();
    schema.endpoints = vec![
        Endpoint {
            service: "Orders".to_string(),
            rpc: "GetOrder".to_string(),
            ..Endpoint::new("GET", "/orders/{id}")
        },
        Endpoint {
            service: "Orders".to_string(),
            rpc: "DeleteOrder".to_string(),
            ..Endpoint::new("delete", "/orders/{id}")
        },
        Endpoint {
            service: "Billing".to_string(),
            rpc: "Pay".to_string(),
            ..Endpoint::new("POST", "/pay")
        },
    ];

    assert_eq!(
        issues(&schema),
        vec![
            "endpoint DELETE /orders/{id}: references unknown RPC \"DeleteOrder\" on service Orders",
            "endpoint POST /pay: references unknown service \"Billing\"",
        ]
    );
}

#[test]
fn service_cycle_is_reported_as_path() {
    let mut a = Service::new("A");
    a.uses = vec!["B".to_string(), "External".to_string()];
    let mut b = Service::new("B");
    b.uses = vec!["C".to_string()];
    let mut c = Service::new("C");
    c.uses = vec!["A".to_string()];

    let cycle = find_service_cycle(&[a.clone(), b.clone(), c.clone()]);
    let expected: Vec<String> = ["A", "B", "C", "A"].map(String::from).to_vec();
    assert_eq!(cycle, Some(expected));

    c.uses.clear();
    assert_eq!(find_service_cycle(&[a, b, c]), None, "acyclic graph has no cycle");
}

#[test]
fn ui_hints_are_checked() {
    let mut schema = base();
    let fields = &mut schema.entities[1].fields;
    fields[0].ui = Some(FieldUi {
        kind: "custom".to_string(),
        hidden: true,
        columns: -1,
        importance: "urgent".to_string(),
        ..FieldUi::default()
    });
    fields.push(Field {
        optional: true,
        ui: Some(FieldUi {
            kind: "select".to_string(),
            hidden: true,
            ..FieldUi::default()
        }),
        ..Field::new("status", TypeRef::scalar(TypeKind::String))
    });

    assert_eq!(
        issues(&schema),
        vec![
            "entity OrderLine field qty: [E_UI_COLUMNS_INVALID] has negative ui.columns=-1",
            "entity OrderLine field qty: [E_UI_CUSTOM_COMPONENT_REQUIRED] uses ui.type=custom but ui.component is empty",
            "entity OrderLine field qty: [E_UI_HIDDEN_REQUIRED_CONFLICT] is hidden but required",
            "entity OrderLine field qty: [E_UI_IMPORTANCE_INVALID] has unsupported ui.importance \"urgent\"",
            "entity OrderLine field status: [E_UI_SELECT_SOURCE_OR_OPTIONS_REQUIRED] uses ui.type=select but neither ui.options nor ui.source is set",
        ]
    );
}

#[test]
fn duplicate_template_and_missing_subject_are_reported() {
    let mut schema = base();
    let mut no_subject = email("welcome_email");
    no_subject.subject.clear();
    schema.templates = vec![email("order_shipped"), email("order_shipped"), no_subject];

    let found = issues(&schema);

    assert!(
        found.contains(&"template \"order_shipped\" is duplicated".to_string()),
        "{found:?}"
    );
    assert!(
        found.contains(&"email template \"welcome_email\" requires non-empty subject".to_string()),
        "{found:?}"
    );
}

#[test]
fn template_engines_and_vars_are_checked() {
    let mut schema = base();
    schema.templates = vec![
        Template {
            engine: "json".to_string(),
            ..email("a")
        },
        Template {
            id: "b".to_string(),
            channel: "webhook".to_string(),
            engine: "mustache".to_string(),
            body: "{}".to_string(),
            ..Template::default()
        },
        Template {
            required_vars: vec!["User.Email".into(), "Order".into(), "1bad".into()],
            optional_vars: vec!["Order".into()],
            ..email("c")
        },
        Template {
            text: "Hi {{ .User.Name".to_string(),
            ..email("d")
        },
        Template {
            id: "e".to_string(),
            channel: "in_app".to_string(),
            ..Template::default()
        },
    ];

    assert_eq!(
        issues(&schema),
        vec![
            "template \"a\" uses engine \"json\" incompatible with channel \"email\"",
            "template \"b\" uses unsupported engine \"mustache\"",
            "template \"c\" declares var \"Order\" in both requiredVars and optionalVars",
            "template \"c\" has invalid requiredVars name \"1bad\"",
            "template \"c\" requiredVars contains \"Order\" but template content does not reference it",
            "template \"c\" requiredVars contains \"User.Email\" but template content does not reference it",
            "template \"d\" parse error: unclosed action",
            "template \"e\" requires at least one content field: text/html/body",
        ]
    );
}

#[test]
fn required_var_counts_when_used_through_a_child_path() {
    let mut schema = base();
    schema.templates = vec![Template {
        text: "{{ if .User }}{{ printf \"%s\" .User.Name }}{{ end }}".to_string(),
        required_vars: vec!["User".into()],
        ..email("greeting")
    }];

    let result = validate_semantics(&schema);
    assert!(result.is_ok(), "unexpected error: {result:?}");
}

#[test]
fn notification_refs_resolve_to_compatible_templates() {
    let mut schema = base();
    schema.templates = vec![email("welcome")];
    schema.notifications = Some(NotificationsConfig {
        channels: Some(NotificationChannels {
            default_channels: vec!["sms".to_string()],
            channels: [
                (
                    "email".to_string(),
                    NotificationChannelSpec {
                        template: "welcome".to_string(),
                        ..NotificationChannelSpec::default()
                    },
                ),
                (
                    "slack".to_string(),
                    NotificationChannelSpec {
                        template: "missing".to_string(),
                        ..NotificationChannelSpec::default()
                    },
                ),
            ]
            .into(),
            ..NotificationChannels::default()
        }),
        policies: Some(NotificationPolicies {
            rules: vec![NotificationPolicyRule {
                template: "welcome".to_string(),
                ..NotificationPolicyRule::default()
            }],
            ..NotificationPolicies::default()
        }),
        muting: None,
    });

    assert_eq!(
        issues(&schema),
        vec![
            "notifications channel \"slack\" references unknown template \"missing\"",
            "notifications policy rule[0] channel \"sms\" uses template \"welcome\" with incompatible channel \"email\"",
        ]
    );
}

#[test]
fn error_renders_as_sorted_bullets() {
    let mut schema = base();
    schema.entities[0].fields[0].ty = TypeRef::entity("Zed");
    schema.repos.push(Repository {
        name: "R".to_string(),
        entity: "Nope".to_string(),
        ..Repository::default()
    });

    let err = validate_semantics(&schema).expect_err("two issues");

    assert_eq!(
        err.to_string(),
        "ir semantic validation failed:\n - entity Order field id: references unknown entity type \"Zed\"\n - repository R: references unknown entity \"Nope\""
    );
}
