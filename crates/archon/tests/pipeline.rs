use archon::{
    CompilerConfig, Error, Pipeline, Stage,
    ir::{
        CURRENT_IR_VERSION,
        abi::validate_abi,
        model::{Attribute, Entity, Field, Method, Schema, Service, TypeKind, TypeRef},
        value::HasMetadata,
    },
    normalizer::Sources,
    transform::{Hook, HookError, Transformer, TransformError, TransformersConfig},
    tree::Node,
};
use proptest::prelude::*;

fn attr(node: Node, src: &str) -> Node {
    node.attr(src).expect("attribute should parse")
}

fn domain() -> Node {
    Node::structure().field(
        "Order",
        Node::structure()
            .field("id", attr(Node::string_type(), "@db(type=UUID, primary_key)"))
            .field("status", Node::string_type()),
    )
}

fn api(idempotent_get: bool) -> Node {
    let mut endpoint = Node::structure()
        .field("method", Node::text("GET"))
        .field("path", Node::text("/orders/{id}"));
    if idempotent_get {
        endpoint = endpoint.field("idempotency", Node::boolean(true));
    }

    Node::structure()
        .field(
            "GetOrder",
            Node::structure()
                .field("service", Node::text("orders"))
                .field("input", Node::structure().field("id", Node::string_type()))
                .field("output", Node::structure().field("status", Node::string_type())),
        )
        .field("HTTP", Node::structure().field("GetOrder", endpoint))
}

fn pipeline() -> Pipeline {
    let mut config = CompilerConfig::default();
    config.flow.syntax_check = false;

    Pipeline::new(config)
}

#[test]
fn sources_compile_to_an_enriched_schema() {
    let (domain, api) = (domain(), api(false));
    let sources = Sources::new().domain(&domain).api(&api);

    let out = pipeline().run(&sources).expect("pipeline should succeed");
    let schema = &out.schema;

    assert_eq!(schema.ir_version, CURRENT_IR_VERSION);
    validate_abi(schema).expect("output passes the ABI gate");
    assert!(schema.graph.is_some(), "graph is refreshed");

    let order = schema.entity("Order").expect("Order");
    assert!(
        !order.has_field("created_at") && !order.has_field("deleted_at"),
        "unmarked entities get no lifecycle fields"
    );
    let id = order.field("id").expect("id");
    assert_eq!(id.meta_str("sql_type"), Some("UUID"));
    assert!(id.meta_flag("primary_key"));

    let orders = schema.service("Orders").expect("Orders");
    assert!(orders.meta_flag("tracing_enabled"));
    assert_eq!(schema.endpoints.len(), 1);
    assert_eq!(schema.endpoints[0].rpc, "GetOrder");
}

fn marked_domain() -> Node {
    let order = Node::structure()
        .field("id", attr(Node::string_type(), "@db(type=UUID, primary_key)"))
        .field("status", Node::string_type());

    Node::structure().field("Order", attr(attr(order, "@timestamps"), "@softDelete"))
}

#[test]
fn marked_entities_get_lifecycle_fields() {
    let (domain, api) = (marked_domain(), api(false));
    let sources = Sources::new().domain(&domain).api(&api);

    let out = pipeline().run(&sources).expect("pipeline should succeed");
    let order = out.schema.entity("Order").expect("Order");

    let names: Vec<&str> = order.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "status", "created_at", "updated_at", "deleted_at"]);
}

#[test]
fn tree_transformer_block_overrides_the_config() {
    let (domain, api) = (marked_domain(), api(false));
    let arch = Node::structure().field(
        "#Transformers",
        Node::structure()
            .field("timestamps", Node::structure().field("enabled", Node::boolean(false)))
            .field("soft_delete", Node::structure().field("enabled", Node::boolean(false))),
    );
    let sources = Sources::new().domain(&domain).api(&api).architecture(&arch);

    let out = pipeline().run(&sources).expect("pipeline should succeed");
    let order = out.schema.entity("Order").expect("Order");

    assert!(!order.has_field("created_at"), "timestamps were switched off in the tree");
    assert!(!order.has_field("deleted_at"), "soft delete was switched off in the tree");
}

#[test]
fn same_violation_in_two_methods_is_reported_twice() {
    let domain = Node::structure().field(
        "Invoice",
        Node::structure()
            .field("_owner", Node::text("billing"))
            .field("id", Node::string_type()),
    );
    let find_invoice = || {
        Node::list([Node::structure()
            .field("action", Node::text("repo.Find"))
            .field("source", Node::text("Invoice"))
            .field("output", Node::text("invoice"))])
    };
    let api = Node::structure()
        .field(
            "PayInvoice",
            Node::structure().field("service", Node::text("billing")),
        )
        .field(
            "GetReport",
            Node::structure()
                .field("service", Node::text("reporting"))
                .field("flow", find_invoice()),
        )
        .field(
            "ListAudits",
            Node::structure()
                .field("service", Node::text("shipping"))
                .field("flow", find_invoice()),
        );
    let sources = Sources::new().domain(&domain).api(&api);

    let out = pipeline().run(&sources).expect("diagnostics do not stop the run");

    let mut ops: Vec<&str> = out
        .diagnostics
        .iter()
        .filter(|w| w.code == "ARCHITECTURE_VIOLATION")
        .map(|w| w.op.as_str())
        .collect();
    ops.sort_unstable();
    assert_eq!(ops, ["GetReport", "ListAudits"]);
}

#[test]
fn policy_violation_stops_the_run() {
    let (domain, api) = (domain(), api(true));
    let sources = Sources::new().domain(&domain).api(&api);

    let err = pipeline().run(&sources).expect_err("idempotent GET");

    assert_eq!(err.stage(), Stage::Policy);
    assert!(
        err.to_string().contains("idempotency is not allowed for GET endpoints"),
        "unexpected error: {err}"
    );
}

#[test]
fn semantic_violation_stops_the_run() {
    let mut schema = Schema::default();
    schema.entities.push(Entity {
        fields: vec![Field::new("owner", TypeRef::entity("Ghost"))],
        ..Entity::new("Order")
    });

    let err = pipeline().process(&mut schema).expect_err("unknown entity");

    assert!(matches!(err, Error::Semantic(_)), "unexpected error: {err:?}");
}

///
/// Stamp
/// Custom transformer and hook used to check registration order.
///

struct Stamp;

impl Transformer for Stamp {
    fn name(&self) -> &str {
        "stamp"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for entity in &mut schema.entities {
            let saw_timestamps = entity.has_field("created_at");
            entity.set_meta("stamped_after_builtins", saw_timestamps);
        }

        Ok(())
    }
}

impl Hook for Stamp {
    fn attribute(&self) -> &str {
        "audited"
    }

    fn on_service(&self, service: &mut Service, _attr: &Attribute) -> Result<(), HookError> {
        service.set_meta("audited", true);
        Ok(())
    }
}

#[test]
fn custom_passes_run_after_builtins() {
    let mut svc = Service::new("Orders");
    svc.attributes.push(Attribute::new("audited"));
    svc.attributes.push(Attribute::new("crud").with_arg("entity", "Order"));
    let mut schema = Schema {
        entities: vec![Entity {
            fields: vec![Field::new("id", TypeRef::scalar(TypeKind::String))],
            attributes: vec![Attribute::new("timestamps")],
            ..Entity::new("Order")
        }],
        services: vec![svc],
        ..Schema::default()
    };

    let mut pipeline = pipeline();
    pipeline.register_transformer(Stamp);
    pipeline.register_hook(Stamp);
    pipeline.process(&mut schema).expect("pipeline");

    assert!(schema.entities[0].meta_flag("stamped_after_builtins"));
    let orders = &schema.services[0];
    assert!(orders.meta_flag("audited"));
    let list = orders.method("ListOrder").expect("crud method");
    assert_eq!(
        list.meta_str("span_name"),
        Some("Orders.ListOrder"),
        "hook-made methods are enriched too"
    );
}

#[test]
fn hook_errors_surface_as_transform_errors() {
    let mut method = Method::new("GetOrder");
    method.attributes.push(Attribute::new("cache").with_arg("ttl", "\"later\""));
    let mut svc = Service::new("Orders");
    svc.methods.push(method);
    let mut schema = Schema {
        services: vec![svc],
        ..Schema::default()
    };

    let err = pipeline().process(&mut schema).expect_err("bad ttl");

    assert_eq!(err.stage(), Stage::Transform);
    assert!(err.to_string().starts_with("hook cache on method Orders.GetOrder"), "{err}");
}

#[test]
fn crud_output_is_stable_under_a_second_run() {
    let mut svc = Service::new("Store");
    svc.attributes.push(Attribute::new("crud").with_arg("entity", "Aaa"));
    let mut schema = Schema {
        entities: vec![Entity {
            fields: vec![Field::new("aa0", TypeRef::scalar(TypeKind::String))],
            ..Entity::new("Aaa")
        }],
        services: vec![svc],
        ..Schema::default()
    };

    let pipeline = pipeline();
    pipeline.process(&mut schema).expect("first run");
    let once = schema.clone();
    pipeline.process(&mut schema).expect("second run");

    assert_eq!(schema, once);
    let get = schema.services[0].method("GetAaa").expect("GetAaa");
    assert!(get.sources[0].metadata.is_some());
}

//
// idempotence
//

fn arb_schema() -> impl Strategy<Value = Schema> {
    let entity = (
        "[A-Z][a-z]{2,6}",
        prop::collection::vec("[a-z]{2,6}", 1..4),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, fields, image, soft)| {
            let mut e = Entity::new(name);
            for (i, f) in fields.into_iter().enumerate() {
                let mut field = Field::new(format!("{f}{i}"), TypeRef::scalar(TypeKind::String));
                if image && i == 0 {
                    field.attributes.push(Attribute::new("image"));
                }
                e.fields.push(field);
            }
            if soft {
                e.attributes.push(Attribute::new("soft_delete"));
            }
            e
        });

    (prop::collection::vec(entity, 1..4), any::<bool>()).prop_map(|(mut entities, crud)| {
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        entities.dedup_by(|a, b| a.name == b.name);
        let mut svc = Service::new("Store");
        if crud {
            let target = entities[0].name.clone();
            svc.attributes.push(Attribute::new("crud").with_arg("entity", target));
        }

        Schema {
            entities,
            services: vec![svc],
            ..Schema::default()
        }
    })
}

proptest! {
    #[test]
    fn pipeline_is_idempotent(schema in arb_schema(), soft_delete in any::<bool>()) {
        let mut config = CompilerConfig::default();
        config.transformers = TransformersConfig { soft_delete, ..TransformersConfig::default() };
        let pipeline = Pipeline::new(config);

        let mut once = schema;
        pipeline.process(&mut once).expect("first run");
        let mut twice = once.clone();
        pipeline.process(&mut twice).expect("second run");

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.fingerprint().expect("hash"), twice.fingerprint().expect("hash"));
    }
}
