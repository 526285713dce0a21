use super::*;
use archon_ir::{
    model::{Attribute, Endpoint, EndpointAuth, Entity, Field, Method, Service, TypeKind, TypeRef},
    value::{HasMetadata, Value},
};
use proptest::prelude::*;

fn string_field(name: &str) -> Field {
    Field::new(name, TypeRef::scalar(TypeKind::String))
}

fn field_names(entity: &Entity) -> Vec<&str> {
    entity.fields.iter().map(|f| f.name.as_str()).collect()
}

fn profile() -> Entity {
    let mut avatar = string_field("avatar");
    avatar.attributes.push(Attribute::new("image"));

    let mut email = string_field("email");
    email.optional = true;
    email
        .attributes
        .push(Attribute::new("validate").with_arg("_", "\"required,email\""));

    Entity {
        fields: vec![string_field("id"), avatar, email],
        ..Entity::new("Profile")
    }
}

#[test]
fn builtin_order_follows_config() {
    let all = TransformerRegistry::builtin(&TransformersConfig::default());
    assert_eq!(
        all.names(),
        ["image", "validation", "timestamps", "soft_delete", "tracing", "caching", "policy"]
    );

    let config = TransformersConfig {
        image: false,
        caching: false,
        ..TransformersConfig::default()
    };
    let some = TransformerRegistry::builtin(&config);
    assert_eq!(
        some.names(),
        ["validation", "timestamps", "soft_delete", "tracing", "policy"],
        "disabled transformers are not registered"
    );
}

#[test]
fn image_inserts_thumbnail_after_source() {
    let mut schema = Schema {
        entities: vec![profile()],
        ..Schema::default()
    };
    let t = ImageTransformer::new("_thumb");

    t.apply(&mut schema).expect("image transformer");
    t.apply(&mut schema).expect("image transformer again");

    let entity = &schema.entities[0];
    assert_eq!(field_names(entity), ["id", "avatar", "avatar_thumb", "email"]);

    let thumb = &entity.fields[2];
    assert!(thumb.optional, "thumbnail is optional");
    assert_eq!(thumb.meta_str("generated_by"), Some("image_transformer"));
    assert_eq!(thumb.meta_str("source_field"), Some("avatar"));
    assert_eq!(entity.fields[1].meta_str("thumbnail_field"), Some("avatar_thumb"));
}

#[test]
fn image_suffix_can_come_from_the_attribute() {
    let mut entity = profile();
    entity.fields[1].attributes[0] = Attribute::new("image").with_arg("thumb_suffix", "\"_small\"");
    let mut schema = Schema {
        entities: vec![entity],
        ..Schema::default()
    };

    ImageTransformer::new("_thumb").apply(&mut schema).expect("image transformer");

    assert!(schema.entities[0].has_field("avatar_small"));
}

#[test]
fn validation_appends_omitempty_for_optional_fields() {
    let mut entity = profile();
    let mut code = string_field("code");
    code.attributes
        .push(Attribute::new("validate").with_arg("rule", "\"len=6\""));
    entity.fields.push(code);
    let mut schema = Schema {
        entities: vec![entity],
        ..Schema::default()
    };

    ValidationTransformer.apply(&mut schema).expect("validation transformer");

    let entity = &schema.entities[0];
    assert_eq!(
        entity.field("email").and_then(|f| f.meta_str("validate_tag")),
        Some("required,email,omitempty")
    );
    assert_eq!(
        entity.field("code").and_then(|f| f.meta_str("validate_tag")),
        Some("len=6")
    );
}

#[test]
fn timestamps_only_touch_marked_entities() {
    let mut by_meta = Entity::new("Audit");
    by_meta.set_meta("timestamps", true);
    let mut by_attr = Entity::new("Ledger");
    by_attr.attributes.push(Attribute::new("timestamps"));
    let mut opted_out = Entity::new("Raw");
    opted_out.set_meta("timestamps", false);
    opted_out.attributes.push(Attribute::new("timestamps"));
    let mut dto = Entity::new("Summary");
    dto.set_meta("dto", true);
    let plain = Entity::new("Order");

    let mut schema = Schema {
        entities: vec![by_meta, by_attr, opted_out, dto, plain],
        ..Schema::default()
    };

    TimestampsTransformer.apply(&mut schema).expect("timestamps");

    let with: Vec<bool> = schema.entities.iter().map(|e| e.has_field("updated_at")).collect();
    assert_eq!(with, [true, true, false, false, false], "unmarked entities are left alone");
    assert_eq!(field_names(&schema.entities[4]), Vec::<&str>::new());

    let created = schema.entities[0].field("created_at").expect("created_at");
    assert_eq!(created.ty.kind, TypeKind::Time);
    assert_eq!(created.meta_str("auto_set"), Some("on_create"));
    assert_eq!(created.meta_str("generated_by"), Some("timestamp_transformer"));
}

#[test]
fn default_registry_leaves_plain_entities_alone() {
    let mut schema = Schema {
        entities: vec![Entity {
            fields: vec![string_field("id")],
            ..Entity::new("Order")
        }],
        ..Schema::default()
    };

    TransformerRegistry::builtin(&TransformersConfig::default())
        .apply(&mut schema)
        .expect("builtins");

    assert_eq!(field_names(&schema.entities[0]), ["id"]);
}

#[test]
fn soft_delete_adds_optional_deleted_at() {
    let mut entity = Entity::new("Order");
    entity.attributes.push(Attribute::new("soft_delete"));
    let mut schema = Schema {
        entities: vec![entity, Entity::new("Line")],
        ..Schema::default()
    };

    SoftDeleteTransformer.apply(&mut schema).expect("soft delete");

    let deleted = schema.entities[0].field("deleted_at").expect("deleted_at");
    assert!(deleted.optional);
    assert_eq!(deleted.meta_str("generated_by"), Some("soft_delete_transformer"));
    assert!(!schema.entities[1].has_field("deleted_at"));
}

#[test]
fn tracing_and_caching_annotate_services() {
    let mut get = Method::new("GetOrder");
    get.attributes.push(Attribute::new("cache").with_arg("ttl", "\"1h\""));
    let mut list = Method::new("ListOrders");
    list.attributes.push(Attribute::new("cache").with_arg("key", "\"orders:{page}\""));
    let mut orders = Service::new("Orders");
    orders.methods = vec![get, list];

    let mut schema = Schema {
        services: vec![orders, Service::new("Billing")],
        ..Schema::default()
    };

    TracingTransformer.apply(&mut schema).expect("tracing");
    CachingTransformer.apply(&mut schema).expect("caching");

    let orders = &schema.services[0];
    assert!(orders.meta_flag("tracing_enabled"));
    assert!(orders.meta_flag("needs_caching_decorator"));
    assert!(!schema.services[1].meta_flag("needs_caching_decorator"));
    assert_eq!(orders.methods[0].meta_str("span_name"), Some("Orders.GetOrder"));

    let cache = orders.methods[0].meta("cache").and_then(Value::as_map).expect("cache block");
    assert_eq!(cache.get("ttl"), Some(&Value::text("1h")));
    assert_eq!(cache.get("key"), Some(&Value::Null));
    assert_eq!(cache.get("strategy"), Some(&Value::text("read-through")));

    let cache = orders.methods[1].meta("cache").and_then(Value::as_map).expect("cache block");
    assert_eq!(cache.get("ttl"), Some(&Value::text("5m")), "default ttl");
    assert_eq!(cache.get("key"), Some(&Value::text("orders:{page}")));
}

#[test]
fn policy_records_required_headers() {
    let mut schema = Schema {
        endpoints: vec![Endpoint {
            auth: Some(EndpointAuth {
                kind: "jwt".to_string(),
                ..EndpointAuth::default()
            }),
            idempotent: true,
            ..Endpoint::new("POST", "/orders")
        }],
        ..Schema::default()
    };

    PolicyTransformer.apply(&mut schema).expect("policy");

    let policy = schema.endpoints[0].meta("policy").and_then(Value::as_map).expect("policy block");
    assert_eq!(
        policy.get("required_headers"),
        Some(&Value::from(vec![
            "Authorization".to_string(),
            "Idempotency-Key".to_string()
        ]))
    );
}

//
// idempotence
//

fn arb_field() -> impl Strategy<Value = Field> {
    (
        "[a-z]{1,6}",
        any::<bool>(),
        any::<bool>(),
        prop::option::of("(required|email|min=1)(,omitempty)?"),
    )
        .prop_map(|(name, optional, image, rule)| {
            let mut f = Field {
                optional,
                ..string_field(&name)
            };
            if image {
                f.attributes.push(Attribute::new("image"));
            }
            if let Some(rule) = rule {
                f.attributes.push(Attribute::new("validate").with_arg("rule", rule));
            }
            f
        })
}

fn arb_entity() -> impl Strategy<Value = Entity> {
    (
        "[A-Z][a-z]{1,6}",
        prop::collection::vec(arb_field(), 0..5),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, fields, soft, dto)| {
            let mut e = Entity {
                fields,
                ..Entity::new(name)
            };
            if soft {
                e.set_meta("soft_delete", true);
            }
            if dto {
                e.set_meta("dto", true);
            }
            e
        })
}

fn arb_service() -> impl Strategy<Value = Service> {
    ("[A-Z][a-z]{1,6}", prop::collection::vec(("[A-Z][a-z]{1,6}", any::<bool>()), 0..4)).prop_map(
        |(name, methods)| {
            let mut svc = Service::new(name);
            for (m, cached) in methods {
                let mut method = Method::new(m);
                if cached {
                    method.attributes.push(Attribute::new("cache"));
                }
                svc.methods.push(method);
            }
            svc
        },
    )
}

fn arb_schema() -> impl Strategy<Value = Schema> {
    (
        prop::collection::vec(arb_entity(), 0..4),
        prop::collection::vec(arb_service(), 0..3),
        prop::collection::vec((prop::sample::select(vec!["GET", "POST", "WS"]), any::<bool>()), 0..3),
    )
        .prop_map(|(entities, services, endpoints)| Schema {
            entities,
            services,
            endpoints: endpoints
                .into_iter()
                .enumerate()
                .map(|(i, (method, idempotent))| Endpoint {
                    idempotent,
                    ..Endpoint::new(method, format!("/r{i}"))
                })
                .collect(),
            ..Schema::default()
        })
}

proptest! {
    #[test]
    fn builtin_transformers_are_idempotent(schema in arb_schema(), soft_delete in any::<bool>()) {
        let config = TransformersConfig {
            soft_delete,
            ..TransformersConfig::default()
        };
        let registry = TransformerRegistry::builtin(&config);

        let mut once = schema;
        registry.apply(&mut once).expect("first pass");
        let mut twice = once.clone();
        registry.apply(&mut twice).expect("second pass");

        prop_assert_eq!(once, twice);
    }
}
