//! IR assembly: definitions in, a versioned [`Schema`] out.
//!
//! Assembly is pure. Everything a definition carries lands somewhere in the
//! schema so that [`convert_back`] can recover it; the only derived parts are
//! the dependency graph and the IR version stamp.

use crate::defs::{
    ConfigDef, DbMeta, Definitions, EndpointDef, EntityDef, EventDef, FieldDef, MethodDef,
    PayloadField, ScenarioDef, ScenarioExpect, ScenarioStep, ScheduleDef, ServiceDef,
};
use archon_ir::{
    CURRENT_IR_VERSION,
    model::{
        Attribute, Config, Endpoint, EndpointAuth, Entity, EntityUi, Event, Field, Method,
        NotificationsConfig, Schedule, Schema, Service, Slo, TypeKind, TypeRef,
    },
    value::{HasMetadata, Metadata, Value},
};
use std::collections::BTreeMap;

/// Field attribute the [`DbMeta`] of a definition is read back from.
pub const DB_ATTRIBUTE: &str = "db";

/// Schema metadata key holding the scenario catalogue.
pub const SCENARIOS_KEY: &str = "scenarios";

///
/// assemble
///

#[must_use]
pub fn assemble(defs: Definitions) -> Schema {
    let Definitions {
        project,
        entities,
        services,
        events,
        errors,
        endpoints,
        repos,
        config,
        auth,
        rbac,
        schedules,
        views,
        scenarios,
        templates,
        notification_channels,
        notification_policies,
        notification_muting,
        ..
    } = defs;

    let notifications = (notification_channels.is_some()
        || notification_policies.is_some()
        || notification_muting.is_some())
    .then_some(NotificationsConfig {
        channels: notification_channels,
        policies: notification_policies,
        muting: notification_muting,
    });

    let mut schema = Schema {
        ir_version: CURRENT_IR_VERSION.to_string(),
        project,
        entities: entities.into_iter().map(entity_to_ir).collect(),
        services: services.into_iter().map(service_to_ir).collect(),
        events: events.into_iter().map(event_to_ir).collect(),
        errors,
        endpoints: endpoints.into_iter().map(endpoint_to_ir).collect(),
        repos,
        config: Config {
            fields: config
                .map(|c| c.fields.into_iter().map(field_to_ir).collect())
                .unwrap_or_default(),
        },
        auth,
        rbac,
        schedules: schedules.into_iter().map(schedule_to_ir).collect(),
        views,
        notifications,
        templates,
        metadata: None,
        graph: None,
    };

    if !scenarios.is_empty() {
        let list = scenarios.iter().map(scenario_to_value).collect();
        schema.set_meta(SCENARIOS_KEY, Value::List(list));
    }

    schema.refresh_graph();

    tracing::debug!(
        entities = schema.entities.len(),
        services = schema.services.len(),
        endpoints = schema.endpoints.len(),
        version = %schema.ir_version,
        "assembled schema"
    );

    schema
}

///
/// convert_back
///
/// Inverse of [`assemble`] for everything assembly stores. The graph, the
/// version stamp and the infra context patch have no definition form.
///

#[must_use]
pub fn convert_back(schema: &Schema) -> Definitions {
    let notifications = schema.notifications.clone().unwrap_or_default();
    let config = (!schema.config.fields.is_empty()).then(|| ConfigDef {
        fields: schema.config.fields.iter().map(field_from_ir).collect(),
    });
    let scenarios = match schema.meta(SCENARIOS_KEY) {
        Some(Value::List(items)) => items.iter().filter_map(scenario_from_value).collect(),
        _ => Vec::new(),
    };

    Definitions {
        project: schema.project.clone(),
        entities: schema.entities.iter().map(entity_from_ir).collect(),
        services: schema.services.iter().map(service_from_ir).collect(),
        events: schema.events.iter().map(event_from_ir).collect(),
        errors: schema.errors.clone(),
        endpoints: schema.endpoints.iter().map(endpoint_from_ir).collect(),
        repos: schema.repos.clone(),
        config,
        auth: schema.auth.clone(),
        rbac: schema.rbac.clone(),
        schedules: schema.schedules.iter().map(schedule_from_ir).collect(),
        views: schema.views.clone(),
        scenarios,
        templates: schema.templates.clone(),
        notification_channels: notifications.channels,
        notification_policies: notifications.policies,
        notification_muting: notifications.muting,
        transformers: None,
        infra: crate::registry::InfraContextPatch::default(),
    }
}

//
// fields
//

fn field_to_ir(def: FieldDef) -> Field {
    let default = typed_default(&def.default, &def.ty.kind);
    let mut ty = def.ty;
    if !def.item_fields.is_empty()
        && let Some(item) = ty.item.as_deref_mut()
    {
        item.inline_fields = def.item_fields.into_iter().map(field_to_ir).collect();
    }

    Field {
        name: def.name,
        ty,
        optional: def.optional,
        default,
        is_secret: def.is_secret,
        is_pii: def.is_pii,
        skip_domain: def.skip_domain,
        validate_tag: def.validate_tag,
        env_var: def.env_var,
        constraints: def.constraints,
        attributes: def.attributes,
        file_meta: def.file_meta,
        ui: def.ui,
        metadata: def.metadata,
        source: def.source,
    }
}

fn field_from_ir(field: &Field) -> FieldDef {
    let mut ty = field.ty.clone();
    let mut item_fields = Vec::new();
    let mut item_type_name = String::new();
    if let Some(item) = ty.item.as_deref_mut() {
        item_fields = item.inline_fields.iter().map(field_from_ir).collect();
        item.inline_fields.clear();
        item_type_name.clone_from(&item.name);
    }

    FieldDef {
        name: field.name.clone(),
        ty,
        optional: field.optional,
        default: field.default.as_ref().map(render_default).unwrap_or_default(),
        db: field.attribute(DB_ATTRIBUTE).map(db_from_attribute).unwrap_or_default(),
        validate_tag: field.validate_tag.clone(),
        env_var: field.env_var.clone(),
        is_secret: field.is_secret,
        is_pii: field.is_pii,
        skip_domain: field.skip_domain,
        item_type_name,
        item_fields,
        constraints: field.constraints.clone(),
        file_meta: field.file_meta.clone(),
        ui: field.ui.clone(),
        attributes: field.attributes.clone(),
        metadata: field.metadata.clone(),
        source: field.source.clone(),
    }
}

// Mirrors the normalizer's reading of `@db(...)`.
fn db_from_attribute(attr: &Attribute) -> DbMeta {
    DbMeta {
        sql_type: attr
            .arg_text("type")
            .filter(|t| !t.is_empty())
            .unwrap_or(DbMeta::DEFAULT_SQL_TYPE)
            .to_string(),
        primary_key: attr.arg_flag("primary_key") || attr.arg_flag("pk"),
        unique: attr.arg_flag("unique"),
        index: attr.arg_flag("index"),
    }
}

// Defaults are typed only when the text renders back unchanged.
fn typed_default(text: &str, kind: &TypeKind) -> Option<Value> {
    if text.is_empty() {
        return None;
    }

    let typed = match kind {
        TypeKind::Int | TypeKind::Int64 => text.parse::<i64>().ok().map(Value::Int),
        TypeKind::Float => text.parse::<f64>().ok().map(Value::Float),
        TypeKind::Bool => text.parse::<bool>().ok().map(Value::Bool),
        _ => None,
    };

    match typed {
        Some(value) if render_default(&value) == text => Some(value),
        _ => Some(Value::text(text)),
    }
}

fn render_default(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Uint(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        _ => String::new(),
    }
}

//
// entities & events
//

fn entity_to_ir(def: EntityDef) -> Entity {
    Entity {
        name: def.name,
        description: def.description,
        owner: def.owner,
        fields: def.fields.into_iter().map(field_to_ir).collect(),
        fsm: def.fsm,
        indexes: def.indexes,
        attributes: def.attributes,
        ui: EntityUi { crud: def.crud },
        metadata: def.metadata,
        source: def.source,
    }
}

fn entity_from_ir(entity: &Entity) -> EntityDef {
    EntityDef {
        name: entity.name.clone(),
        description: entity.description.clone(),
        owner: entity.owner.clone(),
        fields: entity.fields.iter().map(field_from_ir).collect(),
        fsm: entity.fsm.clone(),
        indexes: entity.indexes.clone(),
        attributes: entity.attributes.clone(),
        crud: entity.ui.crud.clone(),
        metadata: entity.metadata.clone(),
        source: entity.source.clone(),
    }
}

fn event_to_ir(def: EventDef) -> Event {
    Event {
        name: def.name,
        fields: def.fields.into_iter().map(field_to_ir).collect(),
        metadata: def.metadata,
        source: def.source,
    }
}

fn event_from_ir(event: &Event) -> EventDef {
    EventDef {
        name: event.name.clone(),
        fields: event.fields.iter().map(field_from_ir).collect(),
        metadata: event.metadata.clone(),
        source: event.source.clone(),
    }
}

//
// services
//

fn service_to_ir(def: ServiceDef) -> Service {
    Service {
        name: def.name,
        description: def.description,
        methods: def.methods.into_iter().map(method_to_ir).collect(),
        publishes: def.publishes,
        subscribes: def.subscribes,
        uses: def.uses,
        attributes: def.attributes,
        requires_sql: def.requires_sql,
        requires_mongo: def.requires_mongo,
        requires_redis: def.requires_redis,
        requires_nats: def.requires_nats,
        requires_s3: def.requires_s3,
        metadata: def.metadata,
        source: def.source,
    }
}

fn service_from_ir(svc: &Service) -> ServiceDef {
    ServiceDef {
        name: svc.name.clone(),
        description: svc.description.clone(),
        methods: svc.methods.iter().map(method_from_ir).collect(),
        publishes: svc.publishes.clone(),
        subscribes: svc.subscribes.clone(),
        uses: svc.uses.clone(),
        attributes: svc.attributes.clone(),
        requires_sql: svc.requires_sql,
        requires_mongo: svc.requires_mongo,
        requires_redis: svc.requires_redis,
        requires_nats: svc.requires_nats,
        requires_s3: svc.requires_s3,
        metadata: svc.metadata.clone(),
        source: svc.source.clone(),
    }
}

fn method_to_ir(def: MethodDef) -> Method {
    Method {
        name: def.name,
        description: def.description,
        input: entity_to_ir(def.input),
        output: entity_to_ir(def.output),
        sources: def.sources,
        cache_ttl: def.cache_ttl,
        cache_tags: def.cache_tags,
        throws: def.throws,
        publishes: def.publishes,
        broadcasts: def.broadcasts,
        pagination: def.pagination,
        idempotent: def.idempotent,
        dedupe_key: def.dedupe_key,
        outbox: def.outbox,
        implementation: def.implementation,
        flow: def.flow,
        attributes: def.attributes,
        metadata: def.metadata,
        source: def.source,
    }
}

fn method_from_ir(m: &Method) -> MethodDef {
    MethodDef {
        name: m.name.clone(),
        description: m.description.clone(),
        input: entity_from_ir(&m.input),
        output: entity_from_ir(&m.output),
        sources: m.sources.clone(),
        cache_ttl: m.cache_ttl.clone(),
        cache_tags: m.cache_tags.clone(),
        throws: m.throws.clone(),
        publishes: m.publishes.clone(),
        broadcasts: m.broadcasts.clone(),
        pagination: m.pagination.clone(),
        idempotent: m.idempotent,
        dedupe_key: m.dedupe_key.clone(),
        outbox: m.outbox,
        implementation: m.implementation.clone(),
        flow: m.flow.clone(),
        attributes: m.attributes.clone(),
        metadata: m.metadata.clone(),
        source: m.source.clone(),
    }
}

//
// endpoints
//

fn endpoint_to_ir(def: EndpointDef) -> Endpoint {
    let auth = EndpointAuth {
        kind: def.auth_type,
        permission: def.permission,
        roles: def.auth_roles,
        check: def.auth_check,
        inject: def.auth_inject,
    };
    let slo = def.slo;

    Endpoint {
        method: def.method,
        path: def.path,
        service: def.service,
        rpc: def.rpc,
        description: def.description,
        messages: def.messages,
        room_param: def.room_param,
        auth: (auth != EndpointAuth::default()).then_some(auth),
        cache: def.cache_ttl,
        cache_tags: def.cache_tags,
        invalidate: def.invalidate,
        optimistic_update: def.optimistic_update,
        rate_limit: def.rate_limit,
        circuit_breaker: def.circuit_breaker,
        retry: def.retry,
        timeout: def.timeout,
        max_body_size: def.max_body_size,
        idempotent: def.idempotent,
        dedupe_key: def.dedupe_key,
        errors: def.errors,
        pagination: def.pagination,
        view: def.view,
        slo: (slo != Slo::default()).then_some(slo),
        test_hints: def.test_hints,
        metadata: def.metadata,
        source: def.source,
    }
}

fn endpoint_from_ir(ep: &Endpoint) -> EndpointDef {
    let auth = ep.auth.clone().unwrap_or_default();

    EndpointDef {
        method: ep.method.clone(),
        path: ep.path.clone(),
        service: ep.service.clone(),
        rpc: ep.rpc.clone(),
        description: ep.description.clone(),
        messages: ep.messages.clone(),
        room_param: ep.room_param.clone(),
        auth_type: auth.kind,
        permission: auth.permission,
        auth_roles: auth.roles,
        auth_check: auth.check,
        auth_inject: auth.inject,
        cache_ttl: ep.cache.clone(),
        cache_tags: ep.cache_tags.clone(),
        invalidate: ep.invalidate.clone(),
        optimistic_update: ep.optimistic_update.clone(),
        rate_limit: ep.rate_limit.clone(),
        circuit_breaker: ep.circuit_breaker.clone(),
        retry: ep.retry.clone(),
        timeout: ep.timeout.clone(),
        max_body_size: ep.max_body_size,
        idempotent: ep.idempotent,
        dedupe_key: ep.dedupe_key.clone(),
        errors: ep.errors.clone(),
        pagination: ep.pagination.clone(),
        view: ep.view.clone(),
        slo: ep.slo.clone().unwrap_or_default(),
        test_hints: ep.test_hints.clone(),
        metadata: ep.metadata.clone(),
        source: ep.source.clone(),
    }
}

//
// schedules
//

fn schedule_to_ir(def: ScheduleDef) -> Schedule {
    Schedule {
        name: def.name,
        service: def.service,
        action: def.action,
        at: def.at,
        every: def.every,
        publish: def.publish,
        payload: def.payload.into_iter().map(payload_to_ir).collect(),
    }
}

fn payload_to_ir(p: PayloadField) -> Field {
    let kind = TypeKind::from(p.ty.as_str());
    Field {
        default: typed_default(&p.value, &kind),
        ..Field::new(p.name, TypeRef::scalar(kind))
    }
}

fn schedule_from_ir(s: &Schedule) -> ScheduleDef {
    ScheduleDef {
        name: s.name.clone(),
        service: s.service.clone(),
        action: s.action.clone(),
        at: s.at.clone(),
        every: s.every.clone(),
        publish: s.publish.clone(),
        payload: s
            .payload
            .iter()
            .map(|f| PayloadField {
                name: f.name.clone(),
                ty: f.ty.kind.as_str().to_string(),
                value: f.default.as_ref().map(render_default).unwrap_or_default(),
            })
            .collect(),
    }
}

//
// scenarios
//

fn scenario_to_value(s: &ScenarioDef) -> Value {
    let steps = s
        .steps
        .iter()
        .map(|step| {
            let export = step
                .export
                .iter()
                .map(|(k, v)| (k.clone(), Value::text(v)))
                .collect::<BTreeMap<_, _>>();
            let expect = Metadata::from([
                ("status".to_string(), Value::Int(step.expect.status)),
                ("body".to_string(), Value::Map(step.expect.body.clone())),
            ]);

            Value::Map(Metadata::from([
                ("name".to_string(), Value::text(&step.name)),
                ("action".to_string(), Value::text(&step.action)),
                ("input".to_string(), Value::Map(step.input.clone())),
                ("expect".to_string(), Value::Map(expect)),
                ("export".to_string(), Value::Map(export)),
            ]))
        })
        .collect();

    Value::Map(Metadata::from([
        ("name".to_string(), Value::text(&s.name)),
        ("description".to_string(), Value::text(&s.description)),
        ("source".to_string(), Value::text(&s.source)),
        ("steps".to_string(), Value::List(steps)),
    ]))
}

fn scenario_from_value(v: &Value) -> Option<ScenarioDef> {
    let Value::Map(map) = v else {
        return None;
    };
    let steps = match map.get("steps") {
        Some(Value::List(items)) => items.iter().filter_map(step_from_value).collect(),
        _ => Vec::new(),
    };

    Some(ScenarioDef {
        name: text_of(map, "name"),
        description: text_of(map, "description"),
        steps,
        source: text_of(map, "source"),
    })
}

fn step_from_value(v: &Value) -> Option<ScenarioStep> {
    let Value::Map(map) = v else {
        return None;
    };
    let expect = match map.get("expect") {
        Some(Value::Map(e)) => ScenarioExpect {
            status: match e.get("status") {
                Some(Value::Int(n)) => *n,
                _ => ScenarioExpect::default().status,
            },
            body: map_of(e, "body"),
        },
        _ => ScenarioExpect::default(),
    };

    Some(ScenarioStep {
        name: text_of(map, "name"),
        action: text_of(map, "action"),
        input: map_of(map, "input"),
        expect,
        export: map_of(map, "export")
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect(),
    })
}

fn text_of(map: &Metadata, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn map_of(map: &Metadata, key: &str) -> Metadata {
    match map.get(key) {
        Some(Value::Map(m)) => m.clone(),
        _ => Metadata::new(),
    }
}
