//! Service extraction: operations grouped by their `service` field.

pub mod lint;


use crate::{
    defs::{EntityDef, FieldDef, MethodDef, ServiceDef},
    entity::{FieldScope, parse_entity},
    error::NormalizeError,
    helpers::{clean_name, location_of, normalize_service_name, source_of, trimmed_strings},
    normalizer::Normalizer,
};
use archon_diag::{DiagnosticKind, DiagnosticSink, Severity, Warning};
use archon_flow::{
    EntityCatalog, EntityInfo, FlowValidator, NoSyntaxCheck, ParseContext, ir_attribute,
    parse_steps,
};
use archon_ir::{
    model::{Impl, Pagination, Source, TypeKind, TypeRef},
    value::HasMetadata,
};
use archon_tree::{ConfigValue, ValueKind};
use lint::{Bypass, ImplSite};
use std::{collections::BTreeMap, path::Path};

/// Entity catalogue visible to flow validation.
#[must_use]
pub fn entity_catalog(entities: &[EntityDef]) -> EntityCatalog {
    let mut catalog = EntityCatalog::new();
    for e in entities {
        catalog.insert(
            e.name.clone(),
            EntityInfo {
                owner: e.owner.clone(),
                dto: e.is_dto(),
            },
        );
    }

    catalog
}

// Cache settings declared on `HTTP.<op>.cache`.
#[derive(Default)]
struct CacheInfo {
    ttl: String,
    tags: Vec<String>,
}

fn cache_by_op(api: &dyn ConfigValue) -> BTreeMap<String, CacheInfo> {
    let Some(http) = api.field("HTTP") else {
        return BTreeMap::new();
    };

    http.fields()
        .into_iter()
        .filter_map(|f| {
            let info = CacheInfo {
                ttl: f.value.string_at("cache.ttl"),
                tags: f.value.strings_at("cache.tags"),
            };
            (!info.ttl.is_empty() || !info.tags.is_empty()).then(|| (clean_name(f.label).to_string(), info))
        })
        .collect()
}

/// Labels of operations: non-definition members with a `service` string.
pub(crate) fn operations(api: &dyn ConfigValue) -> Vec<(String, &dyn ConfigValue)> {
    api.fields()
        .into_iter()
        .filter(|f| !f.is_definition() && f.label != "HTTP")
        .filter(|f| f.value.kind() == ValueKind::Struct)
        .filter(|f| !f.value.string_at("service").is_empty())
        .map(|f| (clean_name(f.label).to_string(), f.value))
        .collect()
}

impl<S: DiagnosticSink> Normalizer<S> {
    /// Services in name order, each with its methods in name order.
    pub fn extract_services(
        &mut self,
        api: &dyn ConfigValue,
        entities: &[EntityDef],
    ) -> Result<Vec<ServiceDef>, NormalizeError> {
        let catalog = entity_catalog(entities);
        let mut validator = FlowValidator::new(catalog.clone()).with_policy(self.policy().clone());
        if !self.syntax_check() {
            validator = validator.with_checker(NoSyntaxCheck);
        }

        let cache = cache_by_op(api);
        let mut services: BTreeMap<String, ServiceDef> = BTreeMap::new();

        for (op_name, op) in operations(api) {
            let svc_name = normalize_service_name(&op.string_at("service"));
            let svc = services.entry(svc_name.clone()).or_insert_with(|| ServiceDef {
                source: source_of(op, self.root()),
                ..ServiceDef::new(svc_name.clone())
            });

            if op.bool_at("requiresS3") == Some(true) {
                svc.requires_s3 = true;
            }

            let mut method = MethodDef {
                source: source_of(op, self.root()),
                description: op.string_at("description"),
                attributes: op.attributes().iter().map(ir_attribute).collect(),
                ..MethodDef::new(op_name.clone())
            };

            if let Some(info) = cache.get(&op_name) {
                method.cache_ttl.clone_from(&info.ttl);
                method.cache_tags.clone_from(&info.tags);
                if !method.cache_ttl.is_empty() {
                    svc.requires_redis = true;
                }
            }

            apply_method_attributes(op, &mut method, svc);
            if op.exists("testHints") {
                method.set_meta("testHints", true);
            }

            let root = self.root();
            if let Some(input) = op.field("input").or_else(|| op.field("in")) {
                method.input = parse_entity(&format!("{op_name}Request"), input, FieldScope::Contract, root);
            }
            if let Some(output) = op.field("output").or_else(|| op.field("out")) {
                method.output = parse_entity(&format!("{op_name}Response"), output, FieldScope::Contract, root);
            }

            let mut warnings = Vec::new();
            if let Some(sources) = op.field("sources") {
                method.sources = parse_sources(sources, &op_name, &catalog, svc, &mut warnings, root);
            }

            for dep in trimmed_strings(op, "uses") {
                let dep = normalize_service_name(&dep);
                if dep != svc_name && !svc.uses.contains(&dep) {
                    svc.uses.push(dep);
                }
            }

            let impl_value = find_impl(op);
            if let Some(iv) = impl_value {
                method.implementation = parse_impl(iv);
                if let Some(code) = iv.field("code")
                    && method.implementation.is_some()
                {
                    let location = location_of(code, root, &format!("{op_name}.impls.go.code"));
                    let site = ImplSite {
                        service: &svc_name,
                        method: &op_name,
                        code: code.as_str().unwrap_or_default(),
                        location: &location,
                        has_output: method.has_output(),
                    };
                    warnings.extend(lint::named_return_lints(&site));
                    warnings.extend(lint::anti_pattern_lints(&site));
                }
            }

            if let Some(flow) = op.field("flow")
                && flow.kind() == ValueKind::List
            {
                let mut ctx = ParseContext::new(format!("{op_name}.flow"));
                ctx.root = root.map(Path::to_path_buf);
                method.flow = parse_steps(flow, &ctx)?;
                validator.validate(&svc_name, &op_name, &method.flow, &mut warnings);
            }

            if let Some(iv) = impl_value
                && let Some(code) = iv.field("code")
            {
                let location = location_of(code, root, &format!("{op_name}.impls.go.code"));
                let reason_value = iv.field("flowFirstBypassReason").unwrap_or(code);
                let reason_path = if iv.exists("flowFirstBypassReason") {
                    format!("{op_name}.impls.go.flowFirstBypassReason")
                } else {
                    String::new()
                };
                let reason_location = location_of(reason_value, root, &reason_path);
                let reason = iv.string_at("flowFirstBypassReason");
                let site = ImplSite {
                    service: &svc_name,
                    method: &op_name,
                    code: code.as_str().unwrap_or_default(),
                    location: &location,
                    has_output: method.has_output(),
                };
                let bypass = Bypass {
                    enabled: iv.bool_at("flowFirstBypass").unwrap_or(false),
                    reason: &reason,
                    reason_location: &reason_location,
                };
                warnings.extend(lint::flow_first_lint(&site, !method.flow.is_empty(), &bypass));
            }

            method.throws = op
                .strings_at("throws")
                .iter()
                .map(|s| s.trim().to_string())
                .collect();

            for event in trimmed_strings(op, "publishes") {
                if !svc.publishes.contains(&event) {
                    svc.publishes.push(event.clone());
                }
                method.publishes.push(event);
                svc.requires_nats = true;
            }
            method.broadcasts = trimmed_strings(op, "broadcasts");

            if let Some(subs) = op.field("subscribes") {
                for sub in subs.fields() {
                    let handler = sub.value.as_str().unwrap_or_default().trim().to_string();
                    svc.subscribes.insert(sub.label.trim().to_string(), handler);
                    svc.requires_nats = true;
                }
            }

            method.pagination = parse_pagination(op);
            if method.pagination.is_none() && method.output.has_list_field() {
                method.pagination = Some(Pagination::offset_default());
            }
            add_pagination_fields(&mut method);

            svc.methods.push(method);
            for w in warnings {
                self.warn(w);
            }
        }

        if let Some(block) = api.field("Services") {
            apply_service_block(block, &mut services);
        }

        let mut out: Vec<ServiceDef> = services.into_values().collect();
        for svc in &mut out {
            svc.methods.sort_by(|a, b| a.name.cmp(&b.name));
        }
        tracing::debug!(services = out.len(), "extracted services");

        Ok(out)
    }
}

fn apply_method_attributes(op: &dyn ConfigValue, method: &mut MethodDef, svc: &mut ServiceDef) {
    for attr in op.attributes() {
        match attr.name.as_str() {
            "idempotent" => method.idempotent = true,
            "dedupeKey" => {
                let keys: Vec<&str> = (0..attr.args.len()).map_while(|i| attr.positional(i)).collect();
                method.dedupe_key = keys.join(", ");
            }
            "outbox" => {
                method.outbox = true;
                svc.requires_sql = true;
            }
            "audit" => {
                method.set_meta("audit", true);
                if let Some(event) = attr.positional(0) {
                    method.set_meta("audit_event", event.trim_matches('"'));
                }
            }
            _ => {}
        }
    }
}

fn parse_sources(
    sources: &dyn ConfigValue,
    op_name: &str,
    catalog: &EntityCatalog,
    svc: &mut ServiceDef,
    warnings: &mut Vec<Warning>,
    root: Option<&std::path::Path>,
) -> Vec<Source> {
    let mut out = Vec::new();

    for src in sources.fields() {
        let name = src.label.to_string();
        let v = src.value;
        let kind = v.string_at("kind");
        let entity = v.string_at("entity");
        let location = location_of(v, root, &format!("{op_name}.sources.{name}"));

        if !entity.is_empty() && kind == "sql" {
            match catalog.get(&entity) {
                None => warnings.push(
                    Warning::new(
                        DiagnosticKind::Architecture,
                        "UNKNOWN_ENTITY",
                        format!("Source '{name}' in operation '{op_name}' refers to unknown entity '{entity}'"),
                    )
                    .severity(Severity::Error)
                    .op(op_name)
                    .hint("Define the entity in cue/domain/ or check spelling")
                    .at(&location),
                ),
                Some(info) if info.dto => warnings.push(
                    Warning::new(
                        DiagnosticKind::Architecture,
                        "DTO_AS_REPO",
                        format!("Source '{name}' in operation '{op_name}' refers to DTO-only entity '{entity}'"),
                    )
                    .severity(Severity::Error)
                    .op(op_name)
                    .hint("Repository access is not allowed for DTOs. Remove @dto(only=true) or use a real domain entity")
                    .at(&location),
                ),
                Some(_) => {}
            }
        }

        match kind.as_str() {
            "sql" => svc.requires_sql = true,
            "mongo" => svc.requires_mongo = true,
            "redis" => svc.requires_redis = true,
            "s3" => svc.requires_s3 = true,
            _ => {}
        }

        out.push(Source {
            name,
            collection: v.string_at("collection"),
            query: string_map(v.field("by")),
            filter: string_map(v.field("filter")),
            kind,
            entity,
            metadata: None,
        });
    }

    out
}

fn string_map(value: Option<&dyn ConfigValue>) -> BTreeMap<String, String> {
    crate::helpers::string_members(value).into_iter().collect()
}

// `impls.go`, then `_impl`, then `impl`.
fn find_impl(op: &dyn ConfigValue) -> Option<&dyn ConfigValue> {
    op.lookup("impls.go")
        .or_else(|| op.field("_impl"))
        .or_else(|| op.field("impl"))
}

fn parse_impl(iv: &dyn ConfigValue) -> Option<Impl> {
    let code = iv.str_at("code").unwrap_or_default();
    if code.is_empty() {
        return None;
    }

    Some(Impl {
        lang: iv.string_at("lang"),
        code: code.to_string(),
        imports: trimmed_strings(iv, "imports"),
        requires_tx: iv.bool_at("tx").unwrap_or(false),
        flow_first_bypass: iv.bool_at("flowFirstBypass").unwrap_or(false),
        flow_first_bypass_reason: iv.string_at("flowFirstBypassReason"),
    })
}

const OFFSET_FIELDS: &[(&str, TypeKind)] = &[("limit", TypeKind::Int), ("offset", TypeKind::Int)];
const CURSOR_FIELDS: &[(&str, TypeKind)] = &[("cursor", TypeKind::String), ("limit", TypeKind::Int)];

/// Explicit `pagination` of an operation; a block without `type` is ignored.
pub(crate) fn parse_pagination(op: &dyn ConfigValue) -> Option<Pagination> {
    let pg = op.field("pagination")?;
    let kind = pg.string_at("type");

    (!kind.is_empty()).then(|| Pagination {
        kind,
        default_limit: pg.int_at("default_limit").unwrap_or(0),
        max_limit: pg.int_at("max_limit").unwrap_or(0),
    })
}

/// Add the request fields a pagination style needs, when absent.
pub fn add_pagination_fields(method: &mut MethodDef) {
    let Some(pagination) = &method.pagination else {
        return;
    };
    let wanted = match pagination.kind.as_str() {
        "offset" => OFFSET_FIELDS,
        "cursor" => CURSOR_FIELDS,
        _ => &[],
    };

    for (name, kind) in wanted {
        if method.input.field(name).is_none() {
            method
                .input
                .fields
                .push(FieldDef::new(*name, TypeRef::scalar(kind.clone())).optional());
        }
    }
}

// `Services: { name: { description, owns } }` with service-level attributes.
fn apply_service_block(block: &dyn ConfigValue, services: &mut BTreeMap<String, ServiceDef>) {
    for f in block.fields() {
        let name = normalize_service_name(f.clean_label());
        let Some(svc) = services.get_mut(&name) else {
            continue;
        };
        if svc.description.is_empty() {
            svc.description = f.value.string_at("description");
        }
        svc.attributes
            .extend(f.value.attributes().iter().map(ir_attribute));
    }
}
