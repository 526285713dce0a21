//! HTTP endpoint extraction from the `HTTP` block of the API tree.

use crate::{
    defs::EndpointDef,
    entity::{FieldScope, parse_entity},
    error::NormalizeError,
    helpers::{clean_name, normalize_service_name, parse_size, source_of, trimmed_strings},
    service::{operations, parse_pagination},
};
use archon_ir::model::{CircuitBreaker, Pagination, RateLimit, RetryPolicy, Slo, TestHints};
use archon_tree::{ConfigValue, ValueKind};
use std::{collections::BTreeMap, path::Path};

/// Members of the `HTTP` block that configure defaults instead of naming an
/// endpoint.
const HTTP_SETTINGS: &[&str] = &["default_rate_limit", "default_timeout", "default_max_body_size"];

/// Operation name prefixes treated as list reads for auto-invalidation.
const LIST_PREFIXES: &[&str] = &["List", "AdminList"];

///
/// HttpDefaults
///
/// Limits applied to endpoints that set none. Values in the `HTTP` block
/// override these per run.
///

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpDefaults {
    pub rate_limit: Option<RateLimit>,
    pub timeout: String,

    /// Body limit in bytes.
    pub max_body_size: i64,
}

impl HttpDefaults {
    pub const MAX_BODY_SIZE: i64 = 1024 * 1024;

    // `HTTP.default_*` layered over `self`.
    fn overlay(&self, http: &dyn ConfigValue) -> Self {
        let mut out = self.clone();

        if let Some(rl) = http.field("default_rate_limit") {
            out.rate_limit = Some(RateLimit {
                rps: rl.int_at("rps").unwrap_or(0),
                burst: rl.int_at("burst").unwrap_or(0),
            });
        }
        let timeout = http.string_at("default_timeout");
        if !timeout.is_empty() {
            out.timeout = timeout;
        }
        if let Some(size) = http.str_at("default_max_body_size") {
            out.max_body_size = parse_size(size);
        }

        out
    }
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            rate_limit: None,
            timeout: String::new(),
            max_body_size: Self::MAX_BODY_SIZE,
        }
    }
}

/// Endpoints of the `HTTP` block in declaration order. Each one must name an
/// operation that has a service.
pub fn extract_endpoints(
    api: &dyn ConfigValue,
    defaults: &HttpDefaults,
    root: Option<&Path>,
) -> Result<Vec<EndpointDef>, NormalizeError> {
    let Some(http) = api.field("HTTP") else {
        return Ok(Vec::new());
    };
    let defaults = defaults.overlay(http);

    let ops: BTreeMap<String, &dyn ConfigValue> = operations(api).into_iter().collect();
    let mut endpoints = Vec::new();

    for entry in http.fields() {
        let name = clean_name(entry.label).to_string();
        if HTTP_SETTINGS.contains(&name.as_str()) {
            continue;
        }
        let ep = entry.value;

        let Some(op) = ops.get(&name).copied() else {
            return Err(NormalizeError::UnmatchedEndpoint(name));
        };
        let raw_service = op.string_at("service");
        let service = normalize_service_name(&raw_service);
        if service.is_empty() {
            return Err(NormalizeError::MissingService(name));
        }

        let mut def = EndpointDef {
            method: ep.string_at("method"),
            path: ep.string_at("path"),
            service,
            rpc: name.clone(),
            description: ep.string_at("description"),
            room_param: ep.string_at("room"),
            auth_type: ep.string_at("auth.type"),
            permission: ep.string_at("auth.permission"),
            auth_check: ep.string_at("auth.check"),
            cache_ttl: ep.string_at("cache.ttl"),
            cache_tags: ep.strings_at("cache.tags"),
            invalidate: ep.strings_at("invalidate"),
            optimistic_update: ep.string_at("optimistic_update"),
            view: ep.string_at("view"),
            messages: messages(ep),
            errors: trimmed_strings(ep, "errors"),
            source: source_of(ep, root),
            ..EndpointDef::default()
        };

        apply_rbac(op, &mut def);
        def.test_hints = op
            .field("testHints")
            .or_else(|| ep.field("testHints"))
            .map(|hints| TestHints {
                happy_path: hints.string_at("happyPath"),
                error_cases: hints.strings_at("errorCases"),
            });

        // mutations refresh the service's list reads unless told otherwise
        let read_only = matches!(def.method.to_ascii_uppercase().as_str(), "GET" | "WS");
        if !read_only && def.invalidate.is_empty() {
            def.invalidate = ops
                .iter()
                .filter(|(other, value)| {
                    value.string_at("service") == raw_service
                        && LIST_PREFIXES.iter().any(|p| other.starts_with(p))
                })
                .map(|(other, _)| other.clone())
                .collect();
        }
        def.invalidate.sort();

        def.pagination = parse_pagination(op).or_else(|| infer_pagination(&name, op, root));

        if def.permission.is_empty() {
            def.permission = ep.string_at("auth.action");
        }
        def.auth_roles.extend(trimmed_strings(ep, "auth.roles"));
        def.auth_inject = trimmed_strings(ep, "auth.inject");

        if let Some(idempotency) = ep.bool_at("idempotency") {
            def.idempotent = idempotency;
        }
        if ep.has_attribute("idempotent") {
            def.idempotent = true;
        }
        if let Some(key) = ep.attribute("dedupeKey").and_then(|a| a.positional(0)) {
            def.dedupe_key = key.trim_matches('"').to_string();
        }

        def.rate_limit = ep
            .field("rate_limit")
            .map(|rl| RateLimit {
                rps: rl.int_at("rps").unwrap_or(0),
                burst: rl.int_at("burst").unwrap_or(0),
            })
            .filter(|rl| rl.rps > 0 || rl.burst > 0)
            .or_else(|| defaults.rate_limit.clone());

        def.timeout = ep.string_at("timeout");
        if def.timeout.is_empty() {
            def.timeout.clone_from(&defaults.timeout);
        }

        if let Some(size) = ep.str_at("max_body_size") {
            def.max_body_size = parse_size(size);
        }
        if def.max_body_size == 0 {
            def.max_body_size = defaults.max_body_size;
        }

        def.circuit_breaker = ep.field("circuit_breaker").map(parse_circuit_breaker);
        def.retry = ep.field("retry").map(parse_retry);
        if let Some(slo) = ep.field("slo") {
            def.slo = Slo {
                latency: slo.string_at("latency"),
                success: slo.string_at("success"),
            };
        }

        if def.method.is_empty() || def.path.is_empty() {
            return Err(NormalizeError::InvalidEndpoint {
                name,
                path: format!("HTTP.{}", entry.label),
            });
        }
        endpoints.push(def);
    }

    tracing::debug!(endpoints = endpoints.len(), "extracted endpoints");

    Ok(endpoints)
}

// `@rbac(role=..., permission=...)` on the operation implies JWT auth.
fn apply_rbac(op: &dyn ConfigValue, def: &mut EndpointDef) {
    for attr in op.attributes().iter().filter(|a| a.name == "rbac") {
        for arg in &attr.args {
            let value = arg.value.trim_matches('"').to_string();
            match arg.key.as_deref() {
                Some("role") => def.auth_roles.push(value),
                Some("permission") => def.permission = value,
                _ => continue,
            }
            if def.auth_type.is_empty() {
                def.auth_type = "jwt".to_string();
            }
        }
    }
}

// Messages are a list of names or the labels of a struct.
fn messages(ep: &dyn ConfigValue) -> Vec<String> {
    let Some(value) = ep.field("messages") else {
        return Vec::new();
    };

    match value.kind() {
        ValueKind::Struct => value
            .fields()
            .iter()
            .map(|f| f.clean_label().to_string())
            .collect(),
        _ => ep
            .strings_at("messages")
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
    }
}

// A response with any list field pages by offset.
fn infer_pagination(name: &str, op: &dyn ConfigValue, root: Option<&Path>) -> Option<Pagination> {
    let output = op.field("output").or_else(|| op.field("out"))?;
    let response = parse_entity(&format!("{name}Response"), output, FieldScope::Contract, root);

    response.has_list_field().then(Pagination::offset_default)
}

fn parse_circuit_breaker(cb: &dyn ConfigValue) -> CircuitBreaker {
    let defaults = CircuitBreaker::default();
    let timeout = cb.string_at("timeout");

    CircuitBreaker {
        threshold: cb.int_at("threshold").unwrap_or(defaults.threshold),
        timeout: if timeout.is_empty() { defaults.timeout } else { timeout },
        half_open_max: cb.int_at("half_open_max").unwrap_or(defaults.half_open_max),
    }
}

fn parse_retry(retry: &dyn ConfigValue) -> RetryPolicy {
    let defaults = RetryPolicy::default();
    let statuses: Vec<i64> = retry
        .field("retry_on_statuses")
        .map(|list| list.elements().into_iter().filter_map(ConfigValue::as_int).collect())
        .unwrap_or_default();

    RetryPolicy {
        enabled: retry.bool_at("enabled").unwrap_or(defaults.enabled),
        max_attempts: retry.int_at("max_attempts").unwrap_or(defaults.max_attempts),
        base_delay_ms: retry.int_at("base_delay_ms").unwrap_or(defaults.base_delay_ms),
        retry_network_errors: retry
            .bool_at("retry_network_errors")
            .unwrap_or(defaults.retry_network_errors),
        retry_on_statuses: if statuses.is_empty() {
            defaults.retry_on_statuses
        } else {
            statuses
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_tree::Node;

    fn op(service: &str) -> Node {
        Node::structure().field("service", Node::text(service))
    }

    fn route(method: &str, path: &str) -> Node {
        Node::structure()
            .field("method", Node::text(method))
            .field("path", Node::text(path))
    }

    fn extract(api: &Node) -> Vec<EndpointDef> {
        extract_endpoints(api, &HttpDefaults::default(), None).expect("endpoints should extract")
    }

    #[test]
    fn endpoints_follow_http_block_order() {
        let api = Node::structure()
            .field("GetOrder", op("orders"))
            .field("CreateOrder", op("orders"))
            .field(
                "HTTP",
                Node::structure()
                    .field("default_timeout", Node::text("5s"))
                    .field("CreateOrder", route("POST", "/orders"))
                    .field("GetOrder", route("GET", "/orders/{id}").field("timeout", Node::text("1s"))),
            );

        let eps = extract(&api);

        let rpcs: Vec<_> = eps.iter().map(|e| e.rpc.as_str()).collect();
        assert_eq!(rpcs, ["CreateOrder", "GetOrder"]);
        assert_eq!(eps[0].service, "Orders");
        assert_eq!(eps[0].timeout, "5s", "block default applies");
        assert_eq!(eps[1].timeout, "1s", "explicit timeout wins");
        assert_eq!(eps[0].max_body_size, HttpDefaults::MAX_BODY_SIZE);
    }

    #[test]
    fn unmatched_endpoint_is_fatal() {
        let api = Node::structure().field("HTTP", Node::structure().field("Ghost", route("GET", "/ghost")));

        let err = extract_endpoints(&api, &HttpDefaults::default(), None).expect_err("unmatched");
        assert!(matches!(err, NormalizeError::UnmatchedEndpoint(ref n) if n == "Ghost"));
    }

    #[test]
    fn endpoint_without_path_is_invalid() {
        let api = Node::structure()
            .field("Ping", op("health"))
            .field("HTTP", Node::structure().field("Ping", Node::structure().field("method", Node::text("GET"))));

        let err = extract_endpoints(&api, &HttpDefaults::default(), None).expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "invalid endpoint Ping (HTTP.Ping): method/path/service are required"
        );
    }

    #[test]
    fn mutations_invalidate_sibling_lists() {
        let api = Node::structure()
            .field("ListOrders", op("orders"))
            .field("AdminListOrders", op("orders"))
            .field("ListInvoices", op("billing"))
            .field("CreateOrder", op("orders"))
            .field("GetOrder", op("orders"))
            .field(
                "HTTP",
                Node::structure()
                    .field("CreateOrder", route("POST", "/orders"))
                    .field("GetOrder", route("GET", "/orders/{id}")),
            );

        let eps = extract(&api);

        assert_eq!(eps[0].invalidate, ["AdminListOrders", "ListOrders"]);
        assert!(eps[1].invalidate.is_empty(), "reads invalidate nothing");
    }

    #[test]
    fn rbac_auth_and_idempotency() {
        let api = Node::structure()
            .field(
                "DeleteUser",
                op("users").attr("@rbac(role=admin, permission=\"users.delete\")").expect("attr"),
            )
            .field(
                "HTTP",
                Node::structure().field(
                    "DeleteUser",
                    route("DELETE", "/users/{id}")
                        .field("auth", Node::structure().field("roles", Node::texts([" owner "])))
                        .field("idempotency", Node::boolean(true))
                        .attr("@dedupeKey(userId)")
                        .expect("attr"),
                ),
            );

        let ep = &extract(&api)[0];

        assert_eq!(ep.auth_type, "jwt");
        assert_eq!(ep.permission, "users.delete");
        assert_eq!(ep.auth_roles, ["admin", "owner"]);
        assert!(ep.idempotent);
        assert_eq!(ep.dedupe_key, "userId");
    }

    #[test]
    fn resilience_settings_get_defaults() {
        let api = Node::structure()
            .field("Sync", op("ledger"))
            .field(
                "HTTP",
                Node::structure()
                    .field(
                        "default_rate_limit",
                        Node::structure().field("rps", Node::int(10)).field("burst", Node::int(20)),
                    )
                    .field(
                        "Sync",
                        route("POST", "/sync")
                            .field("max_body_size", Node::text("512kb"))
                            .field("circuit_breaker", Node::structure().field("threshold", Node::int(8)))
                            .field(
                                "retry",
                                Node::structure()
                                    .field("max_attempts", Node::int(5))
                                    .field("retry_on_statuses", Node::list([Node::int(503)])),
                            ),
                    ),
            );

        let ep = &extract(&api)[0];

        assert_eq!(ep.rate_limit, Some(RateLimit { rps: 10, burst: 20 }));
        assert_eq!(ep.max_body_size, 512 * 1024);
        let cb = ep.circuit_breaker.as_ref().expect("circuit breaker");
        assert_eq!((cb.threshold, cb.timeout.as_str(), cb.half_open_max), (8, "30s", 3));
        let retry = ep.retry.as_ref().expect("retry");
        assert!(retry.enabled && retry.retry_network_errors);
        assert_eq!((retry.max_attempts, retry.base_delay_ms), (5, 200));
        assert_eq!(retry.retry_on_statuses, [503]);
    }

    #[test]
    fn list_responses_page_by_offset() {
        let api = Node::structure()
            .field(
                "ListOrders",
                op("orders").field(
                    "output",
                    Node::structure().field("items", Node::list_of(Node::structure().with_ref("#Order"))),
                ),
            )
            .field("HTTP", Node::structure().field("ListOrders", route("GET", "/orders")));

        assert_eq!(extract(&api)[0].pagination, Some(Pagination::offset_default()));
    }

    #[test]
    fn messages_accept_lists_and_structs() {
        let api = Node::structure()
            .field("Chat", op("chat"))
            .field("Feed", op("chat"))
            .field(
                "HTTP",
                Node::structure()
                    .field("Chat", route("WS", "/ws").field("messages", Node::texts([" Join ", "Leave"])))
                    .field(
                        "Feed",
                        route("WS", "/feed").field("messages", Node::structure().field("Post", Node::any())),
                    ),
            );

        let eps = extract(&api);
        assert_eq!(eps[0].messages, ["Join", "Leave"]);
        assert_eq!(eps[1].messages, ["Post"]);
    }
}
