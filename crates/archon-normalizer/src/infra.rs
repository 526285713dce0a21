//! Project-level extractors: project and target, events, errors, schedules,
//! RBAC, views, scenarios, transformer toggles and the registry-driven
//! infrastructure blocks (config, auth, notifications).

use crate::{
    defs::{
        ConfigDef, EventDef, FieldDef, PayloadField, ScenarioDef, ScenarioExpect, ScenarioStep,
        ScheduleDef, TransformersDef,
    },
    entity::{FieldScope, parse_entity},
    error::NormalizeError,
    helpers::{
        clean_name, is_exported_name, normalize_service_name, source_of, string_members,
        strings_of, to_value, trimmed_strings,
    },
    types::map_declared_type,
};
use archon_ir::{
    model::{
        Auth, AuthClaims, AuthOps, ErrorDef, NotificationChannelSpec, NotificationChannels,
        NotificationMuting, NotificationPolicies, NotificationPolicyRule, Project, Rbac, Target,
        TypeKind, TypeRef, View,
    },
    value::Value,
};
use archon_tree::{ConfigValue, ValueKind};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

const DEFAULT_JWT_ALGORITHM: &str = "RS256";

//
// project
//

/// `#Project` and `#Target`; target members fall back to the defaults.
#[must_use]
pub fn extract_project(tree: &dyn ConfigValue) -> Project {
    let defaults = Target::default();
    let target = tree.field("#Target").map_or_else(Target::default, |t| {
        let pick = |key: &str, fallback: &str| {
            t.str_at(key)
                .map_or_else(|| fallback.to_string(), |s| s.trim().to_string())
        };
        Target {
            lang: pick("lang", &defaults.lang),
            framework: pick("framework", &defaults.framework),
            db: pick("db", &defaults.db),
            cache: pick("cache", &defaults.cache),
            queue: pick("queue", &defaults.queue),
            storage: pick("storage", &defaults.storage),
        }
    });

    let (name, version) = tree
        .field("#Project")
        .map(|p| (p.string_at("name"), p.string_at("version")))
        .unwrap_or_default();

    Project {
        name,
        version,
        target,
    }
}

/// `#Transformers` toggles, when declared.
#[must_use]
pub fn extract_transformers(tree: &dyn ConfigValue) -> Option<TransformersDef> {
    let t = tree.field("#Transformers")?;
    let mut cfg = TransformersDef::default();

    if let Some(b) = t.bool_at("timestamps.enabled") {
        cfg.timestamps = b;
    }
    if let Some(b) = t.bool_at("soft_delete.enabled") {
        cfg.soft_delete = b;
    }
    if let Some(b) = t.bool_at("image.enabled") {
        cfg.image = b;
    }
    if let Some(suffix) = t.str_at("image.thumb_suffix") {
        cfg.thumb_suffix = suffix.to_string();
    }
    if let Some(b) = t.bool_at("validation.enabled") {
        cfg.validation = b;
    }

    Some(cfg)
}

//
// events and errors
//

/// Events declared as `#`-labelled members of an events tree.
#[must_use]
pub fn extract_events(tree: &dyn ConfigValue, root: Option<&Path>) -> Vec<EventDef> {
    tree.fields()
        .into_iter()
        .filter(|f| f.is_definition())
        .map(|f| {
            let name = f.clean_label();
            let entity = parse_entity(name, f.value, FieldScope::Contract, root);
            EventDef {
                name: entity.name,
                fields: entity.fields,
                metadata: None,
                source: source_of(f.value, root),
            }
        })
        .collect()
}

/// `#Events: { Name: { payload: { field: "type" } } }`.
#[must_use]
pub fn extract_architecture_events(tree: &dyn ConfigValue, root: Option<&Path>) -> Vec<EventDef> {
    let Some(events) = tree.field("#Events") else {
        return Vec::new();
    };

    events
        .fields()
        .into_iter()
        .map(|ev| {
            let fields = ev
                .value
                .field("payload")
                .map(|payload| {
                    payload
                        .fields()
                        .into_iter()
                        .map(|p| {
                            let ty = payload_type(p.value.as_str().unwrap_or_default().trim());
                            FieldDef::new(clean_name(p.label), ty)
                        })
                        .collect()
                })
                .unwrap_or_default();

            EventDef {
                name: clean_name(ev.label).to_string(),
                fields,
                metadata: None,
                source: source_of(ev.value, root),
            }
        })
        .collect()
}

// Payload types are type names; capitalised unknowns are entity references.
fn payload_type(raw: &str) -> TypeRef {
    map_declared_type(raw).unwrap_or_else(|| {
        if is_exported_name(raw) {
            TypeRef::entity(raw)
        } else {
            TypeRef::scalar(TypeKind::from(raw))
        }
    })
}

/// `#Errors: { Name: { code, http, msg } }`.
#[must_use]
pub fn extract_errors(tree: &dyn ConfigValue, root: Option<&Path>) -> Vec<ErrorDef> {
    let Some(errors) = tree.field("#Errors") else {
        return Vec::new();
    };

    errors
        .fields()
        .into_iter()
        .map(|e| ErrorDef {
            name: clean_name(e.label).to_string(),
            code: e.value.int_at("code").unwrap_or(0),
            http_status: e.value.int_at("http").unwrap_or(0),
            message: e.value.str_at("msg").unwrap_or_default().to_string(),
            source: source_of(e.value, root),
        })
        .collect()
}

//
// schedules
//

/// `Schedules: { name: { service, action, at, every, publish, payload } }`.
#[must_use]
pub fn extract_schedules(tree: &dyn ConfigValue) -> Vec<ScheduleDef> {
    let Some(schedules) = tree.field("Schedules") else {
        return Vec::new();
    };

    schedules
        .fields()
        .into_iter()
        .map(|s| {
            let v = s.value;
            ScheduleDef {
                name: s.label.trim().to_string(),
                service: normalize_service_name(&v.string_at("service")),
                action: v.string_at("action"),
                at: v.string_at("at"),
                every: v.string_at("every"),
                publish: v.string_at("publish"),
                payload: v.field("payload").map(payload_fields).unwrap_or_default(),
            }
        })
        .collect()
}

// Literal payload entries typed int, bool or string; anything else is dropped.
fn payload_fields(payload: &dyn ConfigValue) -> Vec<PayloadField> {
    payload
        .fields()
        .into_iter()
        .filter_map(|f| {
            let name = f.label.trim();
            if name.is_empty() {
                return None;
            }
            let (ty, value) = if let Some(n) = f.value.as_int() {
                ("int", n.to_string())
            } else if let Some(b) = f.value.as_bool() {
                ("bool", b.to_string())
            } else {
                ("string", f.value.as_str()?.to_string())
            };

            Some(PayloadField {
                name: name.to_string(),
                ty: ty.to_string(),
                value,
            })
        })
        .collect()
}

//
// rbac
//

/// `#RBAC {roles, permissions}`, or the policy form built from `Roles`,
/// `Actions` and `Policies`.
#[must_use]
pub fn extract_rbac(tree: &dyn ConfigValue) -> Option<Rbac> {
    let Some(rbac) = tree.field("#RBAC") else {
        return rbac_from_policies(tree);
    };

    let roles = rbac
        .field("roles")
        .map(|roles| {
            roles
                .fields()
                .into_iter()
                .map(|r| (r.label.trim().to_string(), strings_of(r.value)))
                .collect()
        })
        .unwrap_or_default();

    Some(Rbac {
        roles,
        permissions: string_members(rbac.field("permissions")).into_iter().collect(),
    })
}

// `*` grants every known permission, `resource.*` every action of a resource.
fn rbac_from_policies(tree: &dyn ConfigValue) -> Option<Rbac> {
    let actions = tree.field("Actions");
    let policies = tree.field("Policies");
    if tree.field("Roles").is_none() && actions.is_none() && policies.is_none() {
        return None;
    }

    let mut all: BTreeSet<String> = BTreeSet::new();
    let mut by_resource: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for resource in actions.map(|a| a.fields()).unwrap_or_default() {
        let name = resource.label.trim();
        for action in resource.value.fields() {
            let perm = format!("{name}.{}", action.label.trim());
            all.insert(perm.clone());
            by_resource.entry(name.to_string()).or_default().push(perm);
        }
    }

    let mut grants: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for policy in policies.map(|p| p.fields()).unwrap_or_default() {
        if !policy.value.exists("allow") {
            continue;
        }
        let role = grants.entry(policy.label.trim().to_string()).or_default();
        for pattern in trimmed_strings(policy.value, "allow") {
            if pattern == "*" {
                role.extend(all.iter().cloned());
            } else if let Some(resource) = pattern.strip_suffix(".*") {
                role.extend(by_resource.get(resource).into_iter().flatten().cloned());
            } else {
                all.insert(pattern.clone());
                role.insert(pattern);
            }
        }
    }

    Some(Rbac {
        roles: grants
            .into_iter()
            .map(|(role, perms)| (role, perms.into_iter().collect()))
            .collect(),
        permissions: all.into_iter().map(|p| (p, String::new())).collect(),
    })
}

//
// views
//

/// `view -> role -> fields`. Fields are struct labels or a string list;
/// hidden labels are skipped.
#[must_use]
pub fn extract_views(tree: &dyn ConfigValue) -> Vec<View> {
    tree.fields()
        .into_iter()
        .filter(|v| !v.is_definition())
        .map(|v| View {
            name: v.label.trim().to_string(),
            roles: v
                .value
                .fields()
                .into_iter()
                .map(|role| (role.label.trim().to_string(), view_fields(role.value)))
                .collect(),
        })
        .collect()
}

fn view_fields(role: &dyn ConfigValue) -> Vec<String> {
    let names = if role.kind() == ValueKind::Struct {
        role.fields().iter().map(|f| f.label.trim().to_string()).collect()
    } else {
        strings_of(role)
    };

    names
        .into_iter()
        .filter(|n| !n.is_empty() && !n.starts_with('_'))
        .collect()
}

//
// scenarios
//

/// Members labelled `Scenario*`.
#[must_use]
pub fn extract_scenarios(tree: &dyn ConfigValue, root: Option<&Path>) -> Vec<ScenarioDef> {
    tree.fields()
        .into_iter()
        .filter(|f| f.label.starts_with("Scenario"))
        .map(|f| ScenarioDef {
            name: f.label.to_string(),
            description: f.value.string_at("description"),
            steps: f
                .value
                .field("steps")
                .filter(|s| s.kind() == ValueKind::List)
                .map(|s| s.elements().into_iter().map(parse_scenario_step).collect())
                .unwrap_or_default(),
            source: source_of(f.value, root),
        })
        .collect()
}

fn parse_scenario_step(step: &dyn ConfigValue) -> ScenarioStep {
    let map_of = |v: Option<&dyn ConfigValue>| match v.map(to_value) {
        Some(Value::Map(map)) => map,
        _ => BTreeMap::new(),
    };

    let expect = step.field("expect").map_or_else(ScenarioExpect::default, |e| ScenarioExpect {
        status: e.int_at("status").unwrap_or(0),
        body: map_of(e.field("body")),
    });

    ScenarioStep {
        name: step.string_at("name"),
        action: step.string_at("action"),
        input: map_of(step.field("input")),
        expect,
        export: step
            .field("export")
            .map(|e| {
                e.fields()
                    .into_iter()
                    .map(|f| (f.label.to_string(), f.value.as_str().unwrap_or_default().to_string()))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

//
// registry-driven blocks
//

/// `#AppConfig` parsed as a field list.
pub fn extract_config(tree: &dyn ConfigValue, root: Option<&Path>) -> Result<Option<ConfigDef>, NormalizeError> {
    let Some(cfg) = tree.field("#AppConfig") else {
        return Ok(None);
    };
    if cfg.kind() != ValueKind::Struct {
        return Err(NormalizeError::shape("#AppConfig", "struct"));
    }

    let entity = parse_entity("AppConfig", cfg, FieldScope::Domain, root);

    Ok(Some(ConfigDef { fields: entity.fields }))
}

/// `#Auth.jwt` plus the auth service's operation wiring.
pub fn extract_auth(tree: &dyn ConfigValue) -> Result<Option<Auth>, NormalizeError> {
    let Some(auth) = tree.field("#Auth") else {
        return Ok(None);
    };
    let Some(jwt) = auth.field("jwt") else {
        return Ok(None);
    };
    if jwt.kind() != ValueKind::Struct {
        return Err(NormalizeError::shape("#Auth.jwt", "struct"));
    }

    let claim = |name: &str, fallback: &str| {
        let s = jwt.string_at(&format!("claims.{name}.field"));
        if s.is_empty() { fallback.to_string() } else { s }
    };
    let algorithm = jwt.string_at("alg");

    Ok(Some(Auth {
        algorithm: if algorithm.is_empty() {
            DEFAULT_JWT_ALGORITHM.to_string()
        } else {
            algorithm
        },
        issuer: jwt.string_at("issuer"),
        audience: jwt.string_at("audience"),
        access_ttl: jwt.string_at("tokens.access_ttl"),
        refresh_ttl: jwt.string_at("tokens.refresh_ttl"),
        rotation: jwt.bool_at("tokens.rotation").unwrap_or(false),
        refresh_store: jwt.string_at("tokens.store"),
        claims: AuthClaims {
            user_id: claim("userId", "sub"),
            company_id: claim("companyId", "cid"),
            roles: claim("roles", "roles"),
            permissions: claim("perms", "perms"),
        },
        operations: AuthOps {
            service: normalize_service_name(&auth.string_at("service")),
            login_op: jwt.string_at("ops.login.op"),
            login_access_field: jwt.string_at("ops.login.access_field"),
            login_refresh_field: jwt.string_at("ops.login.refresh_field"),
            refresh_op: jwt.string_at("ops.refresh.op"),
            refresh_token_field: jwt.string_at("ops.refresh.token_field"),
            refresh_access_field: jwt.string_at("ops.refresh.access_field"),
            refresh_refresh_field: jwt.string_at("ops.refresh.refresh_field"),
            logout_op: jwt.string_at("ops.logout.op"),
            logout_token_field: jwt.string_at("ops.logout.token_field"),
        },
    }))
}

/// `#NotificationChannels`.
pub fn extract_notification_channels(
    tree: &dyn ConfigValue,
) -> Result<Option<NotificationChannels>, NormalizeError> {
    let Some(block) = tree.field("#NotificationChannels") else {
        return Ok(None);
    };
    if block.kind() != ValueKind::Struct {
        return Err(NormalizeError::shape("#NotificationChannels", "struct"));
    }

    let channels = block
        .field("channels")
        .map(|c| {
            c.fields()
                .into_iter()
                .map(|ch| {
                    let v = ch.value;
                    let spec = NotificationChannelSpec {
                        enabled: v.bool_at("enabled").unwrap_or(true),
                        driver: v.string_at("driver"),
                        topic: v.string_at("topic"),
                        subject: v.string_at("subject"),
                        template: v.string_at("template"),
                        dsn_env: v.string_at("dsn_env"),
                        brokers_env: v.string_at("brokers_env"),
                    };
                    (ch.clean_label().to_string(), spec)
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(NotificationChannels {
        enabled: block.bool_at("enabled").unwrap_or(true),
        default_channels: trimmed_strings(block, "default_channels"),
        channels,
    }))
}

/// `#NotificationPolicies`.
pub fn extract_notification_policies(
    tree: &dyn ConfigValue,
) -> Result<Option<NotificationPolicies>, NormalizeError> {
    let Some(block) = tree.field("#NotificationPolicies") else {
        return Ok(None);
    };
    let rules = match block.field("rules") {
        None => Vec::new(),
        Some(r) if r.kind() == ValueKind::List => r
            .elements()
            .into_iter()
            .map(|rule| NotificationPolicyRule {
                enabled: rule.bool_at("enabled").unwrap_or(true),
                event: rule.string_at("event"),
                kind: rule.string_at("type"),
                audience: rule.string_at("audience"),
                channels: trimmed_strings(rule, "channels"),
                template: rule.string_at("template"),
                mute_key: rule.string_at("mute_key"),
            })
            .collect(),
        Some(_) => return Err(NormalizeError::shape("#NotificationPolicies.rules", "list")),
    };

    Ok(Some(NotificationPolicies {
        enabled: block.bool_at("enabled").unwrap_or(true),
        rules,
    }))
}

/// `#NotificationMuting`.
pub fn extract_notification_muting(
    tree: &dyn ConfigValue,
) -> Result<Option<NotificationMuting>, NormalizeError> {
    let Some(block) = tree.field("#NotificationMuting") else {
        return Ok(None);
    };
    if block.kind() != ValueKind::Struct {
        return Err(NormalizeError::shape("#NotificationMuting", "struct"));
    }

    Ok(Some(NotificationMuting {
        enabled: block.bool_at("enabled").unwrap_or(false),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_tree::Node;

    #[test]
    fn target_defaults_fill_missing_members() {
        let tree = Node::structure()
            .field(
                "#Project",
                Node::structure()
                    .field("name", Node::text(" shop "))
                    .field("version", Node::text("1.2.0")),
            )
            .field("#Target", Node::structure().field("db", Node::text("mysql")));

        let project = extract_project(&tree);

        assert_eq!((project.name.as_str(), project.version.as_str()), ("shop", "1.2.0"));
        assert_eq!(project.target.db, "mysql");
        assert_eq!(project.target.lang, "go");
        assert_eq!(extract_project(&Node::structure()).target, Target::default());
    }

    #[test]
    fn transformer_toggles_override_defaults() {
        let tree = Node::structure().field(
            "#Transformers",
            Node::structure()
                .field("soft_delete", Node::structure().field("enabled", Node::boolean(false)))
                .field("image", Node::structure().field("thumb_suffix", Node::text("_small"))),
        );

        let cfg = extract_transformers(&tree).expect("declared");

        assert!(!cfg.soft_delete, "declared toggle wins");
        assert!(cfg.timestamps && cfg.image && cfg.validation, "undeclared toggles keep defaults");
        assert_eq!(cfg.thumb_suffix, "_small");
        assert!(extract_transformers(&Node::structure()).is_none());
    }

    #[test]
    fn events_from_both_forms() {
        let events = Node::structure()
            .field("#OrderPlaced", Node::structure().field("orderId", Node::string_type()))
            .field("helper", Node::structure());
        let arch = Node::structure().field(
            "#Events",
            Node::structure().field(
                "UserCreated",
                Node::structure().field(
                    "payload",
                    Node::structure()
                        .field("userId", Node::text("uuid"))
                        .field("profile", Node::text("Profile")),
                ),
            ),
        );

        let parsed = extract_events(&events, None);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "OrderPlaced");

        let arch_events = extract_architecture_events(&arch, None);
        let fields = &arch_events[0].fields;
        assert_eq!(fields[0].ty.kind, TypeKind::Uuid);
        assert_eq!(fields[1].ty, TypeRef::entity("Profile"));
    }

    #[test]
    fn errors_carry_code_and_status() {
        let tree = Node::structure().field(
            "#Errors",
            Node::structure().field(
                "NotFound",
                Node::structure()
                    .field("code", Node::int(404_001))
                    .field("http", Node::int(404))
                    .field("msg", Node::text("not found")),
            ),
        );

        let errors = extract_errors(&tree, None);

        assert_eq!(errors[0].name, "NotFound");
        assert_eq!((errors[0].code, errors[0].http_status), (404_001, 404));
    }

    #[test]
    fn schedule_payloads_are_typed() {
        let tree = Node::structure().field(
            "Schedules",
            Node::structure().field(
                "nightly",
                Node::structure()
                    .field("service", Node::text("billing_jobs"))
                    .field("every", Node::text("24h"))
                    .field(
                        "payload",
                        Node::structure()
                            .field("batch", Node::int(50))
                            .field("dryRun", Node::boolean(false))
                            .field("region", Node::text("eu"))
                            .field("ratio", Node::float_type()),
                    ),
            ),
        );

        let schedules = extract_schedules(&tree);
        let s = &schedules[0];

        assert_eq!(s.service, "BillingJobs");
        let typed: Vec<_> = s.payload.iter().map(|p| (p.ty.as_str(), p.value.as_str())).collect();
        assert_eq!(typed, [("int", "50"), ("bool", "false"), ("string", "eu")]);
    }

    #[test]
    fn policy_form_rbac_expands_wildcards() {
        let tree = Node::structure()
            .field(
                "Actions",
                Node::structure()
                    .field(
                        "orders",
                        Node::structure().field("read", Node::any()).field("write", Node::any()),
                    )
                    .field("users", Node::structure().field("read", Node::any())),
            )
            .field(
                "Policies",
                Node::structure()
                    .field("admin", Node::structure().field("allow", Node::texts(["*"])))
                    .field(
                        "clerk",
                        Node::structure().field("allow", Node::texts(["orders.*", "reports.view"])),
                    ),
            );

        let rbac = extract_rbac(&tree).expect("policy form");

        assert_eq!(rbac.roles["admin"], ["orders.read", "orders.write", "users.read"]);
        assert_eq!(rbac.roles["clerk"], ["orders.read", "orders.write", "reports.view"]);
        assert!(rbac.permissions.contains_key("reports.view"));
        assert!(extract_rbac(&Node::structure()).is_none());
    }

    #[test]
    fn explicit_rbac_block() {
        let tree = Node::structure().field(
            "#RBAC",
            Node::structure()
                .field("roles", Node::structure().field("admin", Node::texts(["users.delete"])))
                .field(
                    "permissions",
                    Node::structure().field("users.delete", Node::text(" Delete users ")),
                ),
        );

        let rbac = extract_rbac(&tree).expect("rbac");

        assert_eq!(rbac.roles["admin"], ["users.delete"]);
        assert_eq!(rbac.permissions["users.delete"], "Delete users");
    }

    #[test]
    fn views_skip_hidden_fields() {
        let tree = Node::structure().field(
            "UserView",
            Node::structure()
                .field(
                    "admin",
                    Node::structure().field("email", Node::any()).field("_internal", Node::any()),
                )
                .field("guest", Node::texts(["name"])),
        );

        let views = extract_views(&tree);

        assert_eq!(views[0].roles["admin"], ["email"]);
        assert_eq!(views[0].roles["guest"], ["name"]);
    }

    #[test]
    fn scenario_steps_default_to_200() {
        let step = Node::structure()
            .field("name", Node::text("login"))
            .field("action", Node::text("Login"))
            .field("input", Node::structure().field("email", Node::text("a@b.c")))
            .field("export", Node::structure().field("token", Node::text("body.accessToken")));
        let tree = Node::structure()
            .field(
                "ScenarioLogin",
                Node::structure().field("steps", Node::list([step])),
            )
            .field("Other", Node::structure());

        let scenarios = extract_scenarios(&tree, None);

        assert_eq!(scenarios.len(), 1);
        let s = &scenarios[0].steps[0];
        assert_eq!(s.expect.status, 200);
        assert_eq!(s.input.get("email"), Some(&Value::text("a@b.c")));
        assert_eq!(s.export["token"], "body.accessToken");
    }

    #[test]
    fn auth_defaults_and_wiring() {
        let tree = Node::structure().field(
            "#Auth",
            Node::structure()
                .field("service", Node::text("auth_core"))
                .field(
                    "jwt",
                    Node::structure()
                        .field(
                            "tokens",
                            Node::structure()
                                .field("store", Node::text("hybrid"))
                                .field("rotation", Node::boolean(true)),
                        )
                        .field(
                            "claims",
                            Node::structure()
                                .field("userId", Node::structure().field("field", Node::text("uid"))),
                        )
                        .field(
                            "ops",
                            Node::structure().field("login", Node::structure().field("op", Node::text("Login"))),
                        ),
                ),
        );

        let auth = extract_auth(&tree).expect("valid").expect("declared");

        assert_eq!(auth.algorithm, "RS256");
        assert_eq!((auth.claims.user_id.as_str(), auth.claims.company_id.as_str()), ("uid", "cid"));
        assert!(auth.rotation);
        assert_eq!(auth.refresh_store, "hybrid");
        assert_eq!(auth.operations.service, "AuthCore");
        assert_eq!(auth.operations.login_op, "Login");
    }

    #[test]
    fn notification_blocks() {
        let tree = Node::structure()
            .field(
                "#NotificationChannels",
                Node::structure()
                    .field("default_channels", Node::texts(["email"]))
                    .field(
                        "channels",
                        Node::structure()
                            .field("email", Node::structure().field("driver", Node::text("smtp"))),
                    ),
            )
            .field(
                "#NotificationPolicies",
                Node::structure().field(
                    "rules",
                    Node::list([Node::structure()
                        .field("event", Node::text("OrderPlaced"))
                        .field("channels", Node::texts(["email"]))]),
                ),
            )
            .field("#NotificationMuting", Node::structure().field("enabled", Node::boolean(true)));

        let channels = extract_notification_channels(&tree).expect("valid").expect("declared");
        assert!(channels.enabled && channels.channels["email"].enabled);
        assert_eq!(channels.channels["email"].driver, "smtp");

        let policies = extract_notification_policies(&tree).expect("valid").expect("declared");
        assert_eq!(policies.rules[0].event, "OrderPlaced");

        assert!(extract_notification_muting(&tree).expect("valid").is_some_and(|m| m.enabled));

        let bad = Node::structure().field(
            "#NotificationPolicies",
            Node::structure().field("rules", Node::text("x")),
        );
        assert!(extract_notification_policies(&bad).is_err());
    }
}
