use archon_ir::{
    err,
    error::ErrorTree,
    model::{Schema, Template},
};
use regex::Regex;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

static VAR_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex")
});

// A field chain such as `.User.Email`, not preceded by an identifier or `$`.
static FIELD_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(|,])\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("valid regex")
});

const ENGINES: &[&str] = &["go_template", "plain", "json"];

pub(super) fn check_catalogue(errs: &mut ErrorTree, schema: &Schema) {
    let mut seen = BTreeSet::new();

    for (i, t) in schema.templates.iter().enumerate() {
        let id = t.id.trim();
        if id.is_empty() {
            err!(errs, "template[{i}] has empty id");
            continue;
        }
        if !seen.insert(id) {
            err!(errs, "template {id:?} is duplicated");
        }

        let engine = t.effective_engine();
        let channel = t.channel.trim().to_ascii_lowercase();
        if !ENGINES.contains(&engine.as_str()) {
            err!(errs, "template {id:?} uses unsupported engine {:?}", t.engine);
        } else if !engine_fits_channel(&engine, &channel) {
            err!(errs, "template {id:?} uses engine {engine:?} incompatible with channel {channel:?}");
        }

        let has_body = t.has_content();
        if t.is_email() {
            if t.subject.trim().is_empty() {
                err!(errs, "email template {id:?} requires non-empty subject");
            }
            if !has_body {
                err!(errs, "email template {id:?} requires text/html/body content");
            }
        } else if !has_body {
            err!(errs, "template {id:?} requires at least one content field: text/html/body");
        }

        let required = non_blank(&t.required_vars);
        let optional = non_blank(&t.optional_vars);
        check_var_lists(errs, id, &required, &optional);

        if engine == Template::DEFAULT_ENGINE {
            let contents = [t.subject.as_str(), t.text.as_str(), t.html.as_str(), t.body.as_str()];
            match referenced_vars(&contents) {
                Ok(used) => {
                    let unused = required
                        .iter()
                        .filter(|v| VAR_PATH.is_match(v) && !is_referenced(v, &used));
                    for var in unused {
                        err!(
                            errs,
                            "template {id:?} requiredVars contains {var:?} but template content does not reference it"
                        );
                    }
                }
                Err(reason) => err!(errs, "template {id:?} parse error: {reason}"),
            }
        }
    }
}

fn engine_fits_channel(engine: &str, channel: &str) -> bool {
    if engine.is_empty() || channel.is_empty() {
        return true;
    }

    match channel {
        "email" | "in_app" => matches!(engine, "go_template" | "plain"),
        "nats" | "kafka" | "webhook" => matches!(engine, "go_template" | "plain" | "json"),
        _ => true,
    }
}

fn non_blank(vars: &[String]) -> Vec<&str> {
    vars.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect()
}

fn check_var_lists(errs: &mut ErrorTree, id: &str, required: &[&str], optional: &[&str]) {
    let mut seen_required = BTreeSet::new();
    for var in required {
        if !VAR_PATH.is_match(var) {
            err!(errs, "template {id:?} has invalid requiredVars name {var:?}");
            continue;
        }
        if !seen_required.insert(*var) {
            err!(errs, "template {id:?} has duplicate requiredVars {var:?}");
        }
    }

    let mut seen_optional = BTreeSet::new();
    for var in optional {
        if !VAR_PATH.is_match(var) {
            err!(errs, "template {id:?} has invalid optionalVars name {var:?}");
            continue;
        }
        if !seen_optional.insert(*var) {
            err!(errs, "template {id:?} has duplicate optionalVars {var:?}");
        }
        if seen_required.contains(var) {
            err!(errs, "template {id:?} declares var {var:?} in both requiredVars and optionalVars");
        }
    }
}

/// Field paths referenced from `{{ ... }}` actions across all contents.
fn referenced_vars(contents: &[&str]) -> Result<BTreeSet<String>, String> {
    let mut used = BTreeSet::new();

    for content in contents {
        let mut rest = *content;
        while let Some(open) = rest.find("{{") {
            let after = &rest[open + 2..];
            let close = after
                .find("}}")
                .ok_or_else(|| "unclosed action".to_string())?;
            let action = after[..close].trim_matches('-').trim();
            if !action.starts_with("/*") {
                for cap in FIELD_REF.captures_iter(action) {
                    used.insert(cap[1].to_string());
                }
            }
            rest = &after[close + 2..];
        }
    }

    Ok(used)
}

// A path counts as used when referenced exactly or through a child field.
fn is_referenced(var: &str, used: &BTreeSet<String>) -> bool {
    let prefix = format!("{var}.");
    used.iter().any(|u| u == var || u.starts_with(&prefix))
}

pub(super) fn check_notification_refs(errs: &mut ErrorTree, schema: &Schema) {
    let Some(notifications) = &schema.notifications else {
        return;
    };
    let by_id: BTreeMap<&str, &Template> = schema
        .templates
        .iter()
        .filter(|t| !t.id.trim().is_empty())
        .map(|t| (t.id.trim(), t))
        .collect();
    if by_id.is_empty() {
        return;
    }

    if let Some(channels) = &notifications.channels {
        for (name, spec) in &channels.channels {
            let tpl = spec.template.trim();
            if tpl.is_empty() {
                continue;
            }
            match by_id.get(tpl) {
                None => err!(errs, "notifications channel {name:?} references unknown template {tpl:?}"),
                Some(t) if !channels_match(&t.channel, name) => err!(
                    errs,
                    "notifications channel {name:?} uses template {tpl:?} with incompatible channel {:?}",
                    t.channel
                ),
                Some(_) => {}
            }
        }
    }

    if let Some(policies) = &notifications.policies {
        let defaults = notifications
            .channels
            .as_ref()
            .map(|c| non_blank(&c.default_channels))
            .unwrap_or_default();

        for (i, rule) in policies.rules.iter().enumerate() {
            let tpl = rule.template.trim();
            if tpl.is_empty() {
                continue;
            }
            let Some(t) = by_id.get(tpl) else {
                err!(errs, "notifications policy rule[{i}] references unknown template {tpl:?}");
                continue;
            };

            let mut targets = non_blank(&rule.channels);
            if targets.is_empty() {
                targets.clone_from(&defaults);
            }
            for ch in targets.into_iter().filter(|ch| !channels_match(&t.channel, ch)) {
                err!(
                    errs,
                    "notifications policy rule[{i}] channel {ch:?} uses template {tpl:?} with incompatible channel {:?}",
                    t.channel
                );
            }
        }
    }
}

fn channels_match(template_channel: &str, usage: &str) -> bool {
    let a = template_channel.trim();
    let b = usage.trim();

    a.is_empty() || b.is_empty() || a.eq_ignore_ascii_case(b)
}
