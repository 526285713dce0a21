//! Small text and tree utilities shared by the extractors.

use archon_ir::{flow::Location, value::Value};
use archon_tree::{ConfigValue, ValueKind};
use std::path::Path;

/// Canonical service name: `_`, `-` and spaces split words, each word
/// gets an upper-case first letter. `"auth_service"` becomes `"AuthService"`.
#[must_use]
pub fn normalize_service_name(s: &str) -> String {
    s.trim()
        .split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(export_name)
        .collect()
}

/// Upper-case the first character.
#[must_use]
pub fn export_name(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[must_use]
pub fn is_exported_name(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase)
}

/// Strip the optional/required label markers.
#[must_use]
pub fn clean_name(s: &str) -> &str {
    s.trim_end_matches('?').trim_end_matches('!').trim()
}

/// Size strings such as `512kb` or `1mb` in bytes. Unparsable numbers
/// count as zero.
#[must_use]
pub fn parse_size(s: &str) -> i64 {
    let s = s.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = s.strip_suffix("kb") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('b') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    digits.trim().parse::<i64>().unwrap_or(0) * multiplier
}

/// `file:line` of a value, root-relative when possible; empty without a
/// position.
#[must_use]
pub fn source_of(value: &dyn ConfigValue, root: Option<&Path>) -> String {
    value.position().map_or_else(String::new, |pos| {
        let pos = root.map_or_else(|| pos.clone(), |r| pos.relative_to(r));
        format!("{}:{}", pos.file, pos.line)
    })
}

/// Full location of a value for diagnostics.
#[must_use]
pub fn location_of(value: &dyn ConfigValue, root: Option<&Path>, path: &str) -> Location {
    let location = value.position().map_or_else(Location::default, |pos| {
        let pos = root.map_or_else(|| pos.clone(), |r| pos.relative_to(r));
        Location::new(pos.file, pos.line, pos.column)
    });

    location.with_path(path)
}

/// Trimmed, non-empty strings of a list or single string at `path`.
#[must_use]
pub fn trimmed_strings(value: &dyn ConfigValue, path: &str) -> Vec<String> {
    value
        .strings_at(path)
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Trimmed, non-empty strings of `value` itself: a string or a list of them.
#[must_use]
pub fn strings_of(value: &dyn ConfigValue) -> Vec<String> {
    let raw: Vec<&str> = match value.as_str() {
        Some(s) => vec![s],
        None => value.elements().into_iter().filter_map(ConfigValue::as_str).collect(),
    };

    raw.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// [`trimmed_strings`] with duplicates removed, first occurrence kept.
#[must_use]
pub fn unique_strings(value: &dyn ConfigValue, path: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in trimmed_strings(value, path) {
        if !out.contains(&s) {
            out.push(s);
        }
    }

    out
}

/// Struct members with a string value, as `(label, trimmed value)`.
#[must_use]
pub fn string_members(value: Option<&dyn ConfigValue>) -> Vec<(String, String)> {
    let Some(value) = value else {
        return Vec::new();
    };

    value
        .fields()
        .into_iter()
        .filter_map(|f| {
            let s = f.value.as_str()?;
            Some((f.label.trim().to_string(), s.trim().to_string()))
        })
        .collect()
}

pub fn is_struct(value: &dyn ConfigValue) -> bool {
    value.kind() == ValueKind::Struct
}

/// JSON-shaped copy of a concrete subtree. Non-concrete leaves become null;
/// hidden and definition labels are skipped.
#[must_use]
pub fn to_value(value: &dyn ConfigValue) -> Value {
    match value.kind() {
        ValueKind::Struct => Value::Map(
            value
                .fields()
                .into_iter()
                .filter(|f| !f.is_definition() && !f.is_hidden())
                .map(|f| (f.clean_label().to_string(), to_value(f.value)))
                .collect(),
        ),
        ValueKind::List => Value::List(value.elements().into_iter().map(to_value).collect()),
        _ => {
            if let Some(s) = value.as_str() {
                Value::text(s)
            } else if let Some(b) = value.as_bool() {
                Value::Bool(b)
            } else if let Some(n) = value.as_int() {
                Value::Int(n)
            } else if let Some(f) = value.as_float() {
                Value::Float(f)
            } else {
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archon_tree::Node;
    use proptest::prelude::*;

    #[test]
    fn service_names_are_camel_cased() {
        assert_eq!(normalize_service_name("auth_service"), "AuthService");
        assert_eq!(normalize_service_name(" order-items "), "OrderItems");
        assert_eq!(normalize_service_name("Billing"), "Billing");
        assert_eq!(normalize_service_name(""), "");
    }

    #[test]
    fn sizes_accept_unit_suffixes() {
        assert_eq!(parse_size("1mb"), 1_048_576);
        assert_eq!(parse_size("512KB"), 524_288);
        assert_eq!(parse_size("2gb"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("100b"), 100);
        assert_eq!(parse_size("42"), 42);
        assert_eq!(parse_size("lots"), 0, "unparsable sizes are zero");
    }

    #[test]
    fn labels_lose_markers() {
        assert_eq!(clean_name("email?"), "email");
        assert_eq!(clean_name("id!"), "id");
    }

    #[test]
    fn sources_are_file_and_line() {
        let v = Node::text("x").at("/app/cue/domain/order.cue", 12, 3);

        assert_eq!(source_of(&v, Some(Path::new("/app"))), "cue/domain/order.cue:12");
        assert_eq!(source_of(&Node::text("x"), None), "");
    }

    #[test]
    fn string_lists_are_trimmed_and_deduplicated() {
        let v = Node::structure().field("tags", Node::texts([" a", "b", "", "a "]));

        assert_eq!(trimmed_strings(&v, "tags"), ["a", "b", "a"]);
        assert_eq!(unique_strings(&v, "tags"), ["a", "b"]);
    }

    proptest! {
        #[test]
        fn size_units_scale_by_1024(n in 0i64..4096, upper in any::<bool>()) {
            let kb = if upper { format!("{n}KB") } else { format!("{n}kb") };

            prop_assert_eq!(parse_size(&kb), n * 1024);
            prop_assert_eq!(parse_size(&format!(" {n}mb ")), n * 1024 * 1024);
            prop_assert_eq!(parse_size(&n.to_string()), n);
        }
    }
}
