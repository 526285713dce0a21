use archon_ir::{error::ErrorTree, model::Field};
use regex::Regex;
use std::sync::LazyLock;

static COMPONENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));
static IMPORT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@?[A-Za-z0-9._-]+)(/[A-Za-z0-9._@-]+)*$").expect("valid regex"));

const UI_TYPES: &[&str] = &[
    "autocomplete", "checkbox", "currency", "custom", "date", "datetime", "email", "file", "image",
    "number", "password", "phone", "select", "switch", "text", "textarea", "time", "url",
];

// (hint, code, allowed values)
const ENUM_HINTS: &[(&str, &str, &[&str])] = &[
    ("importance", "E_UI_IMPORTANCE_INVALID", &["high", "normal", "low"]),
    (
        "inputKind",
        "E_UI_INPUT_KIND_INVALID",
        &["sensitive", "email", "phone", "money", "search", "none"],
    ),
    (
        "intent",
        "E_UI_INTENT_INVALID",
        &["danger", "warning", "success", "info", "neutral"],
    ),
    ("density", "E_UI_DENSITY_INVALID", &["compact", "normal", "spacious"]),
    ("labelMode", "E_UI_LABEL_MODE_INVALID", &["static", "floating", "hidden"]),
    ("surface", "E_UI_SURFACE_INVALID", &["paper", "flat", "raised"]),
];

/// Presentation hints must be consistent with each other and the field.
pub(super) fn check_field_ui(errs: &mut ErrorTree, route: &str, field: &Field) {
    let Some(ui) = &field.ui else {
        return;
    };

    let ui_type = ui.kind.trim().to_ascii_lowercase();
    let component = ui.component.trim();
    let source = ui.source.trim();

    if !ui_type.is_empty() && !UI_TYPES.contains(&ui_type.as_str()) {
        errs.add_at(route, format!("[E_UI_UNKNOWN_TYPE] uses unknown ui.type {:?}", ui.kind));
    }
    if ui_type == "custom" && component.is_empty() {
        errs.add_at(
            route,
            "[E_UI_CUSTOM_COMPONENT_REQUIRED] uses ui.type=custom but ui.component is empty",
        );
    }
    if !component.is_empty() && !COMPONENT_NAME.is_match(component) {
        errs.add_at(route, format!("[E_UI_INVALID_COMPONENT] has invalid ui.component {component:?}"));
    }
    if ui_type == "custom" && !source.is_empty() && !IMPORT_PATH.is_match(source) {
        errs.add_at(route, format!("[E_UI_INVALID_SOURCE] has invalid ui.source {source:?}"));
    }
    if ui_type == "select" && ui.options.is_empty() && source.is_empty() {
        errs.add_at(
            route,
            "[E_UI_SELECT_SOURCE_OR_OPTIONS_REQUIRED] uses ui.type=select but neither ui.options nor ui.source is set",
        );
    }
    if ui.hidden && field.is_required() {
        errs.add_at(route, "[E_UI_HIDDEN_REQUIRED_CONFLICT] is hidden but required");
    }
    if ui.columns < 0 {
        errs.add_at(route, format!("[E_UI_COLUMNS_INVALID] has negative ui.columns={}", ui.columns));
    }

    let hints = [
        &ui.importance,
        &ui.input_kind,
        &ui.intent,
        &ui.density,
        &ui.label_mode,
        &ui.surface,
    ];
    for ((name, code, allowed), raw) in ENUM_HINTS.iter().zip(hints) {
        let value = raw.trim().to_ascii_lowercase();
        if !value.is_empty() && !allowed.contains(&value.as_str()) {
            errs.add_at(route, format!("[{code}] has unsupported ui.{name} {raw:?}"));
        }
    }
}
