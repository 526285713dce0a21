//! Lints over inline implementation code and the flow-first rule.
//!
//! Inline code runs inside a function with named returns `(resp, err)`;
//! redeclaring either silently shadows the return value.

use archon_diag::{DiagnosticKind, Severity, Warning};
use archon_ir::flow::Location;
use regex::Regex;
use std::sync::LazyLock;

static VAR_RESP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^var\s+resp\b").expect("valid regex"));

static VAR_ERR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^var\s+err\s+error\b").expect("valid regex"));

static SHORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\b(?:if|for|switch)\s+)([A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)\s*:=")
        .expect("valid regex")
});

static LEGACY_LOGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bl\.[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"));

/// Method names that must be expressed as flows.
const FLOW_FIRST_PREFIXES: &[&str] = &["create", "get", "list", "update", "patch", "delete", "remove"];

///
/// ImplSite
///
/// Where the inline code lives and whose method it implements.
///

#[derive(Clone, Copy, Debug)]
pub struct ImplSite<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub code: &'a str,

    /// Location of the code value; its line is the first code line.
    pub location: &'a Location,
    pub has_output: bool,
}

impl ImplSite<'_> {
    fn warning(&self, code: &str, message: &str, hint: &str, offset: usize, column: u32) -> Warning {
        let line = u32::try_from(offset).map_or(self.location.line, |o| self.location.line + o);
        let column = if column == 0 { self.location.column } else { column };

        Warning::new(
            DiagnosticKind::Impl,
            code,
            format!("{}.{}: {message}", self.service, self.method),
        )
        .severity(Severity::Error)
        .op(self.method)
        .hint(hint)
        .at(self.location)
        .line(line)
        .column(column)
    }
}

/// Named-return shadowing by `var` or `:=`.
#[must_use]
pub fn named_return_lints(site: &ImplSite<'_>) -> Vec<Warning> {
    let mut out = Vec::new();

    for (i, raw) in site.code.lines().enumerate() {
        let indent = raw.len() - raw.trim_start().len();
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let col = |idx: usize| u32::try_from(indent + idx + 1).unwrap_or(0);

        if site.has_output && VAR_RESP.is_match(line) {
            out.push(site.warning(
                "IMPL_NAMED_RETURN_RESP_VAR",
                "do not redeclare 'resp' in impls.go.code when method uses named return",
                "Use assignment 'resp = ...' instead of 'var resp ...'",
                i,
                col(4),
            ));
        }
        if VAR_ERR.is_match(line) {
            out.push(site.warning(
                "IMPL_NAMED_RETURN_ERR_VAR",
                "do not redeclare 'err' as local variable in impls.go.code when method uses named return",
                "Use assignment 'err = ...' instead of 'var err error'",
                i,
                col(4),
            ));
        }

        for caps in SHORT_DECL.captures_iter(line) {
            let Some(lhs) = caps.get(1) else {
                continue;
            };
            let names: Vec<&str> = lhs.as_str().split(',').map(str::trim).collect();
            // `x, err := f()` declares x; only all-shadow declarations are flagged
            if names.iter().any(|n| !matches!(*n, "err" | "resp" | "_")) {
                continue;
            }
            let at = |name: &str| lhs.start() + lhs.as_str().find(name).unwrap_or(0);

            if names.contains(&"err") {
                out.push(site.warning(
                    "IMPL_NAMED_RETURN_ERR_SHORT_DECL",
                    "do not use 'err :=' in impls.go.code when method uses named return",
                    "Use assignment 'err = ...' instead of short declaration",
                    i,
                    col(at("err")),
                ));
            }
            if names.contains(&"resp") && site.has_output {
                out.push(site.warning(
                    "IMPL_NAMED_RETURN_RESP_SHORT_DECL",
                    "do not use 'resp :=' in impls.go.code when method uses named return",
                    "Use assignment 'resp = ...' instead of short declaration",
                    i,
                    col(at("resp")),
                ));
            }
        }
    }

    out
}

/// Hardcoded URLs and the legacy `l.` logger alias. Columns are offsets
/// into the trimmed line from the code's base column.
#[must_use]
pub fn anti_pattern_lints(site: &ImplSite<'_>) -> Vec<Warning> {
    let mut out = Vec::new();
    let base = site.location.column;
    let col = |idx: usize| u32::try_from(idx).map_or(base, |i| base + i);

    for (i, raw) in site.code.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(idx) = line.find("http://").or_else(|| line.find("https://")) {
            out.push(site.warning(
                "IMPL_HARDCODED_URL_LITERAL",
                "do not hardcode external URLs in impls.go.code",
                "Move URL to cue/infra config or template variables and inject via service logic.",
                i,
                col(idx),
            ));
        }
        if let Some(m) = LEGACY_LOGGER.find(line) {
            out.push(site.warning(
                "IMPL_LEGACY_LOGGER_ALIAS",
                "legacy logger alias 'l.' is not allowed in impls.go.code",
                "Use slog.* directly (or injected logger variable) instead of legacy alias 'l'.",
                i,
                col(m.start()),
            ));
        }
    }

    out
}

#[must_use]
pub fn is_flow_first_candidate(method: &str) -> bool {
    let name = method.trim().to_lowercase();
    FLOW_FIRST_PREFIXES.iter().any(|p| name.starts_with(p))
}

///
/// Bypass
///
/// `flowFirstBypass` settings of an implementation block.
///

#[derive(Clone, Copy, Debug)]
pub struct Bypass<'a> {
    pub enabled: bool,
    pub reason: &'a str,
    pub reason_location: &'a Location,
}

/// CRUD-like methods with inline code and no flow.
#[must_use]
pub fn flow_first_lint(site: &ImplSite<'_>, has_flow: bool, bypass: &Bypass<'_>) -> Option<Warning> {
    if site.code.trim().is_empty() || has_flow || !is_flow_first_candidate(site.method) {
        return None;
    }

    if bypass.enabled {
        if !bypass.reason.trim().is_empty() {
            return None;
        }

        let mut location = bypass.reason_location.clone();
        if location.path.trim().is_empty() {
            location.path = "impls.go.flowFirstBypassReason".to_string();
        }

        return Some(
            Warning::flow(
                "FLOW_FIRST_BYPASS_REASON_REQUIRED",
                format!(
                    "{}.{}: flowFirstBypass=true requires non-empty flowFirstBypassReason",
                    site.service, site.method
                ),
            )
            .op(site.method)
            .hint("Set impls.go.flowFirstBypassReason with concrete rationale (e.g. external SDK orchestration, complex branching not expressible in flow yet).")
            .at(&location),
        );
    }

    Some(
        Warning::flow(
            "FLOW_FIRST_IMPL_REQUIRED",
            format!(
                "{}.{}: CRUD/listing methods must use flow DSL instead of impls.go.code",
                site.service, site.method
            ),
        )
        .op(site.method)
        .hint("Move method logic into 'flow'. For exceptional complex cases set impls.go.flowFirstBypass: true with clear rationale.")
        .at(site.location),
    )
}
