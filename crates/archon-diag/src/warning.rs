use archon_ir::flow::Location;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Severity
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    #[display("error")]
    Error,
    #[display("warn")]
    Warn,
    #[display("info")]
    Info,
}

///
/// DiagnosticKind
///
/// Coarse family of a diagnostic, used by tooling to group output.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
#[remain::sorted]
pub enum DiagnosticKind {
    #[display("architecture")]
    Architecture,
    #[display("contract")]
    Contract,
    #[display("flow")]
    Flow,
    #[default]
    #[display("impl")]
    Impl,
}

///
/// FixKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    #[display("replace")]
    Replace,
    #[display("insert")]
    Insert,
    #[display("delete")]
    Delete,
    #[display("create")]
    Create,
}

///
/// Fix
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Fix {
    pub kind: FixKind,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    pub text: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

impl Fix {
    #[must_use]
    pub fn replace(text: impl Into<String>) -> Self {
        Self {
            kind: FixKind::Replace,
            file: String::new(),
            path: String::new(),
            text: text.into(),
            rationale: String::new(),
        }
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    #[must_use]
    pub fn at(mut self, location: &Location) -> Self {
        self.file.clone_from(&location.file);
        self.path.clone_from(&location.path);
        self
    }
}

///
/// Warning
///
/// A location-qualified diagnostic with a stable code. Built with the
/// chained setters below and immutable once reported.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Warning {
    pub kind: DiagnosticKind,
    pub code: String,
    pub severity: Severity,
    pub message: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub op: String,

    /// 1-based step index within the enclosing flow; 0 when not a step.
    #[serde(skip_serializing_if = "is_zero")]
    pub step: usize,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub line: u32,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub column: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub hint: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub docs_url: String,

    pub can_auto_apply: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested_fix: Vec<Fix>,
}

const fn is_zero(n: &usize) -> bool {
    *n == 0
}

const fn is_zero_u32(n: &u32) -> bool {
    *n == 0
}

impl Warning {
    #[must_use]
    pub fn new(kind: DiagnosticKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn flow(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Flow, code, message)
    }

    #[must_use]
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn op(mut self, op: impl Into<String>) -> Self {
        self.op = op.into();
        self
    }

    #[must_use]
    pub const fn step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    #[must_use]
    pub fn docs_url(mut self, url: impl Into<String>) -> Self {
        self.docs_url = url.into();
        self
    }

    /// Copy file, line, column and tree path from `location`.
    #[must_use]
    pub fn at(mut self, location: &Location) -> Self {
        self.file.clone_from(&location.file);
        self.line = location.line;
        self.column = location.column;
        self.path.clone_from(&location.path);
        self
    }

    #[must_use]
    pub const fn line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    #[must_use]
    pub const fn column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    /// Attach a deterministic fix that tooling may apply without review.
    #[must_use]
    pub fn auto_fix(mut self, fix: Fix) -> Self {
        self.can_auto_apply = true;
        self.suggested_fix.push(fix);
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
