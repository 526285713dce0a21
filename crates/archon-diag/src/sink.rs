//! Diagnostic sink boundary.
//!
//! Stages never print diagnostics themselves; every `Warning` flows through
//! a `DiagnosticSink` owned by the caller.

use crate::warning::{Severity, Warning};
use std::collections::HashSet;

///
/// DiagnosticSink
///

pub trait DiagnosticSink {
    fn report(&mut self, warning: Warning);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, warning: Warning) {
        (**self).report(warning);
    }
}

impl DiagnosticSink for Vec<Warning> {
    fn report(&mut self, warning: Warning) {
        self.push(warning);
    }
}

///
/// CollectSink
///
/// Keeps diagnostics in discovery order.
///

#[derive(Clone, Debug, Default)]
pub struct CollectSink {
    warnings: Vec<Warning>,
}

impl CollectSink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Warning> {
        self.warnings
    }

    /// Codes in discovery order.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.warnings.iter().map(|w| w.code.as_str()).collect()
    }

    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(Warning::is_error)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl DiagnosticSink for CollectSink {
    fn report(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

///
/// TracingSink
///
/// Forwards each diagnostic to `tracing` at the level of its severity.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, w: Warning) {
        match w.severity {
            Severity::Error => tracing::error!(
                code = %w.code, kind = %w.kind, op = %w.op, step = w.step,
                file = %w.file, line = w.line, hint = %w.hint,
                "{}", w.message
            ),
            Severity::Warn => tracing::warn!(
                code = %w.code, kind = %w.kind, op = %w.op, step = w.step,
                file = %w.file, line = w.line, hint = %w.hint,
                "{}", w.message
            ),
            Severity::Info => tracing::info!(
                code = %w.code, kind = %w.kind, op = %w.op, step = w.step,
                file = %w.file, line = w.line,
                "{}", w.message
            ),
        }
    }
}

///
/// DedupKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DedupKey {
    pub code: String,
    pub action: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub step: usize,
}

impl From<&Warning> for DedupKey {
    fn from(w: &Warning) -> Self {
        Self {
            code: w.code.clone(),
            action: w.action.clone(),
            file: w.file.clone(),
            line: w.line,
            column: w.column,
            step: w.step,
        }
    }
}

///
/// Dedup
///
/// Drops a diagnostic whose `DedupKey` was already forwarded.
///

#[derive(Debug)]
pub struct Dedup<S> {
    inner: S,
    seen: HashSet<DedupKey>,
}

impl<S: DiagnosticSink> Dedup<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for Dedup<S> {
    fn report(&mut self, warning: Warning) {
        if self.seen.insert(DedupKey::from(&warning)) {
            self.inner.report(warning);
        }
    }
}
