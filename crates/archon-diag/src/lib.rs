//! Diagnostics shared by every compiler stage: the `Warning` record, its
//! suggested fixes, and the sink boundary the normalizer reports through.

pub mod sink;
pub mod warning;

pub use sink::{CollectSink, Dedup, DedupKey, DiagnosticSink, TracingSink};
pub use warning::{DiagnosticKind, Fix, FixKind, Severity, Warning};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        sink::DiagnosticSink,
        warning::{DiagnosticKind, Fix, FixKind, Severity, Warning},
    };
}
