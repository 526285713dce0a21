//! ## Crate layout
//! - `tree`: the evaluated configuration tree the compiler reads.
//! - `diag`: diagnostics and the sinks that collect or log them.
//! - `flow`: the flow DSL parser, auto-completion and validator.
//! - `normalizer`: tree extraction into definitions and IR assembly.
//! - `ir`: the versioned schema, migrations, ABI gate and canonical JSON.
//! - `transform`: transformers and attribute hooks over the IR.
//! - `validate`: the semantic validator and endpoint policies.
//!
//! [`Pipeline`] runs them in order; [`CompilerConfig`] carries the knobs.

pub use archon_diag as diag;
pub use archon_flow as flow;
pub use archon_ir as ir;
pub use archon_normalizer as normalizer;
pub use archon_transform as transform;
pub use archon_tree as tree;
pub use archon_validate as validate;

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{CompilerConfig, ConfigError};
pub use error::{Error, Stage};
pub use logging::init_tracing;
pub use pipeline::{CompileOutput, Pipeline};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::CompilerConfig,
        diag::{DiagnosticSink as _, Severity, Warning},
        ir::{
            CURRENT_IR_VERSION,
            model::{Entity, Field, Schema, Service, TypeKind, TypeRef},
            value::{HasMetadata as _, Value},
        },
        normalizer::Sources,
        pipeline::{CompileOutput, Pipeline},
        transform::{Hook, Transformer},
        tree::Node,
    };
}
