//! Enrichment passes over the IR: bulk transformers that run in a fixed
//! order, and attribute hooks dispatched during a single schema walk.
//!
//! Every pass mutates the schema in place and must be idempotent, so that
//! running the pipeline twice yields the same schema as running it once.

pub mod config;
pub mod error;
pub mod hook;
pub mod transformer;

pub use config::TransformersConfig;
pub use error::{HookError, TransformError};
pub use hook::{Hook, HookRegistry, HookScope};
pub use transformer::{Transformer, TransformerRegistry};

pub use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::TransformersConfig,
        hook::{Hook, HookRegistry, HookScope},
        transformer::{Transformer, TransformerRegistry},
    };
}
