//! Normalizer: reads the configuration tree into definitions, reporting
//! diagnostics along the way, and assembles those definitions into the IR.
//!
//! Extraction is warning-producing. Only structurally malformed input
//! (an endpoint without an operation, a template with no content, a failed
//! infra extractor) is returned as a [`NormalizeError`].

pub mod assemble;
pub mod defs;
pub mod endpoint;
pub mod entity;
pub mod error;
pub mod helpers;
pub mod infra;
pub mod normalizer;
pub mod registry;
pub mod repository;
pub mod service;
pub mod template;
pub mod types;

pub use assemble::{assemble, convert_back};
pub use defs::*;
pub use error::{InfraExtractError, NormalizeError, RegistryError};
pub use normalizer::{Normalizer, Sources};
pub use registry::{InfraContextPatch, InfraDef, InfraLanguage, InfraRegistry, InfraValue, ResolvedStep};

pub use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        assemble::assemble,
        defs::Definitions,
        normalizer::{Normalizer, Sources},
        registry::InfraRegistry,
    };
}
