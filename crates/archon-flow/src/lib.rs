//! Flow DSL engine: parses declarative action lists out of the
//! configuration tree, auto-completes conventions, and validates each
//! method body against the action catalogue and the entity ownership rules.

pub mod autocomplete;
pub mod catalog;
pub mod error;
pub mod parse;
pub mod syntax;
pub mod validate;

pub use autocomplete::autocomplete;
pub use catalog::{ActionSpec, Violation, declared_variables, is_known_prefix, spec_for};
pub use error::FlowError;
pub use parse::{ParseContext, ir_attribute, parse_raw, parse_steps};
pub use syntax::{NoSyntaxCheck, SurfaceSyntax, SyntaxChecker};
pub use validate::{EntityCatalog, EntityInfo, FlowValidator, OwnershipPolicy};

pub use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        autocomplete::autocomplete,
        parse::{ParseContext, parse_steps},
        syntax::SyntaxChecker,
        validate::{EntityCatalog, FlowValidator, OwnershipPolicy},
    };
}
