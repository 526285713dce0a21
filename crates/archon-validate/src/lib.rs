//! Post-transform gates for archon: the semantic validator that decides
//! whether a schema may reach emitters, and the endpoint policy layer.

pub mod duration;
pub mod policy;
pub mod semantic;

pub use policy::{EndpointPolicy, PolicyError, validate_endpoint_policy, validate_policies};
pub use semantic::{SemanticError, validate_semantics};

pub use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        policy::{EndpointPolicy, validate_policies},
        semantic::validate_semantics,
    };
}
