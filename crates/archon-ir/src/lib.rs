//! Intermediate representation for archon: the versioned `Schema` tree, its
//! JSON-compatible metadata values, the migration chain, the ABI gate and the
//! canonical JSON encoding used between compiler stages.

pub mod abi;
pub mod canonical;
pub mod error;
pub mod flow;
pub mod graph;
pub mod model;
pub mod value;
pub mod version;

pub use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// IR version stamped by the assembler and required by the ABI validator.
pub const CURRENT_IR_VERSION: &str = "2";

///
/// Prelude
///
/// Domain vocabulary only; errors and stage entry points stay in their modules.
///

pub mod prelude {
    pub use crate::{
        err,
        error::ErrorTree,
        flow::{ArgValue, ChildKey, FlowStep, Location},
        graph::{DependencyGraph, EdgeKind, GraphEdge, GraphNode, NodeKind},
        model::*,
        value::{HasMetadata, Metadata, Opaque, Value},
    };
}
