//! Read-only configuration tree consumed by the normalizer.
//!
//! The front-end parser is external; anything that can answer the
//! [`ConfigValue`] questions (fields, typed leaves, attributes, positions)
//! can drive normalization. [`Node`] is the in-memory implementation.

pub mod attribute;
pub mod error;
pub mod expr;
pub mod node;
pub mod position;
pub mod value;

pub use attribute::{AttrArg, Attribute};
pub use error::TreeError;
pub use expr::{BoundOp, Expr};
pub use node::Node;
pub use position::Position;
pub use value::{ConfigValue, Scalar, TreeField, ValueKind};

pub use thiserror::Error as ThisError;
