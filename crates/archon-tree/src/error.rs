use crate::value::ValueKind;
use thiserror::Error as ThisError;

///
/// TreeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TreeError {
    #[error("invalid attribute {source_text:?}: {reason}")]
    Attribute { source_text: String, reason: String },

    #[error("{path}: expected {expected}, found {found}")]
    Kind {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("{path}: required value is missing")]
    Missing { path: String },

    #[error("{path}: unsupported json value")]
    Unsupported { path: String },
}
