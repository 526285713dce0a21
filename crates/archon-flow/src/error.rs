use crate::ThisError;

///
/// FlowError
///
/// Structural failures while reading a flow out of the tree. Semantic
/// problems are diagnostics, not errors.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FlowError {
    #[error("{path}: flow must be a list of steps")]
    NotAList { path: String },
}
