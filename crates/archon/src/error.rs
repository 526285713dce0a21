use crate::config::ConfigError;
use archon_ir::{abi::AbiError, canonical::CanonicalError, version::MigrationError};
use archon_normalizer::NormalizeError;
use archon_transform::TransformError;
use archon_validate::{PolicyError, SemanticError};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Error
/// Public error type; each variant keeps the failing stage's own error.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl Error {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Normalize(_) => Stage::Normalize,
            Self::Migration(_) | Self::Canonical(_) => Stage::Migrate,
            Self::Abi(_) => Stage::Abi,
            Self::Transform(_) => Stage::Transform,
            Self::Semantic(_) => Stage::Semantic,
            Self::Policy(_) => Stage::Policy,
        }
    }
}

///
/// Stage
/// Pipeline stage an error came from.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Stage {
    #[display("abi")]
    Abi,
    #[display("config")]
    Config,
    #[display("migrate")]
    Migrate,
    #[display("normalize")]
    Normalize,
    #[display("policy")]
    Policy,
    #[display("semantic")]
    Semantic,
    #[display("transform")]
    Transform,
}
