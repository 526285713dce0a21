//! Bulk transformers. Each one walks the whole schema; the registry runs
//! them in registration order.

mod caching;
mod image;
mod lifecycle;
mod policy;
mod telemetry;
mod validation;

#[cfg(test)]
mod tests;

pub use caching::CachingTransformer;
pub use image::ImageTransformer;
pub use lifecycle::{SoftDeleteTransformer, TimestampsTransformer};
pub use policy::PolicyTransformer;
pub use telemetry::TracingTransformer;
pub use validation::ValidationTransformer;

use crate::{config::TransformersConfig, error::TransformError};
use archon_ir::model::Schema;

///
/// Transformer
///

pub trait Transformer {
    fn name(&self) -> &str;

    /// Rewrite `schema` in place. Applying twice must equal applying once.
    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError>;
}

///
/// TransformerRegistry
///

#[derive(Default)]
pub struct TransformerRegistry {
    transformers: Vec<Box<dyn Transformer>>,
}

impl TransformerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in set in its fixed order: image, validation, timestamps,
    /// soft_delete, tracing, caching, policy.
    #[must_use]
    pub fn builtin(config: &TransformersConfig) -> Self {
        let mut reg = Self::new();

        if config.image {
            reg.register(ImageTransformer::new(config.thumb_suffix()));
        }
        if config.validation {
            reg.register(ValidationTransformer);
        }
        if config.timestamps {
            reg.register(TimestampsTransformer);
        }
        if config.soft_delete {
            reg.register(SoftDeleteTransformer);
        }
        if config.tracing {
            reg.register(TracingTransformer);
        }
        if config.caching {
            reg.register(CachingTransformer);
        }
        if config.policy {
            reg.register(PolicyTransformer);
        }

        reg
    }

    pub fn register(&mut self, transformer: impl Transformer + 'static) {
        self.transformers.push(Box::new(transformer));
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Apply every transformer in order, stopping at the first failure.
    pub fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for t in &self.transformers {
            tracing::debug!(transformer = t.name(), "applying transformer");
            t.apply(schema)?;
        }
        tracing::info!(count = self.transformers.len(), "transformers applied");

        Ok(())
    }
}
