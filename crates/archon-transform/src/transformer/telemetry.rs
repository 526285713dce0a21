use crate::{error::TransformError, transformer::Transformer};
use archon_ir::{model::Schema, value::HasMetadata};

///
/// TracingTransformer
///

pub struct TracingTransformer;

impl Transformer for TracingTransformer {
    fn name(&self) -> &str {
        "tracing"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for svc in &mut schema.services {
            svc.set_meta("tracing_enabled", true);
            for m in &mut svc.methods {
                m.set_meta("span_name", format!("{}.{}", svc.name, m.name));
            }
        }

        Ok(())
    }
}
