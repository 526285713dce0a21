use crate::{error::TransformError, transformer::Transformer};
use archon_ir::{model::Schema, value::HasMetadata};

///
/// ValidationTransformer
///
/// Lifts the `@validate` rule into the `validate_tag` metadata key.
///

pub struct ValidationTransformer;

impl Transformer for ValidationTransformer {
    fn name(&self) -> &str {
        "validation"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for field in schema.entities.iter_mut().flat_map(|e| &mut e.fields) {
            let Some(attr) = field.attribute("validate") else {
                continue;
            };
            let rule = attr.arg_text("rule").or_else(|| attr.arg_text("_")).unwrap_or_default();
            let tag = if field.optional && !rule.is_empty() && !rule.contains("omitempty") {
                format!("{rule},omitempty")
            } else {
                rule.to_string()
            };

            field.set_meta("validate_tag", tag);
        }

        Ok(())
    }
}
