use crate::{error::TransformError, transformer::Transformer};
use archon_ir::{
    model::{Field, Schema, TypeKind, TypeRef},
    value::HasMetadata,
};

pub const GENERATED_BY: &str = "image_transformer";

///
/// ImageTransformer
///
/// Every `@image` field gets an optional string sibling holding its
/// thumbnail location, inserted right after it. `@image(thumb_suffix=..)`
/// overrides the configured suffix.
///

pub struct ImageTransformer {
    thumb_suffix: String,
}

impl ImageTransformer {
    #[must_use]
    pub fn new(thumb_suffix: impl Into<String>) -> Self {
        Self {
            thumb_suffix: thumb_suffix.into(),
        }
    }
}

impl Transformer for ImageTransformer {
    fn name(&self) -> &str {
        "image"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for entity in &mut schema.entities {
            let mut i = 0;
            while i < entity.fields.len() {
                let Some(attr) = entity.fields[i].attribute("image") else {
                    i += 1;
                    continue;
                };
                let suffix = attr
                    .arg_text("thumb_suffix")
                    .filter(|s| !s.is_empty())
                    .unwrap_or(self.thumb_suffix.as_str());
                let source = entity.fields[i].name.clone();
                let thumb = format!("{source}{suffix}");
                let exists = entity.has_field(&thumb);

                let field = &mut entity.fields[i];
                field.set_meta("has_thumbnail", true);
                field.set_meta("thumbnail_field", thumb.clone());

                if !exists {
                    let mut generated = Field {
                        optional: true,
                        ..Field::new(thumb, TypeRef::scalar(TypeKind::String))
                    };
                    generated.set_meta("generated_by", GENERATED_BY);
                    generated.set_meta("source_field", source);
                    entity.fields.insert(i + 1, generated);
                    i += 1;
                }
                i += 1;
            }
        }

        Ok(())
    }
}
