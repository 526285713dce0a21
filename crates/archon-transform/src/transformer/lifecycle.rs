use crate::{error::TransformError, transformer::Transformer};
use archon_ir::{
    model::{Entity, Field, Schema, TypeKind, TypeRef},
    value::{HasMetadata, Value},
};

// An entity opts in through metadata or an attribute of the same name, and
// opts out with an explicit `false`. Unmarked entities are never touched.
fn selected(entity: &Entity, marker: &str) -> bool {
    match entity.meta(marker) {
        Some(Value::Bool(false)) => false,
        Some(_) => true,
        None => entity.attribute(marker).is_some(),
    }
}

fn time_field(name: &str, optional: bool, generated_by: &str) -> Field {
    let mut field = Field {
        optional,
        ..Field::new(name, TypeRef::scalar(TypeKind::Time))
    };
    field.set_meta("generated_by", generated_by);

    field
}

///
/// TimestampsTransformer
///
/// `created_at` / `updated_at` for entities marked `timestamps`.
///

pub struct TimestampsTransformer;

impl Transformer for TimestampsTransformer {
    fn name(&self) -> &str {
        "timestamps"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for entity in &mut schema.entities {
            if !selected(entity, "timestamps") {
                continue;
            }
            for (name, auto_set) in [("created_at", "on_create"), ("updated_at", "on_update")] {
                if entity.has_field(name) {
                    continue;
                }
                let mut field = time_field(name, false, "timestamp_transformer");
                field.set_meta("auto_set", auto_set);
                entity.fields.push(field);
            }
        }

        Ok(())
    }
}

///
/// SoftDeleteTransformer
///

pub struct SoftDeleteTransformer;

impl Transformer for SoftDeleteTransformer {
    fn name(&self) -> &str {
        "soft_delete"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for entity in &mut schema.entities {
            if selected(entity, "soft_delete") && !entity.has_field("deleted_at") {
                entity
                    .fields
                    .push(time_field("deleted_at", true, "soft_delete_transformer"));
            }
        }

        Ok(())
    }
}
