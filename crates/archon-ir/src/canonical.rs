use crate::{
    ThisError,
    model::Schema,
    version::{MigrationError, migrate_to_current},
};
use sha2::{Digest, Sha256};

///
/// CanonicalError
///

#[derive(Debug, ThisError)]
pub enum CanonicalError {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("canonical json encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Migrate `schema` to the current version in place and encode it as
/// stable, indented JSON. Map keys are sorted; sequence order is kept.
pub fn to_canonical_json(schema: &mut Schema) -> Result<String, CanonicalError> {
    migrate_to_current(schema)?;

    Ok(serde_json::to_string_pretty(schema)?)
}

/// Decode canonical JSON and bring it to the current version.
pub fn from_canonical_json(json: &str) -> Result<Schema, CanonicalError> {
    let mut schema: Schema = serde_json::from_str(json)?;
    migrate_to_current(&mut schema)?;

    Ok(schema)
}

impl Schema {
    /// Hex SHA-256 of the canonical JSON of a migrated copy.
    pub fn fingerprint(&self) -> Result<String, CanonicalError> {
        let mut copy = self.clone();
        let json = to_canonical_json(&mut copy)?;

        Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, Field, TypeKind, TypeRef};

    fn schema() -> Schema {
        let mut entity = Entity::new("Order");
        entity
            .fields
            .push(Field::new("total", TypeRef::scalar(TypeKind::Float)));

        Schema {
            entities: vec![entity],
            ..Schema::default()
        }
    }

    #[test]
    fn canonical_json_round_trips() {
        let mut schema = schema();
        let json = to_canonical_json(&mut schema).expect("encode should succeed");
        let back = from_canonical_json(&json).expect("decode should succeed");

        assert_eq!(back, schema);
        assert!(json.contains("\"ir_version\": \"2\""), "unexpected json: {json}");
    }

    #[test]
    fn fingerprint_ignores_pending_migration() {
        let legacy = schema();
        let mut migrated = schema();
        to_canonical_json(&mut migrated).expect("encode should succeed");

        let a = legacy.fingerprint().expect("fingerprint");
        let b = migrated.fingerprint().expect("fingerprint");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
