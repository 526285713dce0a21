use crate::{
    CURRENT_IR_VERSION, ThisError,
    model::Schema,
    value::{Metadata, Value},
};

///
/// AbiError
///
/// First ABI violation found. Paths compose outward from the offending
/// leaf, so `entities[0].metadata.tags[2]` reads left to right.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AbiError {
    #[error("ir_version={found:?}, expected {expected:?}")]
    VersionMismatch { found: String, expected: String },

    #[error("{path} contains non-finite float")]
    NonFiniteFloat { path: String },

    #[error("{path} contains non-ABI value of type {type_name}")]
    NonAbiValue { path: String, type_name: String },
}

impl AbiError {
    /// Prepend a field segment to the error path.
    #[must_use]
    pub fn with_field(self, field: impl AsRef<str>) -> Self {
        self.with_path_segment(field.as_ref())
    }

    /// Prepend an index segment to the error path.
    #[must_use]
    pub fn with_index(self, index: usize) -> Self {
        self.with_path_segment(&format!("[{index}]"))
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NonFiniteFloat { path } | Self::NonAbiValue { path, .. } => Some(path.as_str()),
            Self::VersionMismatch { .. } => None,
        }
    }

    fn with_path_segment(self, segment: &str) -> Self {
        match self {
            Self::NonFiniteFloat { path } => Self::NonFiniteFloat {
                path: join_segments(segment, &path),
            },
            Self::NonAbiValue { path, type_name } => Self::NonAbiValue {
                path: join_segments(segment, &path),
                type_name,
            },
            other @ Self::VersionMismatch { .. } => other,
        }
    }
}

fn join_segments(prefix: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        prefix.to_string()
    } else if suffix.starts_with('[') {
        format!("{prefix}{suffix}")
    } else {
        format!("{prefix}.{suffix}")
    }
}

/// Validate the stage-boundary contract: current IR version and
/// JSON-representable metadata everywhere.
pub fn validate_abi(schema: &Schema) -> Result<(), AbiError> {
    if schema.ir_version != CURRENT_IR_VERSION {
        return Err(AbiError::VersionMismatch {
            found: schema.ir_version.clone(),
            expected: CURRENT_IR_VERSION.to_string(),
        });
    }

    check_metadata(schema.metadata.as_ref()).map_err(|e| e.with_field("schema"))?;

    for (i, entity) in schema.entities.iter().enumerate() {
        let at_entity = |e: AbiError| e.with_index(i).with_field("entities");
        check_metadata(entity.metadata.as_ref()).map_err(at_entity)?;

        for (j, field) in entity.fields.iter().enumerate() {
            check_metadata(field.metadata.as_ref())
                .map_err(|e| at_entity(e.with_index(j).with_field("fields")))?;
        }
    }

    for (i, service) in schema.services.iter().enumerate() {
        let at_service = |e: AbiError| e.with_index(i).with_field("services");
        check_metadata(service.metadata.as_ref()).map_err(at_service)?;

        for (j, method) in service.methods.iter().enumerate() {
            let at_method = |e: AbiError| at_service(e.with_index(j).with_field("methods"));
            check_metadata(method.metadata.as_ref()).map_err(at_method)?;

            for (k, source) in method.sources.iter().enumerate() {
                check_metadata(source.metadata.as_ref())
                    .map_err(|e| at_method(e.with_index(k).with_field("sources")))?;
            }
        }
    }

    for (i, event) in schema.events.iter().enumerate() {
        check_metadata(event.metadata.as_ref())
            .map_err(|e| e.with_index(i).with_field("events"))?;
    }

    for (i, endpoint) in schema.endpoints.iter().enumerate() {
        check_metadata(endpoint.metadata.as_ref())
            .map_err(|e| e.with_index(i).with_field("endpoints"))?;
    }

    Ok(())
}

// A missing map is tolerated; migration materializes them.
fn check_metadata(metadata: Option<&Metadata>) -> Result<(), AbiError> {
    let Some(map) = metadata else {
        return Ok(());
    };

    for (key, value) in map {
        check_value(value).map_err(|e| e.with_field(key).with_field("metadata"))?;
    }

    Ok(())
}

/// Check a single value against the closed ABI leaf set.
pub fn check_value(value: &Value) -> Result<(), AbiError> {
    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Uint(_) | Value::Text(_) => Ok(()),
        Value::Float(f) if f.is_finite() => Ok(()),
        Value::Float(_) => Err(AbiError::NonFiniteFloat {
            path: String::new(),
        }),
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                check_value(item).map_err(|e| e.with_index(i))?;
            }
            Ok(())
        }
        Value::Map(map) => {
            for (key, item) in map {
                check_value(item).map_err(|e| e.with_field(key))?;
            }
            Ok(())
        }
        Value::Opaque(opaque) => Err(AbiError::NonAbiValue {
            path: String::new(),
            type_name: opaque.type_name.clone(),
        }),
    }
}
