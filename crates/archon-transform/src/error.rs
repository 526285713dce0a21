use crate::ThisError;

///
/// TransformError
///

#[derive(Debug, ThisError)]
pub enum TransformError {
    #[error("transformer {name}: {message}")]
    Transformer { name: String, message: String },

    #[error(transparent)]
    Hook(#[from] HookError),
}

impl TransformError {
    pub fn transformer(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transformer {
            name: name.into(),
            message: message.into(),
        }
    }
}

///
/// HookError
///
/// Leaf failures raised by a hook, and the wrappers the registry adds to
/// name the attribute and the node it was attached to.
///

#[derive(Debug, ThisError)]
pub enum HookError {
    #[error("missing argument {0:?}")]
    MissingArg(String),

    #[error("invalid argument {arg:?}: {reason}")]
    InvalidArg { arg: String, reason: String },

    #[error("{0}")]
    Custom(String),

    #[error("hook {attribute} on field {entity}.{field}: {source}")]
    OnField {
        attribute: String,
        entity: String,
        field: String,
        source: Box<Self>,
    },

    #[error("hook {attribute} on entity {entity}: {source}")]
    OnEntity {
        attribute: String,
        entity: String,
        source: Box<Self>,
    },

    #[error("hook {attribute} on service {service}: {source}")]
    OnService {
        attribute: String,
        service: String,
        source: Box<Self>,
    },

    #[error("hook {attribute} on method {service}.{method}: {source}")]
    OnMethod {
        attribute: String,
        service: String,
        method: String,
        source: Box<Self>,
    },
}

impl HookError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    pub fn invalid_arg(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArg {
            arg: arg.into(),
            reason: reason.into(),
        }
    }
}
