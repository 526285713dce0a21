use crate::ThisError;
use archon_flow::FlowError;

///
/// NormalizeError
///
/// Fatal extraction failures. Everything recoverable is a diagnostic.
///

#[derive(Debug, ThisError)]
pub enum NormalizeError {
    #[error("{path}: expected {expected}")]
    Shape { path: String, expected: &'static str },

    #[error("HTTP endpoint {0} has no matching operation")]
    UnmatchedEndpoint(String),

    #[error("missing service for operation {0}")]
    MissingService(String),

    #[error("invalid endpoint {name} ({path}): method/path/service are required")]
    InvalidEndpoint { name: String, path: String },

    #[error("{0}.items is required when {0} is a struct")]
    TemplateItems(&'static str),

    #[error("template id/name is required")]
    TemplateId,

    #[error("template {0:?} has no content (subject/text/html/body or corresponding *File)")]
    TemplateContent(String),

    #[error("email template name is required")]
    EmailTemplateName,

    #[error("email template subject is required: {0}")]
    EmailTemplateSubject(String),

    #[error("email template text/html or textFile/htmlFile is required: {0}")]
    EmailTemplateBody(String),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Infra(#[from] InfraExtractError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl NormalizeError {
    pub(crate) fn shape(path: impl Into<String>, expected: &'static str) -> Self {
        Self::Shape {
            path: path.into(),
            expected,
        }
    }
}

///
/// InfraExtractError
///
/// An infra extractor failed; carries the registry entry's stable code.
///

#[derive(Debug, ThisError)]
#[error("{code}: {op}: {source}")]
pub struct InfraExtractError {
    pub key: String,
    pub code: &'static str,
    pub op: &'static str,
    pub source: Box<NormalizeError>,
}

///
/// RegistryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RegistryError {
    #[error("infra registry: empty key")]
    EmptyKey,

    #[error("infra registry: empty tree path for key '{0}'")]
    EmptyPath(String),

    #[error("infra registry: duplicate key '{0}'")]
    DuplicateKey(String),
}
