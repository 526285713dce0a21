//! Compiler configuration, usually read from an `archon.toml` next to the
//! declarative sources.

use archon_flow::OwnershipPolicy;
use archon_normalizer::{TransformersDef, endpoint::HttpDefaults, helpers::parse_size};
use archon_transform::TransformersConfig;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid compiler config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid http.max_body_size {0:?}")]
    BodySize(String),
}

///
/// CompilerConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CompilerConfig {
    pub ownership: OwnershipConfig,
    pub transformers: TransformersConfig,
    pub http: HttpConfig,
    pub flow: FlowConfig,
}

impl CompilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.http.defaults()?;

        Ok(config)
    }

    #[must_use]
    pub fn ownership_policy(&self) -> OwnershipPolicy {
        OwnershipPolicy {
            shared_entities: self.ownership.shared_entities.clone(),
            exempt_services: self.ownership.exempt_services.clone(),
        }
    }

    pub fn http_defaults(&self) -> Result<HttpDefaults, ConfigError> {
        self.http.defaults()
    }

    /// Transformer toggles with an in-tree `#Transformers` block layered on
    /// top. Toggles the block does not know about keep their file value.
    #[must_use]
    pub fn transformers_with(&self, tree: Option<&TransformersDef>) -> TransformersConfig {
        let mut out = self.transformers.clone();
        if let Some(def) = tree {
            out.timestamps = def.timestamps;
            out.soft_delete = def.soft_delete;
            out.image = def.image;
            out.validation = def.validation;
            if !def.thumb_suffix.trim().is_empty() {
                out.thumb_suffix.clone_from(&def.thumb_suffix);
            }
        }

        out
    }
}

///
/// OwnershipConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct OwnershipConfig {
    pub shared_entities: BTreeSet<String>,
    pub exempt_services: BTreeSet<String>,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        let policy = OwnershipPolicy::default();

        Self {
            shared_entities: policy.shared_entities,
            exempt_services: policy.exempt_services,
        }
    }
}

///
/// HttpConfig
///
/// Fallback limits for endpoints whose `HTTP` block sets none.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub max_body_size: String,
    pub timeout: String,
}

impl HttpConfig {
    fn defaults(&self) -> Result<HttpDefaults, ConfigError> {
        let mut out = HttpDefaults::default();
        if !self.max_body_size.trim().is_empty() {
            let size = parse_size(&self.max_body_size);
            if size <= 0 {
                return Err(ConfigError::BodySize(self.max_body_size.clone()));
            }
            out.max_body_size = size;
        }
        if !self.timeout.trim().is_empty() {
            out.timeout = self.timeout.trim().to_string();
        }

        Ok(out)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_size: "1mb".to_string(),
            timeout: String::new(),
        }
    }
}

///
/// FlowConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct FlowConfig {
    pub syntax_check: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { syntax_check: true }
    }
}
