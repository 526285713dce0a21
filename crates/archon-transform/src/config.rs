use serde::Deserialize;

pub const DEFAULT_THUMB_SUFFIX: &str = "_thumb";

///
/// TransformersConfig
///
/// Built-in transformer toggles. A disabled toggle removes its pass; an
/// enabled `timestamps` or `soft_delete` pass still only touches entities
/// that carry the matching marker.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct TransformersConfig {
    pub image: bool,
    pub validation: bool,
    pub timestamps: bool,
    pub soft_delete: bool,
    pub tracing: bool,
    pub caching: bool,
    pub policy: bool,
    pub thumb_suffix: String,
}

impl TransformersConfig {
    /// Thumbnail suffix, falling back to the default when blank.
    #[must_use]
    pub fn thumb_suffix(&self) -> &str {
        match self.thumb_suffix.trim() {
            "" => DEFAULT_THUMB_SUFFIX,
            s => s,
        }
    }
}

impl Default for TransformersConfig {
    fn default() -> Self {
        Self {
            image: true,
            validation: true,
            timestamps: true,
            soft_delete: true,
            tracing: true,
            caching: true,
            policy: true,
            thumb_suffix: DEFAULT_THUMB_SUFFIX.to_string(),
        }
    }
}
