//! Infrastructure registry.
//!
//! Each entry binds a key to a tree path, an extractor, an optional hook
//! that contributes to the generation context, and per-language generation
//! steps. Entries are kept sorted by key so extraction order, failures and
//! resolved steps are deterministic.

use crate::{
    defs::ConfigDef,
    error::{InfraExtractError, NormalizeError, RegistryError},
    infra,
};
use archon_ir::model::{Auth, NotificationChannels, NotificationMuting, NotificationPolicies};
use archon_tree::ConfigValue;
use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

pub const KEY_AUTH: &str = "auth";
pub const KEY_CONFIG: &str = "config";
pub const KEY_NOTIFICATION_CHANNELS: &str = "notification_channels";
pub const KEY_NOTIFICATION_MUTING: &str = "notification_muting";
pub const KEY_NOTIFICATION_POLICIES: &str = "notification_policies";

const CODE_CONFIG_PARSE: &str = "INFRA_CONFIG_PARSE_ERROR";
const CODE_AUTH_PARSE: &str = "INFRA_AUTH_PARSE_ERROR";
const CODE_NOTIFICATIONS_PARSE: &str = "INFRA_NOTIFICATIONS_PARSE_ERROR";

/// Reads one block from the infrastructure tree; `None` when absent.
pub type InfraExtractor =
    fn(&dyn ConfigValue, Option<&Path>) -> Result<Option<InfraValue>, NormalizeError>;

/// Folds an extracted value into the generation context.
pub type ContextHook = fn(&InfraValue, &mut InfraContextPatch);

///
/// InfraValue
///

#[derive(Clone, Debug, PartialEq)]
pub enum InfraValue {
    Auth(Auth),
    Config(ConfigDef),
    NotificationChannels(NotificationChannels),
    NotificationMuting(NotificationMuting),
    NotificationPolicies(NotificationPolicies),
}

///
/// InfraLanguage
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum InfraLanguage {
    Go,
    Python,
}

impl InfraLanguage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for InfraLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfraLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "go" => Ok(Self::Go),
            "python" => Ok(Self::Python),
            other => Err(format!("unknown infra language '{other}'")),
        }
    }
}

///
/// InfraStepSpec
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InfraStepSpec {
    pub name: String,
    pub requires: Vec<String>,
}

impl InfraStepSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, requires: &[&str]) -> Self {
        Self {
            name: name.into(),
            requires: requires.iter().map(ToString::to_string).collect(),
        }
    }
}

///
/// ResolvedStep
///
/// A generation step owed to an extracted infra value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedStep {
    pub key: String,
    pub name: String,
    pub requires: Vec<String>,
}

///
/// InfraContextPatch
///
/// Generation-context adjustments implied by infrastructure settings.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InfraContextPatch {
    pub auth_service: String,
    pub auth_refresh_store: String,
    pub notification_muting: bool,
    pub force_cache: bool,
    pub force_sql: bool,
}

///
/// InfraDef
///

#[derive(Clone, Debug)]
pub struct InfraDef {
    pub key: String,
    pub tree_path: String,
    pub error_code: &'static str,
    pub error_op: &'static str,
    pub extractor: InfraExtractor,
    pub context_hook: Option<ContextHook>,
    pub steps: BTreeMap<InfraLanguage, InfraStepSpec>,
}

impl InfraDef {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        tree_path: impl Into<String>,
        error_code: &'static str,
        error_op: &'static str,
        extractor: InfraExtractor,
    ) -> Self {
        Self {
            key: key.into(),
            tree_path: tree_path.into(),
            error_code,
            error_op,
            extractor,
            context_hook: None,
            steps: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: ContextHook) -> Self {
        self.context_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn with_step(mut self, lang: InfraLanguage, spec: InfraStepSpec) -> Self {
        self.steps.insert(lang, spec);
        self
    }
}

///
/// InfraRegistry
///

#[derive(Clone, Debug, Default)]
pub struct InfraRegistry {
    defs: BTreeMap<String, InfraDef>,
}

impl InfraRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in config, auth and notification entries.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for def in builtin_defs() {
            // built-in keys are distinct and non-empty
            let _ = registry.register(def);
        }

        registry
    }

    /// Register an entry. Keys are trimmed; empty or duplicate keys and empty
    /// tree paths are rejected.
    pub fn register(&mut self, mut def: InfraDef) -> Result<(), RegistryError> {
        let key = def.key.trim().to_string();
        if key.is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        if def.tree_path.trim().is_empty() {
            return Err(RegistryError::EmptyPath(key));
        }
        if self.defs.contains_key(&key) {
            return Err(RegistryError::DuplicateKey(key));
        }

        def.key.clone_from(&key);
        self.defs.insert(key, def);

        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&InfraDef> {
        self.defs.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Run every extractor in key order. Absent blocks produce no value; the
    /// first failure stops extraction.
    pub fn extract_all(
        &self,
        tree: &dyn ConfigValue,
        root: Option<&Path>,
    ) -> Result<BTreeMap<String, InfraValue>, InfraExtractError> {
        let mut out = BTreeMap::new();

        for def in self.defs.values() {
            if !tree.exists(&def.tree_path) {
                continue;
            }
            let parsed = (def.extractor)(tree, root).map_err(|err| InfraExtractError {
                key: def.key.clone(),
                code: def.error_code,
                op: def.error_op,
                source: Box::new(err),
            })?;
            if let Some(value) = parsed {
                tracing::debug!(key = %def.key, "extracted infra block");
                out.insert(def.key.clone(), value);
            }
        }

        Ok(out)
    }

    #[must_use]
    pub fn build_context_patch(&self, values: &BTreeMap<String, InfraValue>) -> InfraContextPatch {
        let mut patch = InfraContextPatch::default();
        for def in self.defs.values() {
            if let (Some(hook), Some(value)) = (def.context_hook, values.get(&def.key)) {
                hook(value, &mut patch);
            }
        }

        patch
    }

    /// Generation steps owed for `lang` by the extracted values.
    #[must_use]
    pub fn steps_for(&self, lang: InfraLanguage, values: &BTreeMap<String, InfraValue>) -> Vec<ResolvedStep> {
        self.defs
            .values()
            .filter(|def| values.contains_key(&def.key))
            .filter_map(|def| {
                let spec = def.steps.get(&lang)?;
                (!spec.name.trim().is_empty()).then(|| ResolvedStep {
                    key: def.key.clone(),
                    name: spec.name.clone(),
                    requires: spec.requires.clone(),
                })
            })
            .collect()
    }
}

fn builtin_defs() -> Vec<InfraDef> {
    vec![
        InfraDef::new(KEY_CONFIG, "#AppConfig", CODE_CONFIG_PARSE, "extract config", |t, root| {
            Ok(infra::extract_config(t, root)?.map(InfraValue::Config))
        }),
        InfraDef::new(KEY_AUTH, "#Auth", CODE_AUTH_PARSE, "extract auth", |t, _| {
            Ok(infra::extract_auth(t)?.map(InfraValue::Auth))
        })
        .with_hook(auth_hook)
        .with_step(
            InfraLanguage::Python,
            InfraStepSpec::new("Python Auth Stores", &["profile_python_fastapi", KEY_AUTH]),
        ),
        InfraDef::new(
            KEY_NOTIFICATION_CHANNELS,
            "#NotificationChannels",
            CODE_NOTIFICATIONS_PARSE,
            "extract notification channels",
            |t, _| Ok(infra::extract_notification_channels(t)?.map(InfraValue::NotificationChannels)),
        ),
        InfraDef::new(
            KEY_NOTIFICATION_MUTING,
            "#NotificationMuting",
            CODE_CONFIG_PARSE,
            "extract notification muting",
            |t, _| Ok(infra::extract_notification_muting(t)?.map(InfraValue::NotificationMuting)),
        )
        .with_hook(muting_hook)
        .with_step(
            InfraLanguage::Go,
            InfraStepSpec::new("Notification Muting", &["profile_go_legacy"]),
        ),
        InfraDef::new(
            KEY_NOTIFICATION_POLICIES,
            "#NotificationPolicies",
            CODE_NOTIFICATIONS_PARSE,
            "extract notification policies",
            |t, _| Ok(infra::extract_notification_policies(t)?.map(InfraValue::NotificationPolicies)),
        ),
    ]
}

// redis and hybrid refresh stores need the cache; hybrid also needs SQL
fn auth_hook(value: &InfraValue, patch: &mut InfraContextPatch) {
    let InfraValue::Auth(auth) = value else {
        return;
    };
    patch.auth_service.clone_from(&auth.operations.service);
    patch.auth_refresh_store.clone_from(&auth.refresh_store);

    let store = auth.refresh_store.trim();
    if store.eq_ignore_ascii_case("redis") || store.eq_ignore_ascii_case("hybrid") {
        patch.force_cache = true;
    }
    if store.eq_ignore_ascii_case("hybrid") {
        patch.force_sql = true;
    }
}

fn muting_hook(value: &InfraValue, patch: &mut InfraContextPatch) {
    if let InfraValue::NotificationMuting(m) = value
        && m.enabled
    {
        patch.notification_muting = true;
    }
}
