use crate::{
    defs::Definitions,
    endpoint::{HttpDefaults, extract_endpoints},
    entity::extract_entities,
    error::NormalizeError,
    infra,
    registry::{InfraRegistry, InfraValue},
    repository::extract_repositories,
    template,
};
use archon_diag::{CollectSink, DiagnosticSink, Warning};
use archon_flow::OwnershipPolicy;
use archon_tree::ConfigValue;
use std::path::{Path, PathBuf};

///
/// Sources
///
/// The configuration subtrees one normalization run reads. Every subtree is
/// optional; absent ones contribute nothing.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Sources<'a> {
    /// Entity definitions.
    pub domain: Option<&'a dyn ConfigValue>,

    /// Operations, the `HTTP` block and the `Services` block.
    pub api: Option<&'a dyn ConfigValue>,

    /// `#Project`, `#Target`, `#Events`, `#Errors`, `#Transformers`,
    /// `Schedules`.
    pub architecture: Option<&'a dyn ConfigValue>,

    /// Event payload definitions.
    pub events: Option<&'a dyn ConfigValue>,

    /// `Repositories` and legacy `*Repository` labels.
    pub repositories: Option<&'a dyn ConfigValue>,

    /// Registry-driven infrastructure plus `#Templates` and `#EmailTemplates`.
    pub infra: Option<&'a dyn ConfigValue>,

    pub rbac: Option<&'a dyn ConfigValue>,
    pub views: Option<&'a dyn ConfigValue>,
    pub scenarios: Option<&'a dyn ConfigValue>,
}

impl<'a> Sources<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn domain(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.domain = Some(tree);
        self
    }

    #[must_use]
    pub fn api(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.api = Some(tree);
        self
    }

    #[must_use]
    pub fn architecture(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.architecture = Some(tree);
        self
    }

    #[must_use]
    pub fn events(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.events = Some(tree);
        self
    }

    #[must_use]
    pub fn repositories(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.repositories = Some(tree);
        self
    }

    #[must_use]
    pub fn infra(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.infra = Some(tree);
        self
    }

    #[must_use]
    pub fn rbac(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.rbac = Some(tree);
        self
    }

    #[must_use]
    pub fn views(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.views = Some(tree);
        self
    }

    #[must_use]
    pub fn scenarios(mut self, tree: &'a dyn ConfigValue) -> Self {
        self.scenarios = Some(tree);
        self
    }
}

///
/// Normalizer
///
/// Owns the diagnostic sink for one run. Extraction never stops at a
/// diagnostic; only malformed input returns an error.
///

#[derive(Debug)]
pub struct Normalizer<S: DiagnosticSink = CollectSink> {
    sink: S,
    root: Option<PathBuf>,
    policy: OwnershipPolicy,
    syntax_check: bool,
    http: HttpDefaults,
    registry: InfraRegistry,
}

impl Default for Normalizer<CollectSink> {
    fn default() -> Self {
        Self::new(CollectSink::new())
    }
}

impl<S: DiagnosticSink> Normalizer<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            root: None,
            policy: OwnershipPolicy::default(),
            syntax_check: true,
            http: HttpDefaults::default(),
            registry: InfraRegistry::builtin(),
        }
    }

    /// Project root; source positions are reported relative to it.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: OwnershipPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_syntax_check(mut self, enabled: bool) -> Self {
        self.syntax_check = enabled;
        self
    }

    /// Fallback HTTP limits used when the `HTTP` block sets none.
    #[must_use]
    pub fn with_http_defaults(mut self, http: HttpDefaults) -> Self {
        self.http = http;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: InfraRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub(crate) fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub(crate) const fn policy(&self) -> &OwnershipPolicy {
        &self.policy
    }

    pub(crate) const fn syntax_check(&self) -> bool {
        self.syntax_check
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        self.sink.report(warning);
    }

    /// Run every extractor over `sources`.
    pub fn normalize(&mut self, sources: &Sources<'_>) -> Result<Definitions, NormalizeError> {
        let root = self.root.clone();
        let root = root.as_deref();
        let mut defs = Definitions::default();

        if let Some(domain) = sources.domain {
            defs.entities = extract_entities(domain, root);
        }
        if let Some(api) = sources.api {
            defs.services = self.extract_services(api, &defs.entities)?;
            defs.endpoints = extract_endpoints(api, &self.http, root)?;
        }
        defs.repos = extract_repositories(sources.api, sources.repositories, root);

        if let Some(arch) = sources.architecture {
            defs.project = infra::extract_project(arch);
            defs.errors = infra::extract_errors(arch, root);
            defs.events = infra::extract_architecture_events(arch, root);
            defs.schedules = infra::extract_schedules(arch);
            defs.transformers = infra::extract_transformers(arch);
        }
        if let Some(events) = sources.events {
            let mut parsed = infra::extract_events(events, root);
            parsed.append(&mut defs.events);
            defs.events = parsed;
        }
        if let Some(rbac) = sources.rbac {
            defs.rbac = infra::extract_rbac(rbac);
        }
        if let Some(views) = sources.views {
            defs.views = infra::extract_views(views);
        }
        if let Some(scenarios) = sources.scenarios {
            defs.scenarios = infra::extract_scenarios(scenarios, root);
        }

        if let Some(tree) = sources.infra {
            self.apply_infra(tree, &mut defs)?;
            defs.templates = template::extract_templates(tree)?;
        }

        tracing::info!(
            entities = defs.entities.len(),
            services = defs.services.len(),
            endpoints = defs.endpoints.len(),
            repositories = defs.repos.len(),
            events = defs.events.len(),
            templates = defs.templates.len(),
            "normalized configuration"
        );

        Ok(defs)
    }

    fn apply_infra(&self, tree: &dyn ConfigValue, defs: &mut Definitions) -> Result<(), NormalizeError> {
        let values = self.registry.extract_all(tree, self.root())?;
        defs.infra = self.registry.build_context_patch(&values);

        for value in values.into_values() {
            match value {
                InfraValue::Auth(auth) => defs.auth = Some(auth),
                InfraValue::Config(config) => defs.config = Some(config),
                InfraValue::NotificationChannels(c) => defs.notification_channels = Some(c),
                InfraValue::NotificationMuting(m) => defs.notification_muting = Some(m),
                InfraValue::NotificationPolicies(p) => defs.notification_policies = Some(p),
            }
        }

        Ok(())
    }
}
