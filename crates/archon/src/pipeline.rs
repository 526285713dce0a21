//! The end-to-end compiler pipeline: configuration tree in, validated IR out.

use crate::{CompilerConfig, Error};
use archon_diag::{CollectSink, DiagnosticSink, Severity, TracingSink, Warning};
use archon_ir::{
    abi::validate_abi,
    model::Schema,
    version::{migrate_to_current, normalize_invariants},
};
use archon_normalizer::{Normalizer, Sources, assemble};
use archon_transform::{Hook, HookRegistry, Transformer, TransformerRegistry, TransformersConfig};
use archon_validate::{validate_policies, validate_semantics};
use std::path::PathBuf;

///
/// CompileOutput
///

#[derive(Debug)]
pub struct CompileOutput {
    pub schema: Schema,
    pub diagnostics: Vec<Warning>,
}

impl CompileOutput {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|w| w.severity == Severity::Error)
    }

    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|w| w.code.as_str()).collect()
    }
}

///
/// Pipeline
///
/// Built-in transformers and hooks are assembled per run from the effective
/// configuration; custom ones registered here run after them.
///

#[derive(Default)]
pub struct Pipeline {
    config: CompilerConfig,
    root: Option<PathBuf>,
    transformers: TransformerRegistry,
    hooks: HookRegistry,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn register_transformer(&mut self, transformer: impl Transformer + 'static) {
        self.transformers.register(transformer);
    }

    pub fn register_hook(&mut self, hook: impl Hook + 'static) {
        self.hooks.register(hook);
    }

    /// Normalize `sources` and compile the result. Diagnostics never stop
    /// the run; only a fatal error from a stage does. Duplicates are only
    /// folded within one method's flow validation, never across methods.
    pub fn run(&self, sources: &Sources<'_>) -> Result<CompileOutput, Error> {
        let mut normalizer = Normalizer::new(CollectSink::new())
            .with_policy(self.config.ownership_policy())
            .with_syntax_check(self.config.flow.syntax_check)
            .with_http_defaults(self.config.http_defaults()?);
        if let Some(root) = &self.root {
            normalizer = normalizer.with_root(root.clone());
        }

        let defs = normalizer.normalize(sources)?;
        let diagnostics = normalizer.into_sink().into_inner();

        let mut sink = TracingSink;
        for w in &diagnostics {
            sink.report(w.clone());
        }

        let transformers = self.config.transformers_with(defs.transformers.as_ref());
        let mut schema = assemble(defs);
        self.compile(&mut schema, &transformers)?;

        tracing::info!(
            diagnostics = diagnostics.len(),
            entities = schema.entities.len(),
            services = schema.services.len(),
            "pipeline finished"
        );

        Ok(CompileOutput { schema, diagnostics })
    }

    /// Compile an already assembled schema with the configured transformer
    /// toggles. Running it on its own output changes nothing.
    pub fn process(&self, schema: &mut Schema) -> Result<(), Error> {
        self.compile(schema, &self.config.transformers)
    }

    fn compile(&self, schema: &mut Schema, config: &TransformersConfig) -> Result<(), Error> {
        migrate_to_current(schema)?;
        validate_abi(schema)?;

        let builtin_transformers = TransformerRegistry::builtin(config);
        let builtin_hooks = HookRegistry::builtin(config.thumb_suffix());

        let transform = |schema: &mut Schema| -> Result<(), Error> {
            builtin_transformers.apply(schema)?;
            self.transformers.apply(schema)?;
            Ok(())
        };

        transform(schema)?;
        builtin_hooks.apply(schema)?;
        self.hooks.apply(schema)?;
        // Nodes synthesized by hooks get the same enrichment as declared ones.
        transform(schema)?;
        normalize_invariants(schema);

        schema.refresh_graph();
        validate_abi(schema)?;
        validate_semantics(schema)?;
        validate_policies(&schema.endpoints)?;
        tracing::debug!("schema passed semantic and policy validation");

        Ok(())
    }
}
