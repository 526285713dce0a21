
use crate::{CURRENT_IR_VERSION, ThisError, model::Schema, value::Metadata};
use tracing::debug;

///
/// MigrationError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MigrationError {
    #[error("unsupported ir_version {found:?} (current={current})")]
    UnsupportedVersion { found: String, current: String },

    #[error("unknown target ir_version {0:?}")]
    UnknownTarget(String),

    #[error("no migration registered from ir_version {0:?}")]
    MissingStep(String),

    #[error("migration {from} -> {to} left ir_version at {found:?}")]
    StepDidNotAdvance {
        from: String,
        to: String,
        found: String,
    },
}

///
/// MigrationStep
///
/// One edge of the version chain. `apply` performs the transform and
/// must leave `ir_version` set to `to`.
///

#[derive(Clone, Copy, Debug)]
pub struct MigrationStep {
    pub from: &'static str,
    pub to: &'static str,
    pub apply: fn(&mut Schema),
}

const REGISTRY: &[MigrationStep] = &[
    MigrationStep {
        from: "0",
        to: "1",
        apply: migrate_v0_to_v1,
    },
    MigrationStep {
        from: "1",
        to: "2",
        apply: migrate_v1_to_v2,
    },
];

/// Registered migration steps in chain order.
#[must_use]
pub const fn registry() -> &'static [MigrationStep] {
    REGISTRY
}

/// Versions reachable through the registry, including the legacy root.
#[must_use]
pub fn known_versions() -> Vec<&'static str> {
    let mut out = vec!["0"];
    out.extend(REGISTRY.iter().map(|step| step.to));

    out
}

fn lookup(from: &str) -> Option<&'static MigrationStep> {
    REGISTRY.iter().find(|step| step.from == from)
}

// Empty and whitespace-only versions are the legacy root.
fn normalized_version(raw: &str) -> &str {
    match raw.trim() {
        "" => "0",
        v => v,
    }
}

/// Upgrade `schema` in place to [`CURRENT_IR_VERSION`].
pub fn migrate_to_current(schema: &mut Schema) -> Result<(), MigrationError> {
    migrate_to(schema, CURRENT_IR_VERSION)
}

/// Upgrade `schema` in place along the registered chain until it reaches
/// `target`. Idempotent once the target is reached.
pub fn migrate_to(schema: &mut Schema, target: &str) -> Result<(), MigrationError> {
    let known = known_versions();
    let mut state = normalized_version(&schema.ir_version).to_string();

    if !known.contains(&state.as_str()) {
        return Err(MigrationError::UnsupportedVersion {
            found: schema.ir_version.clone(),
            current: CURRENT_IR_VERSION.to_string(),
        });
    }
    if !known.contains(&target) {
        return Err(MigrationError::UnknownTarget(target.to_string()));
    }

    while state != target {
        let step = lookup(&state).ok_or_else(|| MigrationError::MissingStep(state.clone()))?;
        (step.apply)(schema);

        if schema.ir_version != step.to {
            return Err(MigrationError::StepDidNotAdvance {
                from: step.from.to_string(),
                to: step.to.to_string(),
                found: schema.ir_version.clone(),
            });
        }

        debug!(from = step.from, to = step.to, "ir migration step applied");
        state = step.to.to_string();
    }

    schema.ir_version = state;
    if target == CURRENT_IR_VERSION {
        normalize_invariants(schema);
    }

    Ok(())
}

fn migrate_v0_to_v1(schema: &mut Schema) {
    schema.ir_version = "1".to_string();
}

fn migrate_v1_to_v2(schema: &mut Schema) {
    normalize_invariants(schema);
    schema.ir_version = "2".to_string();
}

/// Materialize every metadata map the ABI tracks so no consumer has to
/// handle a missing one.
pub fn normalize_invariants(schema: &mut Schema) {
    ensure(&mut schema.metadata);

    for entity in &mut schema.entities {
        ensure(&mut entity.metadata);
        for field in &mut entity.fields {
            ensure(&mut field.metadata);
        }
    }

    for service in &mut schema.services {
        ensure(&mut service.metadata);
        for method in &mut service.methods {
            ensure(&mut method.metadata);
            for source in &mut method.sources {
                ensure(&mut source.metadata);
            }
        }
    }

    for event in &mut schema.events {
        ensure(&mut event.metadata);
    }

    for endpoint in &mut schema.endpoints {
        ensure(&mut endpoint.metadata);
    }
}

fn ensure(slot: &mut Option<Metadata>) {
    slot.get_or_insert_with(Metadata::new);
}
