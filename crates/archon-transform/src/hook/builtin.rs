use crate::{
    error::HookError,
    hook::{Hook, HookScope},
};
use archon_ir::{
    model::{Attribute, Entity, Field, Method, Pagination, Service, Source, TypeKind, TypeRef},
    value::{HasMetadata, Metadata},
};
use archon_validate::duration::parse_duration;
use convert_case::{Case, Casing};

const FIELD: &[HookScope] = &[HookScope::Field];
const METHOD: &[HookScope] = &[HookScope::Method];
const SERVICE: &[HookScope] = &[HookScope::Service];

// First positional argument, as text.
fn positional(attr: &Attribute) -> Option<&str> {
    attr.arg_text("_").filter(|s| !s.is_empty())
}

///
/// DbHook
///
/// `@db(type=.., primary_key, unique, index)` into column metadata.
///

pub struct DbHook;

impl Hook for DbHook {
    fn attribute(&self) -> &str {
        "db"
    }

    fn scopes(&self) -> &'static [HookScope] {
        FIELD
    }

    fn on_field(&self, _entity: &str, field: &mut Field, attr: &Attribute) -> Result<(), HookError> {
        if let Some(sql_type) = attr.arg_text("type").filter(|s| !s.is_empty()) {
            field.set_meta("sql_type", sql_type);
        }
        if attr.arg_flag("primary_key") || attr.arg_flag("pk") {
            field.set_meta("primary_key", true);
        }
        for flag in ["unique", "index"] {
            if attr.arg_flag(flag) {
                field.set_meta(flag, true);
            }
        }

        Ok(())
    }
}

///
/// ValidateHook
///

pub struct ValidateHook;

impl Hook for ValidateHook {
    fn attribute(&self) -> &str {
        "validate"
    }

    fn scopes(&self) -> &'static [HookScope] {
        FIELD
    }

    fn on_field(&self, _entity: &str, field: &mut Field, attr: &Attribute) -> Result<(), HookError> {
        let rule = attr
            .arg_text("rule")
            .filter(|s| !s.is_empty())
            .or_else(|| positional(attr))
            .ok_or_else(|| HookError::MissingArg("rule".to_string()))?;
        field.set_meta("validate_rule", rule);

        Ok(())
    }
}

///
/// ImageHook
///

pub struct ImageHook {
    thumb_suffix: String,
}

impl ImageHook {
    #[must_use]
    pub fn new(thumb_suffix: impl Into<String>) -> Self {
        Self {
            thumb_suffix: thumb_suffix.into(),
        }
    }
}

impl Hook for ImageHook {
    fn attribute(&self) -> &str {
        "image"
    }

    fn scopes(&self) -> &'static [HookScope] {
        FIELD
    }

    fn on_field(&self, _entity: &str, field: &mut Field, attr: &Attribute) -> Result<(), HookError> {
        let suffix = attr
            .arg_text("thumb_suffix")
            .filter(|s| !s.is_empty())
            .unwrap_or(self.thumb_suffix.as_str());

        field.set_meta("file_kind", "image");
        field.set_meta("generate_thumbnail", true);
        field.set_meta("thumb_suffix", suffix);

        Ok(())
    }
}

///
/// FileHook
///

pub struct FileHook;

impl Hook for FileHook {
    fn attribute(&self) -> &str {
        "file"
    }

    fn scopes(&self) -> &'static [HookScope] {
        FIELD
    }

    fn on_field(&self, _entity: &str, field: &mut Field, attr: &Attribute) -> Result<(), HookError> {
        let kind = attr.arg_text("kind").filter(|s| !s.is_empty()).unwrap_or("auto");
        field.set_meta("file_kind", kind);
        if attr.arg("thumbnail").is_some() {
            field.set_meta("generate_thumbnail", attr.arg_flag("thumbnail"));
        }

        Ok(())
    }
}

///
/// EnvHook
///
/// `@env("VAR_NAME")` binds a config field to an environment variable.
///

pub struct EnvHook;

impl Hook for EnvHook {
    fn attribute(&self) -> &str {
        "env"
    }

    fn scopes(&self) -> &'static [HookScope] {
        FIELD
    }

    fn on_field(&self, _entity: &str, field: &mut Field, attr: &Attribute) -> Result<(), HookError> {
        let var = positional(attr)
            .or_else(|| attr.arg_text("name").filter(|s| !s.is_empty()))
            .ok_or_else(|| HookError::MissingArg("name".to_string()))?;

        field.set_meta("env_var", var);
        if field.env_var.is_empty() {
            field.env_var = var.to_string();
        }

        Ok(())
    }
}

///
/// CacheHook
///

pub struct CacheHook;

impl Hook for CacheHook {
    fn attribute(&self) -> &str {
        "cache"
    }

    fn scopes(&self) -> &'static [HookScope] {
        METHOD
    }

    fn on_method(&self, _service: &str, method: &mut Method, attr: &Attribute) -> Result<(), HookError> {
        if let Some(ttl) = attr.arg_text("ttl").filter(|s| !s.is_empty()) {
            parse_duration(ttl).map_err(|e| HookError::invalid_arg("ttl", e.to_string()))?;
            method.cache_ttl = ttl.to_string();
            method.set_meta("cache_enabled", true);
        }
        if let Some(key) = attr.arg_text("key").filter(|s| !s.is_empty()) {
            method.set_meta("cache_key_template", key);
        }

        Ok(())
    }
}

///
/// CrudHook
///
/// `@crud(entity=Order)` on a service adds `GetOrder` and `ListOrder`
/// read methods backed by SQL, unless the service already declares them.
///

pub struct CrudHook;

pub const CRUD_GENERATED_BY: &str = "crud_hook";

impl CrudHook {
    fn get_method(entity: &str) -> Method {
        let name = format!("Get{entity}");
        let mut input = Entity::new(format!("{name}Request"));
        input.fields.push(Field::new("id", TypeRef::scalar(TypeKind::String)));
        let mut output = Entity::new(format!("{name}Response"));
        output
            .fields
            .push(Field::new(entity.to_case(Case::Snake), TypeRef::entity(entity)));

        let method = Method {
            input,
            output,
            ..Method::new(name)
        };

        Self::generated(method, entity)
    }

    fn list_method(entity: &str) -> Method {
        let name = format!("List{entity}");
        let mut input = Entity::new(format!("{name}Request"));
        for param in ["limit", "offset"] {
            input.fields.push(Field {
                optional: true,
                ..Field::new(param, TypeRef::scalar(TypeKind::Int))
            });
        }
        let mut output = Entity::new(format!("{name}Response"));
        output.fields = vec![
            Field::new("items", TypeRef::list(TypeRef::entity(entity))),
            Field::new("total", TypeRef::scalar(TypeKind::Int)),
        ];

        let method = Method {
            input,
            output,
            pagination: Some(Pagination::offset_default()),
            ..Method::new(name)
        };

        Self::generated(method, entity)
    }

    fn generated(mut method: Method, entity: &str) -> Method {
        method.sources.push(Source {
            name: entity.to_case(Case::Snake),
            kind: "sql".to_string(),
            entity: entity.to_string(),
            metadata: Some(Metadata::new()),
            ..Source::default()
        });
        method.set_meta("generated_by", CRUD_GENERATED_BY);

        method
    }
}

impl Hook for CrudHook {
    fn attribute(&self) -> &str {
        "crud"
    }

    fn scopes(&self) -> &'static [HookScope] {
        SERVICE
    }

    fn on_service(&self, service: &mut Service, attr: &Attribute) -> Result<(), HookError> {
        let entity = attr
            .arg_text("entity")
            .filter(|s| !s.is_empty())
            .or_else(|| positional(attr))
            .ok_or_else(|| HookError::MissingArg("entity".to_string()))?;
        let pascal = entity.starts_with(|c: char| c.is_ascii_uppercase())
            && entity.chars().all(|c| c.is_ascii_alphanumeric());
        if pascal {
            for method in [Self::get_method(entity), Self::list_method(entity)] {
                if !service.has_method(&method.name) {
                    service.methods.push(method);
                }
            }
            service.requires_sql = true;

            Ok(())
        } else {
            Err(HookError::invalid_arg(
                "entity",
                format!("{entity:?} is not a PascalCase entity name"),
            ))
        }
    }
}
