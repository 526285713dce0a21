use crate::{error::TransformError, transformer::Transformer};
use archon_ir::{
    model::Schema,
    value::{HasMetadata, Value},
};
use std::collections::BTreeMap;

pub const DEFAULT_TTL: &str = "5m";

///
/// CachingTransformer
///
/// Methods with `@cache` get a read-through cache block; their service is
/// flagged for a caching decorator.
///

pub struct CachingTransformer;

impl Transformer for CachingTransformer {
    fn name(&self) -> &str {
        "caching"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for svc in &mut schema.services {
            let mut cached = false;

            for m in &mut svc.methods {
                let Some(attr) = m.attribute("cache") else {
                    continue;
                };
                let ttl = attr
                    .arg_text("ttl")
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_TTL);
                let key = attr.arg_text("key").map_or(Value::Null, Value::text);

                let block = BTreeMap::from([
                    ("enabled".to_string(), Value::Bool(true)),
                    ("ttl".to_string(), Value::text(ttl)),
                    ("key".to_string(), key),
                    ("strategy".to_string(), Value::text("read-through")),
                ]);
                m.set_meta("cache", block);
                cached = true;
            }

            if cached {
                svc.set_meta("needs_caching_decorator", true);
            }
        }

        Ok(())
    }
}
