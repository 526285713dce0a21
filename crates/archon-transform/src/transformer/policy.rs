use crate::{error::TransformError, transformer::Transformer};
use archon_ir::{
    model::Schema,
    value::{HasMetadata, Value},
};
use archon_validate::EndpointPolicy;
use std::collections::BTreeMap;

///
/// PolicyTransformer
///
/// Records each endpoint's derived required headers under `policy`.
///

pub struct PolicyTransformer;

impl Transformer for PolicyTransformer {
    fn name(&self) -> &str {
        "policy"
    }

    fn apply(&self, schema: &mut Schema) -> Result<(), TransformError> {
        for ep in &mut schema.endpoints {
            let headers = EndpointPolicy::from_endpoint(ep).required_headers;
            let block = BTreeMap::from([("required_headers".to_string(), Value::from(headers))]);
            ep.set_meta("policy", block);
        }

        Ok(())
    }
}
