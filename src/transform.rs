//! Stored document -> public API shape. Renames the internal and domain ids,
//! passes configured fields through verbatim, and drops everything else
//! (status, timestamps, sensitive fields).

use crate::resource::ResourceSpec;
use crate::store::{Document, ID_FIELD};
use serde_json::{Map, Value};

/// Transform a stored document. `None` passes through unchanged; a document
/// missing nested sub-objects simply lacks those keys in the output.
pub fn transform(spec: &ResourceSpec, doc: Option<&Document>) -> Option<Value> {
    let doc = doc?;
    let mut out = Map::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(spec.id_key.clone(), id.clone());
    }
    if let Some(domain_id) = doc.get(&spec.domain_key) {
        out.insert(spec.domain_key.clone(), domain_id.clone());
    }
    for field in &spec.public_fields {
        if spec.sensitive_fields.contains(field) {
            continue;
        }
        if let Some(v) = doc.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    Some(Value::Object(out))
}

/// Transform a batch, preserving order.
pub fn transform_all(spec: &ResourceSpec, docs: &[Document]) -> Vec<Value> {
    docs.iter().filter_map(|d| transform(spec, Some(d))).collect()
}
