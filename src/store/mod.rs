//! Storage adapter boundary: an async document-store trait with typed errors,
//! so handler code never sniffs backend-specific failures.

pub mod memory;
pub mod postgres;

use crate::resource::ResourceSpec;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::{ensure_collections, PgStore};

/// A stored record: a JSON object carrying its own `id`, the resource's
/// domain key, `createdAt`, and `updatedAt`.
pub type Document = Map<String, Value>;

/// Storage field holding the internal id.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed internal id handed to a by-id operation.
    #[error("invalid {field}: '{value}' is not a valid id")]
    InvalidId { field: String, value: String },
    /// First failing storage-schema rule; re-checked on every write.
    #[error("{field}: {message}")]
    Schema { field: String, message: String },
    /// Unique-index violation.
    #[error("duplicate value for {field}: '{value}'")]
    DuplicateKey { field: String, value: String },
    #[error("storage backend: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(Box::new(e))
    }
}

/// One condition on a dotted document path. A filter is a conjunction.
#[derive(Clone, Debug)]
pub enum Cond {
    Eq(String, Value),
    /// Case-insensitive substring match.
    ContainsCi(String, String),
    /// Case-sensitive prefix match (allocator lookups).
    Prefix(String, String),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match against any of the paths (search).
    AnyContainsCi(Vec<String>, String),
}

#[derive(Clone, Debug, Default)]
pub struct Filter(pub Vec<Cond>);

impl Filter {
    pub fn all() -> Self {
        Filter(Vec::new())
    }

    pub fn and(mut self, cond: Cond) -> Self {
        self.0.push(cond);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Uniform document-store interface. Both adapters assign internal ids,
/// stamp timestamps, run the storage-schema check before writes, and
/// enforce the resource's unique indexes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        spec: &ResourceSpec,
        filter: &Filter,
        sort: &[SortKey],
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        spec: &ResourceSpec,
        filter: &Filter,
        sort: &[SortKey],
    ) -> Result<Option<Document>, StoreError>;

    async fn find_by_id(&self, spec: &ResourceSpec, id: &str)
        -> Result<Option<Document>, StoreError>;

    async fn count(&self, spec: &ResourceSpec, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert(&self, spec: &ResourceSpec, doc: Document) -> Result<Document, StoreError>;

    /// Partial update: top-level keys of `patch` replace the stored ones.
    /// Returns the updated document, or None when no document matched.
    async fn update_by_id(
        &self,
        spec: &ResourceSpec,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Physical delete. Returns the number of documents removed (0 or 1).
    async fn delete_by_id(&self, spec: &ResourceSpec, id: &str) -> Result<u64, StoreError>;

    /// Unconditional physical bulk delete of the whole collection.
    async fn delete_all(&self, spec: &ResourceSpec) -> Result<u64, StoreError>;
}

/// Generate a 24-hex internal id: 4 timestamp bytes + 8 random bytes,
/// so ids sort roughly by creation time.
pub fn new_internal_id() -> String {
    let secs = chrono::Utc::now().timestamp() as u32;
    let entropy = uuid::Uuid::new_v4();
    let bytes = entropy.as_bytes();
    let mut out = format!("{:08x}", secs);
    for b in &bytes[..8] {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

pub fn is_valid_internal_id(s: &str) -> bool {
    s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Read a dotted path out of a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for seg in parts {
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

/// Run the resource's storage-level rules against a full document,
/// reporting only the first violation (schema-error semantics).
pub fn check_schema(spec: &ResourceSpec, doc: &Document) -> Result<(), StoreError> {
    for rule in spec.storage_rules() {
        let value = get_path(doc, &rule.field);
        if rule.required && value.map_or(true, Value::is_null) {
            return Err(StoreError::Schema {
                field: rule.field.clone(),
                message: format!("{} is required", rule.field),
            });
        }
        let Some(v) = value else { continue };
        if v.is_null() {
            continue;
        }
        if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
            if s.chars().count() > max {
                return Err(StoreError::Schema {
                    field: rule.field.clone(),
                    message: format!("{} must be at most {} characters", rule.field, max),
                });
            }
        }
        if let (Some(allowed), Some(s)) = (rule.allowed.as_ref(), v.as_str()) {
            if !allowed.iter().any(|a| a == s) {
                return Err(StoreError::Schema {
                    field: rule.field.clone(),
                    message: format!("{} is not a valid value for {}", s, rule.field),
                });
            }
        }
        if let Some(pattern) = &rule.pattern {
            if let Some(s) = v.as_str() {
                let re = regex::Regex::new(pattern).map_err(|e| StoreError::Backend(Box::new(e)))?;
                if !re.is_match(s) {
                    return Err(StoreError::Schema {
                        field: rule.field.clone(),
                        message: format!("{} does not match the required pattern", rule.field),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Whether a document satisfies every condition of a filter.
/// Shared by the memory adapter and by tests.
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter.0.iter().all(|cond| match cond {
        Cond::Eq(path, expected) => get_path(doc, path) == Some(expected),
        Cond::ContainsCi(path, needle) => get_path(doc, path)
            .and_then(Value::as_str)
            .map_or(false, |s| {
                s.to_lowercase().contains(&needle.to_lowercase())
            }),
        Cond::Prefix(path, prefix) => get_path(doc, path)
            .and_then(Value::as_str)
            .map_or(false, |s| s.starts_with(prefix.as_str())),
        Cond::Gte(path, bound) => get_path(doc, path).map_or(false, |v| cmp_values(v, bound).is_ge()),
        Cond::Lte(path, bound) => get_path(doc, path).map_or(false, |v| cmp_values(v, bound).is_le()),
        Cond::AnyContainsCi(paths, needle) => {
            let needle = needle.to_lowercase();
            paths.iter().any(|path| {
                get_path(doc, path)
                    .and_then(Value::as_str)
                    .map_or(false, |s| s.to_lowercase().contains(&needle))
            })
        }
    })
}

/// Total order over JSON scalars for sorting and range filters.
/// Null < Bool < Number < String; other types compare by serialization.
pub fn cmp_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
