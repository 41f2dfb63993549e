//! Sequential domain-id allocation (`SP-00005`). The next id is re-derived
//! from storage on every call; there is no in-process counter, so multiple
//! stateless instances stay consistent. The domain key's unique index is the
//! safety net for the read-then-insert window between two concurrent creates.

use crate::resource::ResourceSpec;
use crate::store::{get_path, Cond, DocumentStore, Filter, SortKey, StoreError};

/// Numeric suffix of a domain id, if the id carries this prefix.
pub fn parse_suffix(prefix: &str, domain_id: &str) -> Option<u64> {
    let rest = domain_id.strip_prefix(prefix)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Render a domain id. The suffix grows past the pad width instead of being
/// clamped or truncated, so large sequences never collide.
pub fn format_domain_id(prefix: &str, suffix: u64, pad_width: usize) -> String {
    format!("{}{:0width$}", prefix, suffix, width = pad_width)
}

/// Compute the next domain id for a resource: highest existing suffix + 1,
/// or 1 for an empty collection. Gaps left by deletions are never reused.
/// Pure read + compute; the caller persists the result.
pub async fn allocate(
    store: &dyn DocumentStore,
    spec: &ResourceSpec,
) -> Result<String, StoreError> {
    // Fixed-width zero padding makes lexicographic order equal numeric order,
    // so the lexicographically greatest id carries the greatest suffix.
    let filter = Filter::all().and(Cond::Prefix(spec.domain_key.clone(), spec.prefix.clone()));
    let sort = [SortKey {
        field: spec.domain_key.clone(),
        descending: true,
    }];
    let latest = store.find_one(spec, &filter, &sort).await?;
    let next = latest
        .as_ref()
        .and_then(|doc| get_path(doc, &spec.domain_key))
        .and_then(|v| v.as_str())
        .and_then(|s| parse_suffix(&spec.prefix, s))
        .map_or(1, |n| n + 1);
    Ok(format_domain_id(&spec.prefix, next, spec.pad_width))
}
