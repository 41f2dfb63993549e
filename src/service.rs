//! Generic CRUD execution for one resource. Services never catch storage
//! errors; handlers own the reclassification.

use crate::allocator;
use crate::resource::{FilterKind, ResourceSpec};
use crate::response::Pagination;
use crate::store::{
    Cond, Document, DocumentStore, Filter, SortKey, StoreError, ID_FIELD,
};
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;
/// `search` is capped and unpaginated, unlike `list`.
const SEARCH_LIMIT: u64 = 20;

#[derive(Clone, Debug)]
pub struct ListParams {
    pub page: u64,
    pub limit: u64,
    pub sort: Vec<SortKey>,
    pub filter: Filter,
}

impl ListParams {
    /// Build from raw query params: recognized filter keys become storage
    /// conditions; `page`/`limit` fall back to defaults when absent or
    /// unparseable; `sort` is a comma-separated field list, leading `-` for
    /// descending.
    pub fn from_query(spec: &ResourceSpec, query: &HashMap<String, String>) -> Self {
        let page = parse_positive(query.get("page")).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(query.get("limit")).unwrap_or(DEFAULT_LIMIT);
        let sort = query
            .get("sort")
            .map(|s| parse_sort(s))
            .filter(|keys| !keys.is_empty())
            .unwrap_or_else(|| parse_sort(&spec.default_sort));

        let mut filter = Filter::all();
        for (key, kind) in &spec.filters {
            let Some(raw) = query.get(key) else { continue };
            if raw.is_empty() {
                continue;
            }
            let cond = match kind {
                FilterKind::Contains(path) => Cond::ContainsCi(path.clone(), raw.clone()),
                FilterKind::Exact(path) => Cond::Eq(path.clone(), Value::String(raw.clone())),
                FilterKind::DateFrom(path) => Cond::Gte(path.clone(), Value::String(raw.clone())),
                FilterKind::DateTo(path) => Cond::Lte(path.clone(), Value::String(raw.clone())),
            };
            filter = filter.and(cond);
        }
        ListParams {
            page,
            limit,
            sort,
            filter,
        }
    }
}

fn parse_positive(raw: Option<&String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n > 0)
}

/// "name,-createdAt" -> ascending name, then descending createdAt.
pub fn parse_sort(expr: &str) -> Vec<SortKey> {
    expr.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                descending: true,
            },
            None => SortKey {
                field: s.to_string(),
                descending: false,
            },
        })
        .collect()
}

pub struct Page {
    pub items: Vec<Document>,
    pub pagination: Pagination,
}

pub struct ResourceService;

impl ResourceService {
    pub async fn list(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        params: &ListParams,
    ) -> Result<Page, StoreError> {
        let total = store.count(spec, &params.filter).await?;
        // page/limit are client-controlled; saturate instead of overflowing.
        let total_pages = total.div_ceil(params.limit);
        let skip = params.page.saturating_sub(1).saturating_mul(params.limit);
        let items = store
            .find(spec, &params.filter, &params.sort, skip, Some(params.limit))
            .await?;
        Ok(Page {
            items,
            pagination: Pagination {
                total,
                page: params.page,
                limit: params.limit,
                total_pages,
            },
        })
    }

    pub async fn get_by_id(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        store.find_by_id(spec, id).await
    }

    pub async fn get_by_domain_id(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        domain_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let filter = Filter::all().and(Cond::Eq(
            spec.domain_key.clone(),
            Value::String(domain_id.to_string()),
        ));
        store.find_one(spec, &filter, &[]).await
    }

    /// Create: any client-supplied domain id is discarded, the next
    /// sequential one is allocated, and the document is persisted. A
    /// concurrent create racing for the same id loses at the unique index
    /// and surfaces as a duplicate-key conflict.
    pub async fn create(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        mut body: Document,
    ) -> Result<Document, StoreError> {
        strip_reserved(spec, &mut body);
        spec.normalize(&mut body);
        if let Some(default) = &spec.default_status {
            body.entry("status".to_string())
                .or_insert_with(|| Value::String(default.clone()));
        }
        let domain_id = allocator::allocate(store, spec).await?;
        body.insert(spec.domain_key.clone(), Value::String(domain_id));
        store.insert(spec, body).await
    }

    /// Partial update; the domain id is immutable and always stripped.
    pub async fn update(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        id: &str,
        mut body: Document,
    ) -> Result<Option<Document>, StoreError> {
        strip_reserved(spec, &mut body);
        spec.normalize(&mut body);
        store.update_by_id(spec, id, body).await
    }

    pub async fn delete(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        id: &str,
    ) -> Result<u64, StoreError> {
        store.delete_by_id(spec, id).await
    }

    pub async fn delete_all(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
    ) -> Result<u64, StoreError> {
        store.delete_all(spec).await
    }

    /// Case-insensitive substring search over the configured fields,
    /// capped at 20 results, no pagination metadata.
    pub async fn search(
        store: &dyn DocumentStore,
        spec: &ResourceSpec,
        term: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = Filter::all().and(Cond::AnyContainsCi(
            spec.search_fields.clone(),
            term.to_string(),
        ));
        store
            .find(spec, &filter, &parse_sort(&spec.default_sort), 0, Some(SEARCH_LIMIT))
            .await
    }
}

/// Remove fields the client must never set directly: the internal id, the
/// domain id, and request-only virtual fields.
fn strip_reserved(spec: &ResourceSpec, body: &mut Document) {
    body.remove(ID_FIELD);
    body.remove(&spec.domain_key);
    for field in &spec.virtual_fields {
        body.remove(field);
    }
}
