//! In-memory document store. Backs the test suite and local experiments;
//! enforces the same schema and unique-index semantics as the PostgreSQL adapter.

use crate::resource::ResourceSpec;
use crate::store::{
    check_schema, cmp_values, get_path, is_valid_internal_id, matches, new_internal_id, Document,
    DocumentStore, Filter, SortKey, StoreError, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn sorted(mut docs: Vec<Document>, sort: &[SortKey]) -> Vec<Document> {
        docs.sort_by(|a, b| {
            for key in sort {
                let av = get_path(a, &key.field).unwrap_or(&Value::Null);
                let bv = get_path(b, &key.field).unwrap_or(&Value::Null);
                let ord = cmp_values(av, bv);
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
        docs
    }

    fn check_unique(
        collection: &BTreeMap<String, Document>,
        spec: &ResourceSpec,
        doc: &Document,
        exclude_id: Option<&str>,
    ) -> Result<(), StoreError> {
        for path in spec.unique_paths() {
            let Some(value) = get_path(doc, &path) else { continue };
            if value.is_null() {
                continue;
            }
            let taken = collection.iter().any(|(id, other)| {
                exclude_id != Some(id.as_str()) && get_path(other, &path) == Some(value)
            });
            if taken {
                return Err(StoreError::DuplicateKey {
                    field: path,
                    value: value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
                });
            }
        }
        Ok(())
    }

    fn require_valid_id(spec: &ResourceSpec, id: &str) -> Result<(), StoreError> {
        if is_valid_internal_id(id) {
            Ok(())
        } else {
            Err(StoreError::InvalidId {
                field: spec.id_key.clone(),
                value: id.to_string(),
            })
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        spec: &ResourceSpec,
        filter: &Filter,
        sort: &[SortKey],
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let docs: Vec<Document> = collections
            .get(&spec.path)
            .map(|c| c.values().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default();
        let sorted = Self::sorted(docs, sort);
        let iter = sorted.into_iter().skip(skip as usize);
        Ok(match limit {
            Some(n) => iter.take(n as usize).collect(),
            None => iter.collect(),
        })
    }

    async fn find_one(
        &self,
        spec: &ResourceSpec,
        filter: &Filter,
        sort: &[SortKey],
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.find(spec, filter, sort, 0, Some(1)).await?.into_iter().next())
    }

    async fn find_by_id(
        &self,
        spec: &ResourceSpec,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Self::require_valid_id(spec, id)?;
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(&spec.path).and_then(|c| c.get(id)).cloned())
    }

    async fn count(&self, spec: &ResourceSpec, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(&spec.path)
            .map(|c| c.values().filter(|d| matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, spec: &ResourceSpec, mut doc: Document) -> Result<Document, StoreError> {
        let id = new_internal_id();
        let now = chrono::Utc::now().to_rfc3339();
        doc.insert(ID_FIELD.into(), Value::String(id.clone()));
        doc.insert(CREATED_AT_FIELD.into(), Value::String(now.clone()));
        doc.insert(UPDATED_AT_FIELD.into(), Value::String(now));
        check_schema(spec, &doc)?;

        let mut collections = self.collections.lock().unwrap();
        let collection = collections.entry(spec.path.clone()).or_default();
        Self::check_unique(collection, spec, &doc, None)?;
        collection.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        spec: &ResourceSpec,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        Self::require_valid_id(spec, id)?;
        let mut collections = self.collections.lock().unwrap();
        let Some(collection) = collections.get_mut(&spec.path) else {
            return Ok(None);
        };
        let Some(existing) = collection.get(id) else {
            return Ok(None);
        };

        let mut updated = existing.clone();
        for (k, v) in patch {
            if k == ID_FIELD || k == CREATED_AT_FIELD {
                continue;
            }
            updated.insert(k, v);
        }
        updated.insert(
            UPDATED_AT_FIELD.into(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        check_schema(spec, &updated)?;
        Self::check_unique(collection, spec, &updated, Some(id))?;
        collection.insert(id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, spec: &ResourceSpec, id: &str) -> Result<u64, StoreError> {
        Self::require_valid_id(spec, id)?;
        let mut collections = self.collections.lock().unwrap();
        Ok(collections
            .get_mut(&spec.path)
            .and_then(|c| c.remove(id))
            .map(|_| 1)
            .unwrap_or(0))
    }

    async fn delete_all(&self, spec: &ResourceSpec) -> Result<u64, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        Ok(collections
            .get_mut(&spec.path)
            .map(|c| {
                let n = c.len() as u64;
                c.clear();
                n
            })
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Catalog;
    use crate::store::Cond;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    fn suppliers() -> (MemoryStore, ResourceSpec) {
        let catalog = Catalog::builtin();
        (MemoryStore::new(), catalog.by_path("suppliers").unwrap().clone())
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let (store, spec) = suppliers();
        let stored = store
            .insert(&spec, doc(json!({"name": "Acme", "supplierID": "SP-00001"})))
            .await
            .unwrap();
        let id = stored[ID_FIELD].as_str().unwrap();
        assert!(is_valid_internal_id(id));
        assert!(stored.contains_key(CREATED_AT_FIELD));
        assert!(stored.contains_key(UPDATED_AT_FIELD));
        let found = store.find_by_id(&spec, id).await.unwrap().unwrap();
        assert_eq!(found["name"], json!("Acme"));
    }

    #[tokio::test]
    async fn malformed_id_is_an_invalid_id_error() {
        let (store, spec) = suppliers();
        let err = store.find_by_id(&spec, "not-hex").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { .. }));
        let err = store.delete_by_id(&spec, "abc").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { .. }));
    }

    #[tokio::test]
    async fn duplicate_domain_id_rejected() {
        let (store, spec) = suppliers();
        store
            .insert(&spec, doc(json!({"name": "A", "supplierID": "SP-00001"})))
            .await
            .unwrap();
        let err = store
            .insert(&spec, doc(json!({"name": "B", "supplierID": "SP-00001"})))
            .await
            .unwrap_err();
        match err {
            StoreError::DuplicateKey { field, value } => {
                assert_eq!(field, "supplierID");
                assert_eq!(value, "SP-00001");
            }
            other => panic!("expected duplicate key, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_email_rejected_but_missing_email_is_fine() {
        let (store, spec) = suppliers();
        store
            .insert(
                &spec,
                doc(json!({"name": "A", "supplierID": "SP-00001", "contact": {"email": "a@x.com"}})),
            )
            .await
            .unwrap();
        // No email at all: the partial unique index does not apply.
        store
            .insert(&spec, doc(json!({"name": "B", "supplierID": "SP-00002"})))
            .await
            .unwrap();
        let err = store
            .insert(
                &spec,
                doc(json!({"name": "C", "supplierID": "SP-00003", "contact": {"email": "a@x.com"}})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref field, .. } if field == "contact.email"));
    }

    #[tokio::test]
    async fn update_merges_top_level_and_preserves_created_at() {
        let (store, spec) = suppliers();
        let stored = store
            .insert(&spec, doc(json!({"name": "Acme", "supplierID": "SP-00001"})))
            .await
            .unwrap();
        let id = stored[ID_FIELD].as_str().unwrap().to_string();
        let created_at = stored[CREATED_AT_FIELD].clone();

        let updated = store
            .update_by_id(&spec, &id, doc(json!({"name": "Acme Ltd", "createdAt": "1970-01-01"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("Acme Ltd"));
        assert_eq!(updated[CREATED_AT_FIELD], created_at);
        assert_eq!(updated["supplierID"], json!("SP-00001"));
    }

    #[tokio::test]
    async fn update_reruns_schema_validators() {
        let (store, spec) = suppliers();
        let stored = store
            .insert(&spec, doc(json!({"name": "Acme", "supplierID": "SP-00001"})))
            .await
            .unwrap();
        let id = stored[ID_FIELD].as_str().unwrap().to_string();
        let err = store
            .update_by_id(&spec, &id, doc(json!({"status": "NotAStatus"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Schema { ref field, .. } if field == "status"));
    }

    #[tokio::test]
    async fn find_sorts_and_paginates() {
        let (store, spec) = suppliers();
        for (i, name) in ["Charlie", "Alpha", "Bravo"].iter().enumerate() {
            store
                .insert(
                    &spec,
                    doc(json!({"name": name, "supplierID": format!("SP-0000{}", i + 1)})),
                )
                .await
                .unwrap();
        }
        let sort = [SortKey {
            field: "name".into(),
            descending: false,
        }];
        let page = store
            .find(&spec, &Filter::all(), &sort, 1, Some(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], json!("Bravo"));

        let desc = [SortKey {
            field: "name".into(),
            descending: true,
        }];
        let first = store.find_one(&spec, &Filter::all(), &desc).await.unwrap().unwrap();
        assert_eq!(first["name"], json!("Charlie"));
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let (store, spec) = suppliers();
        for i in 1..=3 {
            store
                .insert(&spec, doc(json!({"name": "S", "supplierID": format!("SP-0000{}", i)})))
                .await
                .unwrap();
        }
        assert_eq!(store.delete_all(&spec).await.unwrap(), 3);
        assert_eq!(store.count(&spec, &Filter::all()).await.unwrap(), 0);
        assert_eq!(store.delete_all(&spec).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn filters_scope_results() {
        let (store, spec) = suppliers();
        store
            .insert(&spec, doc(json!({"name": "A", "supplierID": "SP-00001", "status": "Active"})))
            .await
            .unwrap();
        store
            .insert(&spec, doc(json!({"name": "B", "supplierID": "SP-00002", "status": "Blocked"})))
            .await
            .unwrap();
        let filter = Filter::all().and(Cond::Eq("status".into(), json!("Blocked")));
        let rows = store.find(&spec, &filter, &[], 0, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("B"));
    }
}
