//! PostgreSQL document adapter: one JSONB table keyed by (collection, id),
//! unique expression indexes per collection, parameterized SQL built from
//! config-trusted paths.

use crate::resource::{Catalog, ResourceSpec};
use crate::store::{
    check_schema, get_path, is_valid_internal_id, new_internal_id, Cond, Document, DocumentStore,
    Filter, SortKey, StoreError, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

/// Schema holding the documents table. Fixed; the deployment owns the database.
const SCHEMA: &str = "stockroom";

fn documents_table() -> String {
    format!("{}.documents", SCHEMA)
}

/// `#>>`/`#>` path literal for a dotted document path. Paths come from the
/// catalog, never from requests.
fn jsonb_path(path: &str) -> String {
    format!("'{{{}}}'", path.split('.').collect::<Vec<_>>().join(","))
}

fn index_name(collection: &str, field: &str) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect()
    };
    format!("uniq_{}_{}", sanitize(collection), sanitize(field))
}

/// Create schema, documents table, and per-collection unique indexes.
/// Idempotent; run at startup before serving.
pub async fn ensure_collections(pool: &PgPool, catalog: &Catalog) -> Result<(), StoreError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", SCHEMA))
        .execute(pool)
        .await?;
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            doc JSONB NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
        documents_table()
    );
    sqlx::query(&ddl).execute(pool).await?;

    for spec in catalog.specs() {
        for field in spec.unique_paths() {
            let idx = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON {table} ((doc #>> {path})) \
                 WHERE collection = '{collection}' AND doc #>> {path} IS NOT NULL",
                name = index_name(&spec.path, &field),
                table = documents_table(),
                path = jsonb_path(&field),
                collection = spec.path,
            );
            tracing::debug!(sql = %idx, "ensure index");
            sqlx::query(&idx).execute(pool).await?;
        }
    }
    Ok(())
}

enum BindParam {
    Text(String),
    Json(Value),
}

struct QueryBuf {
    sql: String,
    params: Vec<BindParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_text(&mut self, s: String) -> usize {
        self.params.push(BindParam::Text(s));
        self.params.len()
    }

    fn push_json(&mut self, v: Value) -> usize {
        self.params.push(BindParam::Json(v));
        self.params.len()
    }
}

/// Escape LIKE/ILIKE metacharacters (backslash is PostgreSQL's default escape).
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn where_clause(q: &mut QueryBuf, spec: &ResourceSpec, filter: &Filter) -> String {
    let collection_param = q.push_text(spec.path.clone());
    let mut parts = vec![format!("collection = ${}", collection_param)];
    for cond in &filter.0 {
        match cond {
            Cond::Eq(path, value) => {
                let part = match value {
                    Value::String(s) => {
                        let n = q.push_text(s.clone());
                        format!("doc #>> {} = ${}", jsonb_path(path), n)
                    }
                    other => {
                        let n = q.push_json(other.clone());
                        format!("doc #> {} = ${}", jsonb_path(path), n)
                    }
                };
                parts.push(part);
            }
            Cond::ContainsCi(path, needle) => {
                let n = q.push_text(format!("%{}%", escape_like(needle)));
                parts.push(format!("doc #>> {} ILIKE ${}", jsonb_path(path), n));
            }
            Cond::Prefix(path, prefix) => {
                let n = q.push_text(format!("{}%", escape_like(prefix)));
                parts.push(format!("doc #>> {} LIKE ${}", jsonb_path(path), n));
            }
            Cond::Gte(path, bound) => parts.push(range_part(q, path, bound, ">=")),
            Cond::Lte(path, bound) => parts.push(range_part(q, path, bound, "<=")),
            Cond::AnyContainsCi(paths, needle) => {
                let n = q.push_text(format!("%{}%", escape_like(needle)));
                let ors: Vec<String> = paths
                    .iter()
                    .map(|p| format!("doc #>> {} ILIKE ${}", jsonb_path(p), n))
                    .collect();
                parts.push(format!("({})", ors.join(" OR ")));
            }
        }
    }
    parts.join(" AND ")
}

fn range_part(q: &mut QueryBuf, path: &str, bound: &Value, op: &str) -> String {
    match bound {
        Value::String(s) => {
            let n = q.push_text(s.clone());
            format!("doc #>> {} {} ${}", jsonb_path(path), op, n)
        }
        other => {
            let n = q.push_json(other.clone());
            format!("doc #> {} {} ${}", jsonb_path(path), op, n)
        }
    }
}

/// Sort on the jsonb value, not its text form, so numeric fields order
/// numerically like the in-memory comparator. Documents missing the key
/// (SQL NULL) sort lowest in either direction, again matching memory.
fn order_clause(sort: &[SortKey]) -> String {
    if sort.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = sort
        .iter()
        .map(|k| {
            format!(
                "doc #> {} {}",
                jsonb_path(&k.field),
                if k.descending {
                    "DESC NULLS LAST"
                } else {
                    "ASC NULLS FIRST"
                }
            )
        })
        .collect();
    format!(" ORDER BY {}", keys.join(", "))
}

pub struct PgStore {
    pool: PgPool,
    /// Unique-index name -> offending document path, for 23505 mapping.
    constraint_fields: HashMap<String, String>,
}

impl PgStore {
    pub fn new(pool: PgPool, catalog: &Catalog) -> Self {
        let mut constraint_fields = HashMap::new();
        for spec in catalog.specs() {
            for field in spec.unique_paths() {
                constraint_fields.insert(index_name(&spec.path, &field), field);
            }
        }
        PgStore {
            pool,
            constraint_fields,
        }
    }

    fn bind_all<'q>(
        mut query: sqlx::query::QueryScalar<'q, sqlx::Postgres, Value, sqlx::postgres::PgArguments>,
        params: &'q [BindParam],
    ) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, Value, sqlx::postgres::PgArguments> {
        for p in params {
            query = match p {
                BindParam::Text(s) => query.bind(s),
                BindParam::Json(v) => query.bind(v),
            };
        }
        query
    }

    async fn fetch_docs(&self, q: &QueryBuf) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, "query");
        let rows = Self::bind_all(sqlx::query_scalar::<_, Value>(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect())
    }

    /// Remap unique-index violations to the typed duplicate-key error.
    fn map_write_error(&self, e: sqlx::Error, doc: &Document) -> StoreError {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                if let Some(field) = db
                    .constraint()
                    .and_then(|c| self.constraint_fields.get(c))
                {
                    let value = get_path(doc, field)
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .unwrap_or_default();
                    return StoreError::DuplicateKey {
                        field: field.clone(),
                        value,
                    };
                }
            }
        }
        StoreError::from(e)
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
impl DocumentStore for PgStore {
    async fn find(
        &self,
        spec: &ResourceSpec,
        filter: &Filter,
        sort: &[SortKey],
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut q = QueryBuf::new();
        let where_sql = where_clause(&mut q, spec, filter);
        let limit_sql = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let offset_sql = if skip > 0 {
            format!(" OFFSET {}", skip)
        } else {
            String::new()
        };
        q.sql = format!(
            "SELECT doc FROM {} WHERE {}{}{}{}",
            documents_table(),
            where_sql,
            order_clause(sort),
            limit_sql,
            offset_sql
        );
        self.fetch_docs(&q).await
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
        let sql = format!(
            "SELECT doc FROM {} WHERE collection = $1 AND id = $2",
            documents_table()
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(&spec.path)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|v| v.as_object().cloned()))
    }

    async fn count(&self, spec: &ResourceSpec, filter: &Filter) -> Result<u64, StoreError> {
        let mut q = QueryBuf::new();
        let where_sql = where_clause(&mut q, spec, filter);
        q.sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            documents_table(),
            where_sql
        );
        tracing::debug!(sql = %q.sql, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = match p {
                BindParam::Text(s) => query.bind(s),
                BindParam::Json(v) => query.bind(v),
            };
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(n as u64)
    }

    async fn insert(&self, spec: &ResourceSpec, mut doc: Document) -> Result<Document, StoreError> {
        let id = new_internal_id();
        let now = chrono::Utc::now().to_rfc3339();
        doc.insert(ID_FIELD.into(), Value::String(id.clone()));
        doc.insert(CREATED_AT_FIELD.into(), Value::String(now.clone()));
        doc.insert(UPDATED_AT_FIELD.into(), Value::String(now));
        check_schema(spec, &doc)?;

        let sql = format!(
            "INSERT INTO {} (collection, id, doc) VALUES ($1, $2, $3)",
            documents_table()
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        sqlx::query(&sql)
            .bind(&spec.path)
            .bind(&id)
            .bind(Value::Object(doc.clone()))
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_write_error(e, &doc))?;
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        spec: &ResourceSpec,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        Self::require_valid_id(spec, id)?;
        let Some(existing) = self.find_by_id(spec, id).await? else {
            return Ok(None);
        };
        let mut updated = existing;
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

        let sql = format!(
            "UPDATE {} SET doc = $3 WHERE collection = $1 AND id = $2",
            documents_table()
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let result = sqlx::query(&sql)
            .bind(&spec.path)
            .bind(id)
            .bind(Value::Object(updated.clone()))
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_write_error(e, &updated))?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, spec: &ResourceSpec, id: &str) -> Result<u64, StoreError> {
        Self::require_valid_id(spec, id)?;
        let sql = format!(
            "DELETE FROM {} WHERE collection = $1 AND id = $2",
            documents_table()
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let result = sqlx::query(&sql)
            .bind(&spec.path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, spec: &ResourceSpec) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE collection = $1", documents_table());
        tracing::debug!(sql = %sql, collection = %spec.path, "query");
        let result = sqlx::query(&sql).bind(&spec.path).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
