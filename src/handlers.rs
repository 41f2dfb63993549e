//! Resource-generic HTTP handlers: resolve the resource from the path
//! segment, validate, delegate to the service, transform the result.

use crate::error::ApiError;
use crate::resource::ResourceSpec;
use crate::response::{created, ok, Envelope};
use crate::service::{ListParams, ResourceService};
use crate::state::AppState;
use crate::transform::{transform, transform_all};
use crate::validate::{validate, validate_search_term, Mode};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

fn resolve<'a>(state: &'a AppState, resource: &str) -> Result<&'a ResourceSpec, ApiError> {
    state
        .catalog
        .by_path(resource)
        .ok_or_else(|| ApiError::not_found("Resource", "path", resource))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(m) => Ok(m),
        other => Err(ApiError::single_violation(
            "body",
            Some(other),
            "request body must be a JSON object".to_string(),
        )),
    }
}

fn title(path: &str) -> String {
    let mut chars = path.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let params = ListParams::from_query(spec, &query);
    let page = ResourceService::list(state.store.as_ref(), spec, &params).await?;
    let message = if page.items.is_empty() {
        format!("No {} found", spec.path)
    } else {
        format!("{} retrieved successfully", title(&spec.path))
    };
    let mut data = Map::new();
    data.insert(
        spec.path.clone(),
        Value::Array(transform_all(spec, &page.items)),
    );
    data.insert(
        "pagination".to_string(),
        serde_json::to_value(&page.pagination).unwrap_or(Value::Null),
    );
    Ok(ok(message, Some(Value::Object(data))))
}

pub async fn search(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let term = validate_search_term(query.get("term").map(String::as_str))?;
    let hits = ResourceService::search(state.store.as_ref(), spec, &term).await?;
    let message = if hits.is_empty() {
        format!("No {} found", spec.path)
    } else {
        format!("{} retrieved successfully", title(&spec.path))
    };
    // No pagination metadata here: search is a capped convenience lookup.
    let mut data = Map::new();
    data.insert(spec.path.clone(), Value::Array(transform_all(spec, &hits)));
    Ok(ok(message, Some(Value::Object(data))))
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let mut body = body_to_map(body)?;
    // The service strips it again; stripping here keeps validation from
    // ever seeing a client-supplied domain id.
    body.remove(&spec.domain_key);
    validate(&body, spec, Mode::Create)?;
    let stored = ResourceService::create(state.store.as_ref(), spec, body).await?;
    let data = transform(spec, Some(&stored)).unwrap_or(Value::Null);
    Ok(created(format!("{} created successfully", spec.entity), data))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let doc = ResourceService::get_by_id(state.store.as_ref(), spec, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(&spec.entity, &spec.id_key, &id))?;
    let data = transform(spec, Some(&doc)).unwrap_or(Value::Null);
    Ok(ok(
        format!("{} retrieved successfully", spec.entity),
        Some(data),
    ))
}

pub async fn get_by_domain_id(
    State(state): State<AppState>,
    Path((resource, key, domain_id)): Path<(String, String, String)>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    if key != spec.domain_key {
        return Err(ApiError::not_found("Resource", "path", &format!("{}/{}", resource, key)));
    }
    let pattern = Regex::new(&spec.domain_id_pattern())
        .map_err(|e| ApiError::Unexpected(Box::new(e)))?;
    if !pattern.is_match(&domain_id) {
        return Err(ApiError::single_violation(
            &spec.domain_key,
            Some(Value::String(domain_id.clone())),
            format!(
                "{} must match the format {}{}",
                spec.domain_key,
                spec.prefix,
                "0".repeat(spec.pad_width)
            ),
        ));
    }
    let doc = ResourceService::get_by_domain_id(state.store.as_ref(), spec, &domain_id)
        .await?
        .ok_or_else(|| ApiError::not_found(&spec.entity, &spec.domain_key, &domain_id))?;
    let data = transform(spec, Some(&doc)).unwrap_or(Value::Null);
    Ok(ok(
        format!("{} retrieved successfully", spec.entity),
        Some(data),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let mut body = body_to_map(body)?;
    body.remove(&spec.domain_key);
    validate(&body, spec, Mode::Update)?;
    let updated = ResourceService::update(state.store.as_ref(), spec, &id, body)
        .await?
        .ok_or_else(|| ApiError::not_found(&spec.entity, &spec.id_key, &id))?;
    let data = transform(spec, Some(&updated)).unwrap_or(Value::Null);
    Ok(ok(
        format!("{} updated successfully", spec.entity),
        Some(data),
    ))
}

pub async fn delete_one(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let deleted = ResourceService::delete(state.store.as_ref(), spec, &id).await?;
    if deleted == 0 {
        return Err(ApiError::not_found(&spec.entity, &spec.id_key, &id));
    }
    Ok(ok(format!("{} deleted successfully", spec.entity), None))
}

pub async fn delete_all(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let spec = resolve(&state, &resource)?;
    let deleted = ResourceService::delete_all(state.store.as_ref(), spec).await?;
    Ok(ok(
        format!("Deleted {} {}", deleted, spec.path),
        Some(json!({ "deletedCount": deleted })),
    ))
}
