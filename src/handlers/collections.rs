// src/handlers/collections.rs

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::AppError,
    schema::{BsonType, CollectionName, CollectionSchema, ID_FIELD},
    store::DocumentStore,
};

const DEFAULT_LIMIT: usize = 100;

/// Lists every collection with its validator, indexes and document count.
pub async fn list_collections(
    State(store): State<Arc<DocumentStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.describe().await))
}

/// Lists documents of a collection.
///
/// Query parameters are equality filters on (dotted) field paths, typed by
/// the collection's validator. `limit` caps the result; `index` returns the
/// collection in the order of the named index instead.
pub async fn list_documents(
    State(store): State<Arc<DocumentStore>>,
    Path(name): Path<String>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let name: CollectionName = name.parse()?;

    let limit = match params.remove("limit") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::BadRequest(format!("Invalid limit '{}'", raw)))?,
        None => DEFAULT_LIMIT,
    };

    if let Some(index) = params.remove("index") {
        if !params.is_empty() {
            return Err(AppError::BadRequest(
                "'index' cannot be combined with field filters".to_string(),
            ));
        }
        return Ok(Json(store.scan(name, &index, Some(limit)).await?));
    }

    let schema = name.schema();
    let mut filter = Vec::with_capacity(params.len());
    for (path, raw) in params {
        let value = filter_value(schema, &path, &raw)?;
        filter.push((path, value));
    }
    filter.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(Json(store.find(name, &filter, Some(limit)).await?))
}

pub async fn get_document(
    State(store): State<Arc<DocumentStore>>,
    Path((name, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let name: CollectionName = name.parse()?;
    Ok(Json(store.get(name, &id).await?))
}

/// Inserts one document (JSON object) or a batch (JSON array).
/// A batch is all-or-nothing.
pub async fn create_documents(
    State(store): State<Arc<DocumentStore>>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let name: CollectionName = name.parse()?;

    let documents = match body {
        Value::Array(documents) if documents.is_empty() => {
            return Err(AppError::BadRequest("No documents submitted".to_string()));
        }
        Value::Array(documents) => documents,
        other => vec![other],
    };

    let ids = store.insert_many(name, documents).await?;

    Ok((StatusCode::CREATED, Json(json!({ "insertedIds": ids }))))
}

pub async fn replace_document(
    State(store): State<Arc<DocumentStore>>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let name: CollectionName = name.parse()?;

    if let Some(body_id) = body.get(ID_FIELD).and_then(Value::as_str) {
        if body_id != id {
            return Err(AppError::BadRequest("Document id cannot be changed".to_string()));
        }
    }

    Ok(Json(store.replace(name, &id, body).await?))
}

pub async fn delete_document(
    State(store): State<Arc<DocumentStore>>,
    Path((name, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let name: CollectionName = name.parse()?;
    store.delete(name, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

/// Full-text search, best matches first.
pub async fn search_documents(
    State(store): State<Arc<DocumentStore>>,
    Path(name): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let name: CollectionName = name.parse()?;

    if query.q.trim().is_empty() {
        return Err(AppError::BadRequest("Search query cannot be empty".to_string()));
    }

    let hits = store
        .search(name, &query.q, Some(query.limit.unwrap_or(DEFAULT_LIMIT)))
        .await?;
    Ok(Json(hits))
}

/// Converts a query-string value to the JSON type declared for `path`.
fn filter_value(schema: &CollectionSchema, path: &str, raw: &str) -> Result<Value, AppError> {
    if path == ID_FIELD {
        return Ok(Value::String(raw.to_string()));
    }

    let Some(field) = schema.field(path) else {
        return inside_opaque_object(schema, path)
            .then(|| guess_value(raw))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown field '{}'", path)));
    };
    // Filters on arrays match their elements.
    let bson_type = match (field.bson_type, field.items) {
        (BsonType::Array, Some(items)) => items.bson_type,
        (other, _) => other,
    };

    match bson_type {
        BsonType::Long | BsonType::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::BadRequest(format!("'{}' expects an integer", path))),
        BsonType::Bool => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| AppError::BadRequest(format!("'{}' expects true or false", path))),
        BsonType::Object | BsonType::Array => Err(AppError::BadRequest(format!(
            "'{}' cannot be filtered by equality",
            path
        ))),
        BsonType::String | BsonType::Date => Ok(Value::String(raw.to_string())),
    }
}

/// Whether `path` points into an object field without declared properties,
/// such as `metadata.tags`.
fn inside_opaque_object(schema: &CollectionSchema, path: &str) -> bool {
    path.split_once('.')
        .and_then(|(root, _)| schema.field(root))
        .is_some_and(|f| f.bson_type == BsonType::Object && f.properties.is_empty())
}

fn guess_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
