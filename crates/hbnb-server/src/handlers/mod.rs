//! HTTP handlers for `/api/v1`
//!
//! Every kind shares the same list/show/create/update/remove flow; the
//! per-kind modules add parent checks and required fields.

pub mod amenities;
pub mod cities;
pub mod index;
pub mod place_amenities;
pub mod places;
pub mod reviews;
pub mod states;
pub mod users;


use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hbnb_core::{Entity, Kind, ModelError, Storage, StorageError};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

/// Attributes a client may never overwrite on update
const IMMUTABLE: &[&str] = &["id", "created_at", "updated_at"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn not_a_json() -> Self {
        ApiError::BadRequest("Not a JSON".to_string())
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            // Validation failures answer with the bare message
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Storage(e) if e.is_constraint() => {
                (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response()
            }
            ApiError::Storage(e) => {
                error!("Storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Dict form response
pub type Dict = Json<Map<String, Value>>;

/// Request body as a non-empty JSON object
pub fn json_object(body: &[u8]) -> ApiResult<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) if !fields.is_empty() => Ok(fields),
        _ => Err(ApiError::not_a_json()),
    }
}

/// `field` must be present and truthy
pub fn require(fields: &Map<String, Value>, field: &str) -> ApiResult<()> {
    if fields.get(field).map_or(false, truthy) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Missing {}", field)))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

pub async fn fetch(storage: &dyn Storage, kind: Kind, id: &str) -> ApiResult<Entity> {
    storage.get(kind, id).await?.ok_or(ApiError::NotFound)
}

/// Like [`fetch`], narrowed to one entity type
pub async fn fetch_as<T: TryFrom<Entity>>(storage: &dyn Storage, kind: Kind, id: &str) -> ApiResult<T> {
    T::try_from(fetch(storage, kind, id).await?).map_err(|_| ApiError::NotFound)
}

pub fn dicts<I>(entities: I) -> Json<Vec<Map<String, Value>>>
where
    I: IntoIterator,
    I::Item: Into<Entity>,
{
    Json(
        entities
            .into_iter()
            .map(|entity| Into::<Entity>::into(entity).to_dict())
            .collect(),
    )
}

pub async fn list(storage: &dyn Storage, kind: Kind) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    Ok(dicts(storage.all(Some(kind)).await?.into_values()))
}

pub async fn show(storage: &dyn Storage, kind: Kind, id: &str) -> ApiResult<Dict> {
    Ok(Json(fetch(storage, kind, id).await?.to_dict()))
}

/// Build, stage and persist a new entity from validated client fields
pub async fn create(
    storage: &dyn Storage,
    kind: Kind,
    fields: Map<String, Value>,
) -> ApiResult<(StatusCode, Dict)> {
    let entity = Entity::from_input(kind, fields)?;
    storage.new(entity.clone()).await?;
    storage.save().await?;
    Ok((StatusCode::CREATED, Json(entity.to_dict())))
}

/// Merge the body over the stored entity, ignoring `immutable` and the
/// server-controlled attributes
pub async fn update(
    storage: &dyn Storage,
    kind: Kind,
    id: &str,
    body: &[u8],
    immutable: &[&str],
) -> ApiResult<Dict> {
    let current = fetch(storage, kind, id).await?;
    let mut patch = json_object(body)?;
    for key in IMMUTABLE.iter().chain(immutable) {
        patch.remove(*key);
    }

    let next = current.merged(patch)?;
    storage.new(next.clone()).await?;
    storage.save().await?;
    Ok(Json(next.to_dict()))
}

pub async fn remove(storage: &dyn Storage, kind: Kind, id: &str) -> ApiResult<Dict> {
    let entity = fetch(storage, kind, id).await?;
    storage.delete(&entity).await?;
    storage.save().await?;
    Ok(Json(Map::new()))
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
