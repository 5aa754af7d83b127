//! Review handlers, nested under their place

use super::{ApiResult, Dict};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::Kind;
use serde_json::{Map, Value};

pub async fn list(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::Place, &place_id).await?;
    Ok(super::dicts(storage.reviews_of(&place_id).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::show(state.storage.as_ref(), Kind::Review, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Dict)> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::Place, &place_id).await?;

    let mut fields = super::json_object(&body)?;
    super::require(&fields, "user_id")?;
    let user_id = fields
        .get("user_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    super::fetch(storage, Kind::User, &user_id).await?;
    super::require(&fields, "text")?;

    fields.insert("place_id".to_string(), Value::from(place_id));
    super::create(storage, Kind::Review, fields).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Dict> {
    super::update(
        state.storage.as_ref(),
        Kind::Review,
        &id,
        &body,
        &["user_id", "place_id"],
    )
    .await
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::remove(state.storage.as_ref(), Kind::Review, &id).await
}
