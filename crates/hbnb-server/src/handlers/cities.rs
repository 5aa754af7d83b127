//! City handlers, nested under their state

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
    Path(state_id): Path<String>,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::State, &state_id).await?;
    Ok(super::dicts(storage.cities_of(&state_id).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::show(state.storage.as_ref(), Kind::City, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(state_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Dict)> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::State, &state_id).await?;

    let mut fields = super::json_object(&body)?;
    super::require(&fields, "name")?;
    fields.insert("state_id".to_string(), Value::from(state_id));
    super::create(storage, Kind::City, fields).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Dict> {
    super::update(state.storage.as_ref(), Kind::City, &id, &body, &["state_id"]).await
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::remove(state.storage.as_ref(), Kind::City, &id).await
}
