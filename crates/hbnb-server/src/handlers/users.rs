//! User handlers

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

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    super::list(state.storage.as_ref(), Kind::User).await
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::show(state.storage.as_ref(), Kind::User, &id).await
}

/// `password` is stored as its digest only
pub async fn create(State(state): State<AppState>, body: Bytes) -> ApiResult<(StatusCode, Dict)> {
    let fields = super::json_object(&body)?;
    super::require(&fields, "email")?;
    super::require(&fields, "password")?;
    super::create(state.storage.as_ref(), Kind::User, fields).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Dict> {
    super::update(state.storage.as_ref(), Kind::User, &id, &body, &["email"]).await
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::remove(state.storage.as_ref(), Kind::User, &id).await
}
