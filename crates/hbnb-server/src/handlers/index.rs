//! Service status and per-kind counts

use super::ApiResult;
use crate::AppState;
use axum::{extract::State, Json};
use hbnb_core::Kind;
use serde_json::{json, Map, Value};

pub async fn status() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Map<String, Value>>> {
    let mut counts = Map::new();
    for kind in Kind::ALL {
        let count = state.storage.count(Some(kind)).await?;
        counts.insert(kind.plural().to_string(), Value::from(count));
    }
    Ok(Json(counts))
}
