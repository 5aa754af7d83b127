//! Links between places and amenities

use super::{ApiError, ApiResult, Dict};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::{Amenity, Entity, Kind, Place};
use serde_json::{Map, Value};

pub async fn list(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::Place, &place_id).await?;
    Ok(super::dicts(storage.place_amenities(&place_id).await?))
}

/// 200 when the link already existed, 201 when it was created
pub async fn link(
    State(state): State<AppState>,
    Path((place_id, amenity_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Dict)> {
    let storage = state.storage.as_ref();
    let place: Place = super::fetch_as(storage, Kind::Place, &place_id).await?;
    let amenity: Amenity = super::fetch_as(storage, Kind::Amenity, &amenity_id).await?;

    let status = if storage.link_amenity(&place, &amenity_id).await? {
        storage.save().await?;
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(Entity::from(amenity).to_dict())))
}

pub async fn unlink(
    State(state): State<AppState>,
    Path((place_id, amenity_id)): Path<(String, String)>,
) -> ApiResult<Dict> {
    let storage = state.storage.as_ref();
    let place: Place = super::fetch_as(storage, Kind::Place, &place_id).await?;
    super::fetch(storage, Kind::Amenity, &amenity_id).await?;

    if !storage.unlink_amenity(&place, &amenity_id).await? {
        return Err(ApiError::NotFound);
    }
    storage.save().await?;
    Ok(Json(Map::new()))
}
