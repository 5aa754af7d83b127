//! Place handlers and place search

use super::{ApiError, ApiResult, Dict};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hbnb_core::{Kind, Place, Storage};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Links change only through the place/amenity routes
const LINKS: &str = "amenity_ids";

pub async fn list(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::City, &city_id).await?;
    Ok(super::dicts(storage.places_of(&city_id).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::show(state.storage.as_ref(), Kind::Place, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Dict)> {
    let storage = state.storage.as_ref();
    super::fetch(storage, Kind::City, &city_id).await?;

    let mut fields = super::json_object(&body)?;
    super::require(&fields, "user_id")?;
    let user_id = fields
        .get("user_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    super::fetch(storage, Kind::User, &user_id).await?;
    super::require(&fields, "name")?;

    fields.remove(LINKS);
    fields.insert("city_id".to_string(), Value::from(city_id));
    super::create(storage, Kind::Place, fields).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Dict> {
    super::update(
        state.storage.as_ref(),
        Kind::Place,
        &id,
        &body,
        &["user_id", "city_id", LINKS],
    )
    .await
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Dict> {
    super::remove(state.storage.as_ref(), Kind::Place, &id).await
}

/// `POST /places_search` body; every list is optional, `null` counts as empty
#[derive(Debug, Default, Deserialize)]
pub struct SearchFilters {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub states: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub amenities: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SearchFilters {
    /// Empty body means no filters
    fn parse(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice(body) {
            Ok(value @ Value::Object(_)) => {
                serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))
            }
            _ => Err(ApiError::not_a_json()),
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let filters = SearchFilters::parse(&body)?;
    let places = find_places(state.storage.as_ref(), &filters).await?;
    Ok(super::dicts(places))
}

/// Places in the listed states and cities (all places when neither is
/// given), narrowed to those with at least one of the listed amenities
pub async fn find_places(storage: &dyn Storage, filters: &SearchFilters) -> ApiResult<Vec<Place>> {
    let mut places = if filters.states.is_empty() && filters.cities.is_empty() {
        storage
            .all(Some(Kind::Place))
            .await?
            .into_values()
            .filter_map(|entity| Place::try_from(entity).ok())
            .collect()
    } else {
        let mut city_ids = Vec::new();
        for state_id in &filters.states {
            for city in storage.cities_of(state_id).await? {
                city_ids.push(city.base.id);
            }
        }
        city_ids.extend(filters.cities.iter().cloned());

        let mut seen = HashSet::new();
        let mut places = Vec::new();
        for city_id in &city_ids {
            for place in storage.places_of(city_id).await? {
                if seen.insert(place.base.id.clone()) {
                    places.push(place);
                }
            }
        }
        places
    };

    if !filters.amenities.is_empty() {
        places.retain(|place| {
            filters
                .amenities
                .iter()
                .any(|amenity_id| place.has_amenity(amenity_id))
        });
    }
    Ok(places)
}
