//! Storage trait for persistence
//!
//! One interface over every backend. Entities are addressed by their
//! composite key `"<Kind>.<id>"`; mutations are staged with [`Storage::new`]
//! and [`Storage::delete`] and become durable on [`Storage::save`].
//! [`Storage::close`] ends the unit of work and is called once per request.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use hbnb_types::{Amenity, City, Entity, Kind, Place, Review};
use std::collections::BTreeMap;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Every tracked entity, or only those of `kind`, keyed by composite key
    async fn all(&self, kind: Option<Kind>) -> StorageResult<BTreeMap<String, Entity>>;

    /// `None` when no entity of `kind` has this id
    async fn get(&self, kind: Kind, id: &str) -> StorageResult<Option<Entity>>;

    async fn count(&self, kind: Option<Kind>) -> StorageResult<usize> {
        Ok(self.all(kind).await?.len())
    }

    /// Insert or overwrite under the entity's composite key
    async fn new(&self, entity: Entity) -> StorageResult<()>;

    async fn save(&self) -> StorageResult<()>;

    /// No-op when the entity is not tracked
    async fn delete(&self, entity: &Entity) -> StorageResult<()>;

    async fn reload(&self) -> StorageResult<()>;

    async fn close(&self) -> StorageResult<()>;

    /// Entities of `kind` whose `foreign_key` attribute equals `id`
    async fn related(
        &self,
        kind: Kind,
        foreign_key: &str,
        id: &str,
    ) -> StorageResult<Vec<Entity>> {
        check_relation(kind, foreign_key)?;
        Ok(self
            .all(Some(kind))
            .await?
            .into_values()
            .filter(|entity| entity.foreign_key(foreign_key) == Some(id))
            .collect())
    }

    async fn cities_of(&self, state_id: &str) -> StorageResult<Vec<City>> {
        Ok(typed(self.related(Kind::City, "state_id", state_id).await?))
    }

    async fn places_of(&self, city_id: &str) -> StorageResult<Vec<Place>> {
        Ok(typed(self.related(Kind::Place, "city_id", city_id).await?))
    }

    async fn reviews_of(&self, place_id: &str) -> StorageResult<Vec<Review>> {
        Ok(typed(self.related(Kind::Review, "place_id", place_id).await?))
    }

    /// Amenities linked to a place; links to missing amenities are skipped
    async fn place_amenities(&self, place_id: &str) -> StorageResult<Vec<Amenity>> {
        let place = match self.get(Kind::Place, place_id).await? {
            Some(Entity::Place(place)) => place,
            _ => return Ok(Vec::new()),
        };

        let mut amenities = Vec::with_capacity(place.amenity_ids.len());
        for amenity_id in &place.amenity_ids {
            if let Some(Entity::Amenity(amenity)) = self.get(Kind::Amenity, amenity_id).await? {
                amenities.push(amenity);
            }
        }
        Ok(amenities)
    }

    /// Stage a place→amenity link. Idempotent: returns `false` and stages
    /// nothing when the link already exists.
    async fn link_amenity(&self, place: &Place, amenity_id: &str) -> StorageResult<bool> {
        let mut next = place.clone();
        if !next.link_amenity(amenity_id) {
            return Ok(false);
        }
        next.base.touch();
        self.new(Entity::Place(next)).await?;
        Ok(true)
    }

    /// Stage removal of a link; `false` when there was none
    async fn unlink_amenity(&self, place: &Place, amenity_id: &str) -> StorageResult<bool> {
        let mut next = place.clone();
        if !next.unlink_amenity(amenity_id) {
            return Ok(false);
        }
        next.base.touch();
        self.new(Entity::Place(next)).await?;
        Ok(true)
    }
}

/// Ensure `foreign_key` is one of `kind`'s parent references
pub fn check_relation(kind: Kind, foreign_key: &str) -> StorageResult<()> {
    if kind.foreign_keys().contains(&foreign_key) {
        Ok(())
    } else {
        Err(StorageError::UnknownRelation {
            kind: kind.to_string(),
            field: foreign_key.to_string(),
        })
    }
}

fn typed<T: TryFrom<Entity>>(entities: Vec<Entity>) -> Vec<T> {
    entities
        .into_iter()
        .filter_map(|entity| T::try_from(entity).ok())
        .collect()
}
