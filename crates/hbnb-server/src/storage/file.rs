//! JSON file backend
//!
//! Every tracked entity lives in a `DashMap` keyed by composite key
//! (`"State.<id>"`). `save` rewrites the whole document; `reload` merges the
//! document back into the map.

use async_trait::async_trait;
use dashmap::DashMap;
use hbnb_core::{Entity, Kind, Storage, StorageError, StorageResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stored document: composite key → dict form
type Document = BTreeMap<String, Map<String, Value>>;

pub struct FileStorage {
    path: PathBuf,
    objects: DashMap<String, Entity>,
}

impl FileStorage {
    /// Empty storage bound to `path`; nothing is read until `reload`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: DashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(&self) -> Document {
        self.objects
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().to_dict()))
            .collect()
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn all(&self, kind: Option<Kind>) -> StorageResult<BTreeMap<String, Entity>> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| kind.map_or(true, |kind| entry.value().kind() == kind))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn get(&self, kind: Kind, id: &str) -> StorageResult<Option<Entity>> {
        Ok(self
            .objects
            .get(&kind.key(id))
            .map(|entry| entry.value().clone()))
    }

    async fn count(&self, kind: Option<Kind>) -> StorageResult<usize> {
        Ok(match kind {
            None => self.objects.len(),
            Some(kind) => self
                .objects
                .iter()
                .filter(|entry| entry.value().kind() == kind)
                .count(),
        })
    }

    async fn new(&self, entity: Entity) -> StorageResult<()> {
        self.objects.insert(entity.key(), entity);
        Ok(())
    }

    async fn save(&self) -> StorageResult<()> {
        let document = self.document();
        let bytes = serde_json::to_vec(&document)?;
        tokio::fs::write(&self.path, bytes).await?;
        debug!(
            "Saved {} objects to {}",
            document.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn delete(&self, entity: &Entity) -> StorageResult<()> {
        self.objects.remove(&entity.key());
        Ok(())
    }

    async fn reload(&self) -> StorageResult<()> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No storage document at {}", self.path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let document: Document = serde_json::from_slice(&content).map_err(|e| {
            StorageError::Corrupt(format!("{}: {}", self.path.display(), e))
        })?;

        // Nothing is merged unless the whole document loads
        let mut entities = Vec::with_capacity(document.len());
        for (key, dict) in document {
            let entity = Entity::from_dict(dict)?;
            if entity.key() != key {
                return Err(StorageError::Corrupt(format!(
                    "stored key {} does not match entity {}",
                    key,
                    entity.key()
                )));
            }
            entities.push((key, entity));
        }

        let loaded = entities.len();
        for (key, entity) in entities {
            self.objects.insert(key, entity);
        }

        info!("Loaded {} objects from {}", loaded, self.path.display());
        Ok(())
    }

    /// Re-synchronize with the document on disk
    async fn close(&self) -> StorageResult<()> {
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbnb_core::{Amenity, City, Place, Review, State, User};
    use tempfile::TempDir;

    fn storage() -> (FileStorage, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("file.json"));
        (storage, dir)
    }

    fn sample() -> Vec<Entity> {
        let state = State::new("California");
        let city = City::new(&state.base.id, "San Francisco");
        let user = User::new("betty@example.com", "pwd");
        let mut place = Place::new(&city.base.id, &user.base.id, "Loft");
        place.latitude = 37.773972;
        place.price_by_night = 120;
        let wifi = Amenity::new("Wifi");
        place.link_amenity(&wifi.base.id);
        let review = Review::new(&place.base.id, &user.base.id, "Great");
        vec![
            state.into(),
            city.into(),
            user.into(),
            place.into(),
            wifi.into(),
            review.into(),
        ]
    }

    #[tokio::test]
    async fn test_reload_missing_file() {
        let (storage, _dir) = storage();
        storage.reload().await.unwrap();
        assert_eq!(storage.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_after_save() {
        let (storage, _dir) = storage();
        for entity in sample() {
            storage.new(entity.clone()).await.unwrap();
            storage.save().await.unwrap();
            let found = storage.get(entity.kind(), entity.id()).await.unwrap().unwrap();
            assert_eq!(found.to_dict(), entity.to_dict());
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let (storage, dir) = storage();
        let entities = sample();
        for entity in &entities {
            storage.new(entity.clone()).await.unwrap();
        }
        storage.save().await.unwrap();

        let fresh = FileStorage::new(dir.path().join("file.json"));
        fresh.reload().await.unwrap();
        assert_eq!(fresh.count(None).await.unwrap(), entities.len());
        for entity in &entities {
            let loaded = fresh.get(entity.kind(), entity.id()).await.unwrap().unwrap();
            assert_eq!(loaded.to_dict(), entity.to_dict());
        }
    }

    #[tokio::test]
    async fn test_document_layout() {
        let (storage, _dir) = storage();
        let state = State::new("Nevada");
        storage.new(state.clone().into()).await.unwrap();
        storage.save().await.unwrap();

        let raw = std::fs::read_to_string(storage.path()).unwrap();
        let document: Value = serde_json::from_str(&raw).unwrap();
        let entry = &document[format!("State.{}", state.base.id)];
        assert_eq!(entry["__class__"], "State");
        assert_eq!(entry["name"], "Nevada");
        assert_eq!(entry["id"], state.base.id.as_str());
    }

    #[tokio::test]
    async fn test_count_matches_all() {
        let (storage, _dir) = storage();
        for entity in sample() {
            storage.new(entity).await.unwrap();
        }
        assert_eq!(
            storage.count(None).await.unwrap(),
            storage.all(None).await.unwrap().len()
        );
        for kind in Kind::ALL {
            let all = storage.all(Some(kind)).await.unwrap();
            assert_eq!(storage.count(Some(kind)).await.unwrap(), all.len());
            assert!(all.values().all(|entity| entity.kind() == kind));
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let (storage, _dir) = storage();
        let amenity = Entity::from(Amenity::new("Pool"));
        storage.new(amenity.clone()).await.unwrap();
        storage.delete(&amenity).await.unwrap();
        assert!(storage.get(Kind::Amenity, amenity.id()).await.unwrap().is_none());

        // Deleting again is a no-op
        storage.delete(&amenity).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_restores_unsaved_delete() {
        let (storage, _dir) = storage();
        let state = Entity::from(State::new("Oregon"));
        storage.new(state.clone()).await.unwrap();
        storage.save().await.unwrap();

        storage.delete(&state).await.unwrap();
        storage.close().await.unwrap();
        assert!(storage.get(Kind::State, state.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_orphans_stay_addressable() {
        let (storage, _dir) = storage();
        let state = State::new("Utah");
        let city = City::new(&state.base.id, "Provo");
        storage.new(state.clone().into()).await.unwrap();
        storage.new(city.clone().into()).await.unwrap();
        storage.delete(&state.into()).await.unwrap();
        storage.save().await.unwrap();

        assert!(storage.get(Kind::City, &city.base.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_truncated_document_is_an_error() {
        let (storage, _dir) = storage();
        std::fs::write(storage.path(), br#"{"State.1": {"__class__": "St"#).unwrap();
        let err = storage.reload().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_misfiled_entity_is_an_error() {
        let (storage, _dir) = storage();
        let state = Entity::from(State::new("Ohio"));
        let document = serde_json::json!({ "State.elsewhere": state.to_dict() });
        std::fs::write(storage.path(), document.to_string()).unwrap();

        let err = storage.reload().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)), "got {:?}", err);
        assert_eq!(storage.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_class_is_an_error() {
        let (storage, _dir) = storage();
        std::fs::write(
            storage.path(),
            br#"{"BaseModel.1": {"__class__": "BaseModel", "id": "1"}}"#,
        )
        .unwrap();
        assert!(matches!(
            storage.reload().await,
            Err(StorageError::Model(_))
        ));
    }

    #[tokio::test]
    async fn test_password_digest_survives_reload() {
        let (storage, dir) = storage();
        let user = User::new("a@b.com", "pwd");
        storage.new(user.clone().into()).await.unwrap();
        storage.save().await.unwrap();

        let fresh = FileStorage::new(dir.path().join("file.json"));
        fresh.reload().await.unwrap();
        match fresh.get(Kind::User, &user.base.id).await.unwrap() {
            Some(Entity::User(loaded)) => {
                assert_eq!(loaded.password, user.password);
                assert!(loaded.verify_password("pwd"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
