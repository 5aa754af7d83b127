//! The closed set of entity kinds and their dict form

use crate::base::BaseModel;
use crate::error::ModelError;
use crate::kind::Kind;
use crate::location::{City, State};
use crate::place::{Amenity, Place, Review};
use crate::user::User;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator attribute carried by every dict form
pub const CLASS_FIELD: &str = "__class__";

/// Attributes a client can never set
pub const SERVER_FIELDS: &[&str] = &["id", "created_at", "updated_at", CLASS_FIELD];

/// Any persisted entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    Amenity(Amenity),
    City(City),
    Place(Place),
    Review(Review),
    State(State),
    User(User),
}

impl Entity {
    /// A new entity of `kind` with default attributes
    pub fn create(kind: Kind) -> Self {
        match kind {
            Kind::Amenity => Entity::Amenity(Amenity::default()),
            Kind::City => Entity::City(City::default()),
            Kind::Place => Entity::Place(Place::default()),
            Kind::Review => Entity::Review(Review::default()),
            Kind::State => Entity::State(State::default()),
            Kind::User => Entity::User(User::default()),
        }
    }

    /// Build a new entity from client-supplied attributes.
    ///
    /// Server-controlled fields in `fields` are ignored and a plaintext
    /// `password` is hashed.
    pub fn from_input(kind: Kind, mut fields: Map<String, Value>) -> Result<Self, ModelError> {
        for key in SERVER_FIELDS {
            fields.remove(*key);
        }
        let password = fields.remove("password");
        fields.insert(CLASS_FIELD.to_string(), Value::from(kind.name()));

        let mut entity = Self::from_dict(fields)?;
        *entity.base_mut() = BaseModel::new();
        if let Some(password) = password {
            entity.assign_password(&password);
        }
        Ok(entity)
    }

    /// Rehydrate a stored dict form; id, timestamps and password digest are
    /// taken verbatim.
    pub fn from_dict(dict: Map<String, Value>) -> Result<Self, ModelError> {
        let class = dict
            .get(CLASS_FIELD)
            .and_then(Value::as_str)
            .ok_or(ModelError::MissingClass)?;
        // Reject unknown kinds with a precise error before serde does
        class.parse::<Kind>()?;
        Ok(serde_json::from_value(Value::Object(dict))?)
    }

    /// Plain key-value form used for JSON responses and persistence
    pub fn to_dict(&self) -> Map<String, Value> {
        // Plain structs of strings and numbers always serialize to an object
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// A complete replacement record with `patch` laid over the current
    /// attributes. `id` and `created_at` are preserved, `updated_at` is
    /// refreshed and a supplied `password` is hashed.
    pub fn merged(&self, mut patch: Map<String, Value>) -> Result<Self, ModelError> {
        let password = patch.remove("password");
        let mut fields = self.to_dict();
        for (key, value) in patch {
            if !SERVER_FIELDS.contains(&key.as_str()) {
                fields.insert(key, value);
            }
        }

        let mut next = Self::from_dict(fields)?;
        if let Some(password) = password {
            next.assign_password(&password);
        }
        next.touch();
        Ok(next)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Entity::Amenity(_) => Kind::Amenity,
            Entity::City(_) => Kind::City,
            Entity::Place(_) => Kind::Place,
            Entity::Review(_) => Kind::Review,
            Entity::State(_) => Kind::State,
            Entity::User(_) => Kind::User,
        }
    }

    pub fn base(&self) -> &BaseModel {
        match self {
            Entity::Amenity(e) => &e.base,
            Entity::City(e) => &e.base,
            Entity::Place(e) => &e.base,
            Entity::Review(e) => &e.base,
            Entity::State(e) => &e.base,
            Entity::User(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseModel {
        match self {
            Entity::Amenity(e) => &mut e.base,
            Entity::City(e) => &mut e.base,
            Entity::Place(e) => &mut e.base,
            Entity::Review(e) => &mut e.base,
            Entity::State(e) => &mut e.base,
            Entity::User(e) => &mut e.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Composite key `"<Kind>.<id>"`
    pub fn key(&self) -> String {
        self.kind().key(self.id())
    }

    pub fn touch(&mut self) {
        self.base_mut().touch();
    }

    /// Value of a foreign-key attribute, `None` if the kind has no such key
    pub fn foreign_key(&self, field: &str) -> Option<&str> {
        match (self, field) {
            (Entity::City(city), "state_id") => Some(&city.state_id),
            (Entity::Place(place), "city_id") => Some(&place.city_id),
            (Entity::Place(place), "user_id") => Some(&place.user_id),
            (Entity::Review(review), "place_id") => Some(&review.place_id),
            (Entity::Review(review), "user_id") => Some(&review.user_id),
            _ => None,
        }
    }

    fn assign_password(&mut self, value: &Value) {
        if let Entity::User(user) = self {
            match value {
                Value::String(plaintext) => user.set_password(plaintext),
                other => user.set_password(&other.to_string()),
            }
        }
    }
}

macro_rules! entity_conversions {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Entity {
                fn from(value: $variant) -> Self {
                    Entity::$variant(value)
                }
            }

            impl TryFrom<Entity> for $variant {
                type Error = Entity;

                fn try_from(entity: Entity) -> Result<Self, Self::Error> {
                    match entity {
                        Entity::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

entity_conversions!(Amenity, City, Place, Review, State, User);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_to_dict_has_discriminator() {
        let state = Entity::from(State::new("California"));
        let dict = state.to_dict();
        assert_eq!(dict["__class__"], "State");
        assert_eq!(dict["name"], "California");
        assert_eq!(dict["id"], state.id());
        assert!(dict["created_at"].is_string());
        assert!(dict["updated_at"].is_string());
    }

    #[test]
    fn test_from_dict_keeps_identity() {
        let dict = object(json!({
            "__class__": "City",
            "id": "c-1",
            "created_at": "2017-03-25T19:42:40.000000",
            "updated_at": "2017-03-25T19:42:41.500000",
            "state_id": "s-1",
            "name": "Fremont",
        }));
        let city = Entity::from_dict(dict.clone()).unwrap();
        assert_eq!(city.kind(), Kind::City);
        assert_eq!(city.key(), "City.c-1");
        assert_eq!(city.foreign_key("state_id"), Some("s-1"));
        assert_eq!(city.to_dict(), dict);
    }

    #[test]
    fn test_from_dict_rejects_unknown_class() {
        let dict = object(json!({"__class__": "BaseModel", "id": "x"}));
        assert!(matches!(Entity::from_dict(dict), Err(ModelError::UnknownKind(_))));

        let dict = object(json!({"id": "x"}));
        assert!(matches!(Entity::from_dict(dict), Err(ModelError::MissingClass)));
    }

    #[test]
    fn test_from_input_ignores_server_fields() {
        let input = object(json!({
            "id": "chosen-by-client",
            "created_at": "2000-01-01T00:00:00.000000",
            "name": "Wifi",
        }));
        let amenity = Entity::from_input(Kind::Amenity, input).unwrap();
        assert_ne!(amenity.id(), "chosen-by-client");
        assert_eq!(amenity.base().created_at, amenity.base().updated_at);
        assert_eq!(amenity.to_dict()["name"], "Wifi");
    }

    #[test]
    fn test_from_input_hashes_password() {
        let input = object(json!({"email": "a@b.com", "password": "pwd"}));
        let user = User::try_from(Entity::from_input(Kind::User, input).unwrap()).unwrap();
        assert!(user.verify_password("pwd"));
        assert_ne!(user.password, "pwd");
    }

    #[test]
    fn test_rehydrated_password_is_not_rehashed() {
        let user = Entity::from(User::new("a@b.com", "pwd"));
        let back = Entity::from_dict(user.to_dict()).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_merged_preserves_identity() {
        let original = Entity::from(User::new("a@b.com", "old"));
        let patch = object(json!({
            "id": "other",
            "created_at": "2000-01-01T00:00:00.000000",
            "first_name": "Betty",
            "password": "new",
        }));
        let merged = original.merged(patch).unwrap();

        assert_eq!(merged.id(), original.id());
        assert_eq!(merged.base().created_at, original.base().created_at);
        assert!(merged.base().updated_at >= original.base().updated_at);

        let user = User::try_from(merged).unwrap();
        assert_eq!(user.first_name, "Betty");
        assert_eq!(user.email, "a@b.com");
        assert!(user.verify_password("new"));
    }

    #[test]
    fn test_merged_keeps_existing_digest() {
        let original = Entity::from(User::new("a@b.com", "pwd"));
        let merged = original.merged(object(json!({"last_name": "Holberton"}))).unwrap();
        let user = User::try_from(merged).unwrap();
        assert!(user.verify_password("pwd"));
    }

    #[test]
    fn test_merged_rejects_bad_types() {
        let place = Entity::from(Place::new("c", "u", "Loft"));
        let patch = object(json!({"number_rooms": "three"}));
        assert!(matches!(place.merged(patch), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn test_place_numbers_round_trip() {
        let mut place = Place::new("c", "u", "Loft");
        place.latitude = 37.77;
        place.number_rooms = 3;
        place.amenity_ids = vec!["a".into(), "b".into()];
        let entity = Entity::from(place);
        assert_eq!(Entity::from_dict(entity.to_dict()).unwrap(), entity);
    }
}
