//! Entity kinds

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The six persisted entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Amenity,
    City,
    Place,
    Review,
    State,
    User,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Amenity,
        Kind::City,
        Kind::Place,
        Kind::Review,
        Kind::State,
        Kind::User,
    ];

    /// Class name, used as the `__class__` discriminator and in composite keys
    pub fn name(self) -> &'static str {
        match self {
            Kind::Amenity => "Amenity",
            Kind::City => "City",
            Kind::Place => "Place",
            Kind::Review => "Review",
            Kind::State => "State",
            Kind::User => "User",
        }
    }

    /// Plural form, shared by table names and route segments
    pub fn plural(self) -> &'static str {
        match self {
            Kind::Amenity => "amenities",
            Kind::City => "cities",
            Kind::Place => "places",
            Kind::Review => "reviews",
            Kind::State => "states",
            Kind::User => "users",
        }
    }

    /// Attributes holding the id of a parent entity
    pub fn foreign_keys(self) -> &'static [&'static str] {
        match self {
            Kind::City => &["state_id"],
            Kind::Place => &["city_id", "user_id"],
            Kind::Review => &["place_id", "user_id"],
            Kind::Amenity | Kind::State | Kind::User => &[],
        }
    }

    /// Composite key `"<Kind>.<id>"`
    pub fn key(self, id: &str) -> String {
        format!("{}.{}", self.name(), id)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        for kind in Kind::ALL {
            assert_eq!(kind.name().parse::<Kind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
        assert!(matches!(
            "BaseModel".parse::<Kind>(),
            Err(ModelError::UnknownKind(name)) if name == "BaseModel"
        ));
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(Kind::State.key("abc"), "State.abc");
        assert_eq!(Kind::Amenity.plural(), "amenities");
    }
}
