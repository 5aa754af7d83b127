//! HBnB Types - entity model
//!
//! Pure data types shared by the storage port and its backends: entity
//! kinds, the common base attributes, the six entity structs and the
//! `Entity` enum with its dict form.

pub mod base;
pub mod entity;
pub mod error;
pub mod kind;
pub mod location;
pub mod place;
pub mod user;

pub use base::BaseModel;
pub use entity::{Entity, CLASS_FIELD, SERVER_FIELDS};
pub use error::ModelError;
pub use kind::Kind;
pub use location::{City, State};
pub use place::{Amenity, Place, Review};
pub use user::{hash_password, User};
