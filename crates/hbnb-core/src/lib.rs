//! HBnB Core Library
//!
//! Storage port and error types. Backends live with the server; everything
//! that talks to storage depends only on the [`ports::Storage`] trait.

// Re-export the entity model
pub use hbnb_types::*;

pub mod error;
pub mod ports;

pub use error::{StorageError, StorageResult};
pub use ports::Storage;
