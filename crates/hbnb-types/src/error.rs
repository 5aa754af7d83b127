//! Error types for the entity model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    #[error("Missing class discriminator")]
    MissingClass,

    #[error("Invalid attributes: {0}")]
    Invalid(#[from] serde_json::Error),
}
