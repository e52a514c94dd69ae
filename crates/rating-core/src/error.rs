//! Error types for the rating model

use rating_types::EntityKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RatingError>;

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: i64 },

    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RatingError {
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        RatingError::NotFound { entity, id }
    }
}

impl From<serde_json::Error> for RatingError {
    fn from(e: serde_json::Error) -> Self {
        RatingError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for RatingError {
    fn from(e: serde_yaml::Error) -> Self {
        RatingError::Serialization(e.to_string())
    }
}
