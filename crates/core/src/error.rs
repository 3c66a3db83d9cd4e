use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Draw configuration not found: {0}")]
    ConfigNotFound(String),

    #[error("Draw configuration '{0}' has no drawable weight")]
    EmptyConfiguration(String),

    #[error("Cannot derive resource key from asset path '{path}': {reason}")]
    InvalidResourceKey { path: String, reason: &'static str },

    #[error("Internal error: {0}")]
    Internal(String),
}
