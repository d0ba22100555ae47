use crate::types::DbId;

/// Domain-level error shared by all conveyor crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}
