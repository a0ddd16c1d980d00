use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("No root member found")]
    NoRoot,

    #[error("Root invariant violated: {0}")]
    RootInvariant(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing family member.
    pub fn member_not_found(id: DbId) -> Self {
        CoreError::NotFound {
            entity: "Member",
            id,
        }
    }
}
