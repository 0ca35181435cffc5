//! Domain error taxonomy shared by every ShotForge crate.
//!
//! Handlers convert these into HTTP responses in the API crate; library
//! code only ever constructs and propagates them.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A row lookup by primary key came back empty.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Caller-supplied data failed a domain rule (maps to 400).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request contradicts existing state (maps to 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unexpected internal failure; the message is logged, not echoed.
    #[error("Internal error: {0}")]
    Internal(String),
}
