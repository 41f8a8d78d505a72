use thiserror::Error;
use uuid::Uuid;
use warp::reject;

/// Enumerates high-level errors returned by this service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a contact email that does not look like an email address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Represents a path ID that could not be parsed as a UUID.
    #[error("invalid ID: {0}")]
    InvalidId(String),

    /// Represents an ID with no corresponding item in the store.
    #[error("no item with ID {0}")]
    NonExistentId(Uuid),

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },
}

impl reject::Reject for BackendError {}
