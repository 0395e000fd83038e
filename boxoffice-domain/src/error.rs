use thiserror::Error;

/// Domain error taxonomy. The HTTP surface maps each kind to a status code;
/// everything unexpected collapses into `Internal` with the detail kept for
/// server-side logs only.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("Event not found with id: {0}")]
    EventNotFound(i64),

    #[error("No tickets available for event with id: {0}")]
    NoTicketsAvailable(i64),

    #[error("Could not acquire reservation lock for: {0}")]
    LockUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Retriable errors are transient contention, not rejection of the
    /// request itself.
    pub fn is_retriable(&self) -> bool {
        matches!(self, DomainError::LockUnavailable(_))
    }
}
