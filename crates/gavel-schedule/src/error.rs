//! Error type for schedule operations.

/// Result type for schedule operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors raised by the classification engine and linkage service.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A referenced schedule, part or offence does not exist. Lookup
    /// failures abort the operation before any write is made.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The NOMIS link/unlink call failed.
    #[error("NOMIS schedule linkage failed: {0}")]
    Linkage(String),
}
