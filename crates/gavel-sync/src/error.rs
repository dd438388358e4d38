//! Error taxonomy for the synchronisation engines.
//!
//! External-call failures abort the current shard or partition batch and
//! are recorded against its load/sync result; the dirty queue and sync
//! flags are left untouched so the next scheduled run retries. Data-shape
//! errors are per-record: the offending record is skipped and logged.

/// Result type for synchronisation operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the reconciler, synchroniser and their clients.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The target system or reference source was unreachable or answered
    /// outside 2xx.
    #[error("{system} call failed: {message}")]
    ExternalApi {
        system: &'static str,
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A source record could not be interpreted. Skipped, never fatal to
    /// the batch.
    #[error("malformed record {code}: {message}")]
    DataShape { code: String, message: String },
}

impl SyncError {
    /// Wrap a transport-level failure.
    #[must_use]
    pub fn external(system: &'static str, err: &reqwest::Error) -> Self {
        Self::ExternalApi {
            system,
            message: err.to_string(),
        }
    }

    /// Wrap a non-2xx response.
    #[must_use]
    pub fn external_status(system: &'static str, path: &str, status: reqwest::StatusCode) -> Self {
        Self::ExternalApi {
            system,
            message: format!("{path} returned status {status}"),
        }
    }
}
