use dor_types::Pid;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(Pid),

    /// An object with this pid already exists.
    #[error("object already exists: {0}")]
    ObjectExists(Pid),

    /// The persisted record no longer matches its digest (data corruption).
    #[error("integrity check failed for {pid}: expected {expected}, computed {computed}")]
    IntegrityMismatch {
        pid: Pid,
        expected: String,
        computed: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object handed to a writer has no pid, or a different one.
    #[error("writer for {locked} cannot store object {actual}")]
    PidMismatch { locked: Pid, actual: String },

    /// No managed content under this id.
    #[error("content not found: {0}")]
    ContentNotFound(String),

    /// No staged upload under this id (never staged, taken, or expired).
    #[error("staged content not found: {0}")]
    StagingNotFound(String),

    /// Pid generation failed.
    #[error("pid allocation failed: {0}")]
    Allocation(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
