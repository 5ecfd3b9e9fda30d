use dor_types::ControlGroup;

/// Errors from object-graph manipulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("datastream {id} is {expected}, version {version_id} carries {actual} content")]
    ControlGroupMismatch {
        id: String,
        version_id: String,
        expected: ControlGroup,
        actual: ControlGroup,
    },

    #[error("duplicate version id {0}")]
    DuplicateVersion(String),

    #[error("version id {version_id} does not belong to component {id}")]
    ForeignVersion { id: String, version_id: String },

    #[error("component {0} has no versions")]
    EmptyHistory(String),

    #[error("datastream not found: {0}")]
    DatastreamNotFound(String),

    #[error("disseminator not found: {0}")]
    DisseminatorNotFound(String),
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
