use dor_gate::GateError;
use dor_model::ModelError;
use dor_store::StoreError;
use dor_translation::TranslationError;
use dor_types::{Pid, TypeError};
use thiserror::Error;
use tracing::debug;

/// Errors from repository management calls.
#[derive(Debug, Error)]
pub enum ManagementError {
    /// Malformed input: a bad id, state code, location or checksum.
    #[error("{0}")]
    Validation(String),

    /// The request is well-formed but breaks a repository rule.
    #[error("{0}")]
    General(String),

    /// The authorization gate refused the call. Carries no reason.
    #[error("not authorized")]
    NotAuthorized,

    #[error("object not found: {0}")]
    ObjectNotFound(Pid),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("stream i/o failed: {0}")]
    StreamIo(String),

    #[error("translation error: {0}")]
    Translation(TranslationError),
}

impl ManagementError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

impl From<StoreError> for ManagementError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ObjectNotFound(pid) => Self::ObjectNotFound(pid),
            StoreError::ObjectExists(pid) => Self::General(format!("object {pid} already exists")),
            other => Self::Store(other),
        }
    }
}

impl From<TranslationError> for ManagementError {
    fn from(e: TranslationError) -> Self {
        match e {
            TranslationError::StreamRead(_) | TranslationError::StreamWrite(_) => {
                Self::StreamIo(e.to_string())
            }
            other => Self::Translation(other),
        }
    }
}

impl From<GateError> for ManagementError {
    fn from(e: GateError) -> Self {
        debug!(error = %e, "gate refused call");
        Self::NotAuthorized
    }
}

impl From<ModelError> for ManagementError {
    fn from(e: ModelError) -> Self {
        Self::General(e.to_string())
    }
}

impl From<TypeError> for ManagementError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<dor_crypto::ChecksumError> for ManagementError {
    fn from(e: dor_crypto::ChecksumError) -> Self {
        Self::Validation(e.to_string())
    }
}

pub type ManagementResult<T> = Result<T, ManagementError>;

/// Transport-facing error: only the message survives.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Flatten any error into a fault.
    pub fn from_error(e: &dyn std::error::Error) -> Self {
        Self::new(e.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ManagementError> for Fault {
    fn from(e: ManagementError) -> Self {
        Self::from_error(&e)
    }
}
