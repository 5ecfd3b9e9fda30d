use thiserror::Error;

/// Errors produced by type parsing and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid pid '{value}': {reason}")]
    InvalidPid { value: String, reason: String },

    #[error("invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("invalid state code: {0}")]
    InvalidState(String),

    #[error("invalid control group: {0}")]
    InvalidControlGroup(String),

    #[error("invalid object type: {0}")]
    InvalidObjectType(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}
