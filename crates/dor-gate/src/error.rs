use std::fmt;

use dor_types::Pid;

/// Errors from authorization checks.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A rule denied the call. The reason is for logs only; callers facing
    /// clients report a bare denial.
    #[error("not authorized to {action} on {target}: {reason}")]
    NotAuthorized {
        action: String,
        target: String,
        reason: String,
    },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    pub(crate) fn denied(
        action: impl fmt::Display,
        pid: Option<&Pid>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotAuthorized {
            action: action.to_string(),
            target: pid.map(Pid::to_string).unwrap_or_else(|| "repository".into()),
            reason: reason.into(),
        }
    }
}

impl PartialEq for GateError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for GateError {}

/// Result alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;
