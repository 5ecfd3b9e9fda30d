use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Lifecycle state of an object, datastream, or disseminator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl State {
    /// Single-letter wire code (`A`, `I`, `D`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
            Self::Deleted => "D",
        }
    }

    /// Full name, as used in object properties.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Deleted => "Deleted",
        }
    }

    /// Parse a state from its single-letter code. Only `A`, `I` and `D`
    /// are accepted; this is the form clients pass to mutations.
    pub fn from_code(code: &str) -> Result<Self, TypeError> {
        match code {
            "A" => Ok(Self::Active),
            "I" => Ok(Self::Inactive),
            "D" => Ok(Self::Deleted),
            other => Err(TypeError::InvalidState(other.to_string())),
        }
    }

    /// Lenient parse accepting either the code or the full name in any case.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" | "active" => Ok(Self::Active),
            "i" | "inactive" => Ok(Self::Inactive),
            "d" | "deleted" => Ok(Self::Deleted),
            _ => Err(TypeError::InvalidState(value.to_string())),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
