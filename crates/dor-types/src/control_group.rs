use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Storage mode of a datastream. Fixed for the life of a datastream id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlGroup {
    /// XML content embedded in the object itself.
    Inline,
    /// Bytes owned by the repository's content store.
    Managed,
    /// Bytes hosted externally and addressed by URL.
    Referenced,
}

impl ControlGroup {
    /// Wire code (`X`, `M`, `E`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Inline => "X",
            Self::Managed => "M",
            Self::Referenced => "E",
        }
    }

    /// Parse a wire code. The legacy redirect code `R` is read as
    /// [`ControlGroup::Referenced`].
    pub fn from_code(code: &str) -> Result<Self, TypeError> {
        match code {
            "X" => Ok(Self::Inline),
            "M" => Ok(Self::Managed),
            "E" | "R" => Ok(Self::Referenced),
            other => Err(TypeError::InvalidControlGroup(other.to_string())),
        }
    }

    /// Whether content of this group is addressed by a location.
    pub fn has_location(&self) -> bool {
        !matches!(self, Self::Inline)
    }
}

impl fmt::Display for ControlGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for cg in [ControlGroup::Inline, ControlGroup::Managed, ControlGroup::Referenced] {
            assert_eq!(ControlGroup::from_code(cg.code()).unwrap(), cg);
        }
    }

    #[test]
    fn redirect_reads_as_referenced() {
        assert_eq!(ControlGroup::from_code("R").unwrap(), ControlGroup::Referenced);
    }

    #[test]
    fn unknown_code_rejected() {
        assert_eq!(
            ControlGroup::from_code("Q"),
            Err(TypeError::InvalidControlGroup("Q".into()))
        );
    }
}
