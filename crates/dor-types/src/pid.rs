use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// URI prefix under which pids are exposed as resource identifiers.
pub const PID_URI_PREFIX: &str = "info:fedora/";

/// Maximum length of a pid, namespace and separator included.
pub const MAX_PID_LENGTH: usize = 64;

/// Persistent identifier of a digital object.
///
/// A pid has the form `namespace:objectId`. The namespace may contain ASCII
/// letters, digits, `-` and `.`; the object part may additionally contain
/// `~`, `_` and percent-encoded octets (`%XX`, uppercase hex). Pids are
/// immutable for the life of an object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pid(String);

impl Pid {
    /// Parse and validate a pid. A leading `info:fedora/` is accepted and
    /// stripped.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix(PID_URI_PREFIX).unwrap_or(s);
        let invalid = |reason: &str| TypeError::InvalidPid {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        if s.len() > MAX_PID_LENGTH {
            return Err(invalid("longer than 64 characters"));
        }
        let (namespace, object_id) = s.split_once(':').ok_or_else(|| invalid("missing ':'"))?;
        if namespace.is_empty() {
            return Err(invalid("empty namespace"));
        }
        if !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(invalid("illegal character in namespace"));
        }
        if object_id.is_empty() {
            return Err(invalid("empty object id"));
        }
        let bytes = object_id.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b'%' {
                let hex = bytes.get(i + 1..i + 3).ok_or_else(|| invalid("truncated escape"))?;
                if !hex.iter().all(|h| h.is_ascii_digit() || (b'A'..=b'F').contains(h)) {
                    return Err(invalid("malformed escape"));
                }
                i += 3;
                continue;
            }
            if !(b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'~' | b'_')) {
                return Err(invalid("illegal character in object id"));
            }
            i += 1;
        }
        Ok(Self(s.to_string()))
    }

    /// The namespace part (before the first `:`).
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or_default()
    }

    /// The object part (after the first `:`).
    pub fn object_id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The pid as a resource URI (`info:fedora/ns:id`).
    pub fn to_uri(&self) -> String {
        format!("{PID_URI_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Pid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pid> for String {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_simple_pid() {
        let pid = Pid::parse("demo:1").unwrap();
        assert_eq!(pid.namespace(), "demo");
        assert_eq!(pid.object_id(), "1");
        assert_eq!(pid.to_string(), "demo:1");
    }

    #[test]
    fn strips_uri_prefix() {
        let pid = Pid::parse("info:fedora/demo:abc").unwrap();
        assert_eq!(pid.as_str(), "demo:abc");
        assert_eq!(pid.to_uri(), "info:fedora/demo:abc");
    }

    #[test]
    fn accepts_percent_escapes() {
        assert!(Pid::parse("demo:a%20b").is_ok());
        assert!(Pid::parse("demo:a%2").is_err());
        assert!(Pid::parse("demo:a%zz").is_err());
        assert!(Pid::parse("demo:a%2f").is_err());
    }

    #[test]
    fn rejects_malformed() {
        assert!(Pid::parse("nocolon").is_err());
        assert!(Pid::parse(":1").is_err());
        assert!(Pid::parse("demo:").is_err());
        assert!(Pid::parse("de mo:1").is_err());
        assert!(Pid::parse("demo:a/b").is_err());
        let long = format!("demo:{}", "x".repeat(60));
        assert!(Pid::parse(&long).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let pid = Pid::parse("demo:serde").unwrap();
        let json = serde_json::to_string(&pid).unwrap();
        assert_eq!(json, "\"demo:serde\"");
        let parsed: Pid = serde_json::from_str(&json).unwrap();
        assert_eq!(pid, parsed);
    }

    #[test]
    fn serde_rejects_invalid() {
        let parsed: Result<Pid, _> = serde_json::from_str("\"bogus\"");
        assert!(parsed.is_err());
    }

    proptest! {
        #[test]
        fn well_formed_pids_always_parse(
            ns in "[A-Za-z0-9.-]{1,20}",
            id in "[A-Za-z0-9.~_-]{1,30}",
        ) {
            let raw = format!("{ns}:{id}");
            let pid = Pid::parse(&raw).unwrap();
            prop_assert_eq!(pid.namespace(), ns.as_str());
            prop_assert_eq!(pid.object_id(), id.as_str());
        }
    }
}
