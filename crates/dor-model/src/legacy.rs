//! Legacy metadata classification carried in format URIs.
//!
//! Older packaging documents sorted inline metadata into administrative and
//! descriptive sections. That placement survives in format URIs of the form
//! `info:fedora/fedora-system:format/xml.mets.<class>.<MDTYPE>[.<OTHERMDTYPE>]`
//! and is decoded here so the legacy serializer can put each datastream back
//! into the right section.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every legacy classification URI.
pub const LEGACY_FORMAT_PREFIX: &str = "info:fedora/fedora-system:format/xml.mets.";

/// Metadata section a datastream belonged to in the legacy format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataClass {
    Technical,
    Source,
    Rights,
    Provenance,
    Descriptive,
}

impl MetadataClass {
    /// Element name of the section in the legacy format.
    pub fn section_name(&self) -> &'static str {
        match self {
            Self::Technical => "techMD",
            Self::Source => "sourceMD",
            Self::Rights => "rightsMD",
            Self::Provenance => "digiprovMD",
            Self::Descriptive => "descMD",
        }
    }

    pub fn from_section_name(name: &str) -> Option<Self> {
        match name {
            "techMD" => Some(Self::Technical),
            "sourceMD" => Some(Self::Source),
            "rightsMD" => Some(Self::Rights),
            "digiprovMD" => Some(Self::Provenance),
            "descMD" | "dmdSec" => Some(Self::Descriptive),
            _ => None,
        }
    }

    /// Descriptive metadata lives outside the administrative section.
    pub fn is_administrative(&self) -> bool {
        !matches!(self, Self::Descriptive)
    }
}

impl fmt::Display for MetadataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section_name())
    }
}

/// Classification fields decoded from a legacy format URI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegacyMetadata {
    pub class: MetadataClass,
    /// Metadata type token (`MDTYPE`), e.g. `DC`, `MARC`, `OTHER`.
    pub md_type: String,
    /// Free-form sub-type (`OTHERMDTYPE`) when `md_type` is `OTHER`.
    pub other_md_type: Option<String>,
}

impl LegacyMetadata {
    /// Decode a format URI. Returns `None` for URIs that do not follow the
    /// legacy pattern.
    pub fn decode(format_uri: &str) -> Option<Self> {
        let rest = format_uri.strip_prefix(LEGACY_FORMAT_PREFIX)?;
        let mut parts = rest.splitn(3, '.');
        let class = MetadataClass::from_section_name(parts.next()?)?;
        let md_type = parts.next().filter(|t| !t.is_empty())?.to_string();
        let other_md_type = parts.next().filter(|t| !t.is_empty()).map(str::to_string);
        Some(Self {
            class,
            md_type,
            other_md_type,
        })
    }

    /// Re-encode as a format URI.
    pub fn encode(&self) -> String {
        match &self.other_md_type {
            Some(other) => format!(
                "{LEGACY_FORMAT_PREFIX}{}.{}.{other}",
                self.class.section_name(),
                self.md_type
            ),
            None => format!(
                "{LEGACY_FORMAT_PREFIX}{}.{}",
                self.class.section_name(),
                self.md_type
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_form() {
        let md = LegacyMetadata::decode(
            "info:fedora/fedora-system:format/xml.mets.techMD.OTHER.UNSPECIFIED",
        )
        .unwrap();
        assert_eq!(md.class, MetadataClass::Technical);
        assert_eq!(md.md_type, "OTHER");
        assert_eq!(md.other_md_type.as_deref(), Some("UNSPECIFIED"));
    }

    #[test]
    fn decodes_without_subtype() {
        let md =
            LegacyMetadata::decode("info:fedora/fedora-system:format/xml.mets.descMD.DC").unwrap();
        assert_eq!(md.class, MetadataClass::Descriptive);
        assert_eq!(md.md_type, "DC");
        assert!(md.other_md_type.is_none());
    }

    #[test]
    fn subtype_may_contain_dots() {
        let md = LegacyMetadata::decode(
            "info:fedora/fedora-system:format/xml.mets.rightsMD.OTHER.my.rights.v2",
        )
        .unwrap();
        assert_eq!(md.class, MetadataClass::Rights);
        assert_eq!(md.other_md_type.as_deref(), Some("my.rights.v2"));
    }

    #[test]
    fn non_legacy_uris_ignored() {
        assert!(LegacyMetadata::decode("http://www.openarchives.org/OAI/2.0/oai_dc/").is_none());
        assert!(LegacyMetadata::decode(
            "info:fedora/fedora-system:format/xml.mets.bogusMD.DC"
        )
        .is_none());
        assert!(LegacyMetadata::decode("info:fedora/fedora-system:format/xml.mets.techMD").is_none());
    }

    #[test]
    fn encode_inverts_decode() {
        for uri in [
            "info:fedora/fedora-system:format/xml.mets.digiprovMD.OTHER.UNSPECIFIED",
            "info:fedora/fedora-system:format/xml.mets.sourceMD.MARC",
        ] {
            assert_eq!(LegacyMetadata::decode(uri).unwrap().encode(), uri);
        }
    }
}
