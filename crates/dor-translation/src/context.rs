use std::fmt;

use dor_model::DEFAULT_BINDING_TARGET;

use crate::error::{TranslationError, TranslationResult};

/// Instance-independent stand-in for the repository's public base URL inside
/// service description datastreams.
pub const SERVICE_PLACEHOLDER: &str = "http://local.repository.server/";

/// Datastreams of behavior-mechanism objects that carry service URLs.
pub const SERVICE_DATASTREAMS: &[&str] = &["WSDL", "SERVICE-PROFILE"];

/// Purpose a document is read or written for. Governs how locations of
/// managed content are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TranslationContext {
    /// Internal identifiers as-is.
    #[default]
    Store,
    /// Managed content addressed through the public base URL.
    Public,
    /// Managed content addressed by a relative `/get/...` path.
    Migration,
    /// Managed content embedded as base64.
    Archival,
}

impl TranslationContext {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Public => "public",
            Self::Migration => "migrate",
            Self::Archival => "archive",
        }
    }

    pub fn parse(value: &str) -> TranslationResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "store" => Ok(Self::Store),
            "public" => Ok(Self::Public),
            "migrate" | "migration" => Ok(Self::Migration),
            "archive" | "archival" => Ok(Self::Archival),
            other => Err(TranslationError::integrity(format!(
                "unknown translation context '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TranslationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings shared by every translator built from one registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationConfig {
    pub public_base_url: String,
    pub service_placeholder: String,
    pub default_binding_target: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080/fedora".into(),
            service_placeholder: SERVICE_PLACEHOLDER.into(),
            default_binding_target: DEFAULT_BINDING_TARGET.into(),
        }
    }
}

impl TranslationConfig {
    /// Public base URL with exactly one trailing slash.
    fn public_prefix(&self) -> String {
        format!("{}/", self.public_base_url.trim_end_matches('/'))
    }

    /// Public URL of one managed datastream version.
    pub fn public_location(&self, pid: &str, dsid: &str, created: &str) -> String {
        format!("{}get/{pid}/{dsid}/{created}", self.public_prefix())
    }

    /// Replace the public base URL with the placeholder.
    pub fn to_placeholder(&self, content: &[u8]) -> Vec<u8> {
        replace_utf8(content, &self.public_prefix(), &self.service_placeholder)
    }

    /// Replace the placeholder with the public base URL.
    pub fn from_placeholder(&self, content: &[u8]) -> Vec<u8> {
        replace_utf8(content, &self.service_placeholder, &self.public_prefix())
    }
}

fn replace_utf8(content: &[u8], from: &str, to: &str) -> Vec<u8> {
    match std::str::from_utf8(content) {
        Ok(text) if !from.is_empty() && text.contains(from) => text.replace(from, to).into_bytes(),
        _ => content.to_vec(),
    }
}

/// Supplies the bytes of managed content for archival documents.
pub trait ContentResolver {
    fn resolve(&self, location: &str) -> TranslationResult<Vec<u8>>;
}

/// Resolver for callers that never serialize in the archival context.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContentResolver;

impl ContentResolver for NoContentResolver {
    fn resolve(&self, location: &str) -> TranslationResult<Vec<u8>> {
        Err(TranslationError::integrity(format!(
            "no content available for {location}"
        )))
    }
}
