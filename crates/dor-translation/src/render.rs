//! Context-dependent rendering of datastream content, shared by every
//! serializer.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use dor_model::{Content, DatastreamVersion, DigitalObject, ManagedContent};
use dor_types::{ObjectType, Pid};

use crate::context::{ContentResolver, TranslationConfig, TranslationContext, SERVICE_DATASTREAMS};
use crate::error::TranslationResult;
use crate::location::{self, LocationKind, MIGRATION_PATH_PREFIX};

/// How one version's content appears in a document.
pub(crate) enum Rendered<'a> {
    /// Inline XML to be copied into the document.
    Xml(Cow<'a, [u8]>),
    /// A reference to bytes elsewhere.
    Location { kind: LocationKind, href: String },
    /// Base64 text of bytes embedded in the document.
    Binary(String),
}

/// Whether `dsid` holds service descriptions subject to placeholder
/// rewriting.
pub(crate) fn is_service_datastream(object_type: ObjectType, dsid: &str) -> bool {
    object_type == ObjectType::BehaviorMechanism && SERVICE_DATASTREAMS.contains(&dsid)
}

pub(crate) fn render<'a>(
    object: &DigitalObject,
    pid: &Pid,
    dsid: &str,
    version: &'a DatastreamVersion,
    config: &TranslationConfig,
    context: TranslationContext,
    resolver: &dyn ContentResolver,
) -> TranslationResult<Rendered<'a>> {
    Ok(match &version.content {
        Content::Inline(xml) => {
            if context == TranslationContext::Public && is_service_datastream(object.object_type, dsid)
            {
                Rendered::Xml(Cow::Owned(config.from_placeholder(xml)))
            } else {
                Rendered::Xml(Cow::Borrowed(xml))
            }
        }
        Content::Managed(ManagedContent::Embedded(bytes)) => Rendered::Binary(BASE64.encode(bytes)),
        Content::Managed(ManagedContent::Location(loc)) => {
            let created = version.created.to_string();
            match context {
                TranslationContext::Store => Rendered::Location {
                    kind: location::classify(loc)?,
                    href: loc.clone(),
                },
                TranslationContext::Public => Rendered::Location {
                    kind: LocationKind::Url,
                    href: config.public_location(pid.as_str(), dsid, &created),
                },
                TranslationContext::Migration => Rendered::Location {
                    kind: LocationKind::MigrationPath,
                    href: format!("{MIGRATION_PATH_PREFIX}{pid}/{dsid}/{created}"),
                },
                TranslationContext::Archival => {
                    Rendered::Binary(BASE64.encode(resolver.resolve(loc)?))
                }
            }
        }
        Content::Referenced(url) => Rendered::Location {
            kind: LocationKind::Url,
            href: url.clone(),
        },
    })
}

pub(crate) fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(compact)
}
