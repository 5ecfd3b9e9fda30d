use crate::error::TypeError;

/// Id of the system-owned audit datastream.
pub const AUDIT_DATASTREAM_ID: &str = "AUDIT";

/// Datastream ids no client may create or modify.
pub const RESERVED_DATASTREAM_IDS: &[&str] = &[AUDIT_DATASTREAM_ID, "FEDORA-AUDITTRAIL"];

/// Scheme of the ids the staging area hands back for uploaded content.
pub const STAGING_SCHEME: &str = "uploaded://";

/// Maximum length of a datastream or disseminator id.
pub const MAX_COMPONENT_ID_LENGTH: usize = 64;

/// Validate a datastream or disseminator id.
///
/// Component ids must be XML names without a colon: a letter or `_`
/// followed by letters, digits, `.`, `-` or `_`.
pub fn validate_component_id(id: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidIdentifier {
        value: id.to_string(),
        reason: reason.to_string(),
    };
    let mut chars = id.chars();
    let first = chars.next().ok_or_else(|| invalid("empty"))?;
    if id.len() > MAX_COMPONENT_ID_LENGTH {
        return Err(invalid("longer than 64 characters"));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid("must start with a letter or '_'"));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')) {
        return Err(invalid("illegal character"));
    }
    Ok(())
}

/// Returns `true` if `id` names a reserved, system-owned datastream.
pub fn is_reserved_datastream_id(id: &str) -> bool {
    RESERVED_DATASTREAM_IDS.contains(&id)
}
