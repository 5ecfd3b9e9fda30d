use dor_types::{Pid, STAGING_SCHEME};

use crate::error::{TranslationError, TranslationResult};

pub const MIGRATION_PATH_PREFIX: &str = "/get/";

/// What a content location refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationKind {
    /// An absolute URL.
    Url,
    /// `pid+DSID+DSID.n` in the managed content store.
    Internal,
    /// `uploaded://N` in the staging area.
    Staged,
    /// `/get/...`, relative to the migration base URL.
    MigrationPath,
}

impl LocationKind {
    /// Value of the FOXML `contentLocation/@TYPE` attribute.
    pub fn foxml_type(&self) -> &'static str {
        match self {
            Self::Internal | Self::Staged => "INTERNAL_ID",
            Self::Url | Self::MigrationPath => "URL",
        }
    }
}

/// Classify a location, failing for anything unrecognized.
pub fn classify(location: &str) -> TranslationResult<LocationKind> {
    if let Some(n) = location.strip_prefix(STAGING_SCHEME) {
        if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(LocationKind::Staged);
        }
    } else if location.starts_with(MIGRATION_PATH_PREFIX) {
        return Ok(LocationKind::MigrationPath);
    } else if is_internal_id(location) {
        return Ok(LocationKind::Internal);
    } else if url::Url::parse(location).is_ok_and(|u| !u.cannot_be_a_base()) {
        return Ok(LocationKind::Url);
    }
    Err(TranslationError::integrity(format!(
        "unrecognized content location '{location}'"
    )))
}

fn is_internal_id(location: &str) -> bool {
    let mut parts = location.splitn(3, '+');
    let (Some(pid), Some(dsid), Some(vid)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !dsid.is_empty()
        && Pid::parse(pid).is_ok()
        && vid
            .strip_prefix(dsid)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
