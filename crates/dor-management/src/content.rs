//! Managed content bookkeeping for a single call.

use dor_crypto::{Checksum, ChecksumType};
use dor_store::{parse_internal_content_id, ContentStore, StagingArea};
use dor_translation::{ContentResolver, TranslationError, TranslationResult};
use tracing::{debug, warn};

use crate::error::{ManagementError, ManagementResult};

/// Content written during a call that has not committed yet.
///
/// Dropping it without [`keep`](Self::keep) deletes everything it wrote.
/// Staging ids it consumed are only taken out of staging on `keep`, so a
/// failed call leaves the upload in place.
pub(crate) struct PendingContent<'a> {
    contents: &'a dyn ContentStore,
    staging: &'a StagingArea,
    written: Vec<String>,
    consumed: Vec<String>,
    kept: bool,
}

impl<'a> PendingContent<'a> {
    pub(crate) fn new(contents: &'a dyn ContentStore, staging: &'a StagingArea) -> Self {
        Self {
            contents,
            staging,
            written: Vec::new(),
            consumed: Vec::new(),
            kept: false,
        }
    }

    pub(crate) fn put(&mut self, id: &str, data: Vec<u8>) -> ManagementResult<()> {
        self.contents.put(id, data)?;
        self.written.push(id.to_string());
        Ok(())
    }

    pub(crate) fn consume_staged(&mut self, id: &str) {
        self.consumed.push(id.to_string());
    }

    pub(crate) fn keep(mut self) {
        self.kept = true;
        for id in &self.consumed {
            if self.staging.remove(id).is_err() {
                debug!(id = %id, "staged content already gone");
            }
        }
    }
}

impl Drop for PendingContent<'_> {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        for id in &self.written {
            if let Err(e) = self.contents.delete(id) {
                warn!(id = %id, error = %e, "failed to discard uncommitted content");
            }
        }
    }
}

/// Serves managed content to the archival serializer.
pub(crate) struct RepositoryContent<'a> {
    pub(crate) contents: &'a dyn ContentStore,
    pub(crate) staging: &'a StagingArea,
}

impl ContentResolver for RepositoryContent<'_> {
    fn resolve(&self, location: &str) -> TranslationResult<Vec<u8>> {
        let found = if StagingArea::is_staging_id(location) {
            self.staging.get(location)
        } else if parse_internal_content_id(location).is_some() {
            self.contents.get(location)
        } else {
            return Err(TranslationError::ObjectIntegrity(format!(
                "content at {location} is not held by the repository"
            )));
        };
        found.map_err(|e| TranslationError::ObjectIntegrity(e.to_string()))
    }
}

/// Checksum of `data` under `kind`, checked against the client's expected
/// value when one is given.
pub(crate) fn seal_checksum(
    kind: ChecksumType,
    expected: Option<&str>,
    data: &[u8],
) -> ManagementResult<Checksum> {
    if !kind.is_enabled() {
        return Ok(Checksum::disabled());
    }
    let computed = Checksum::compute(kind, data);
    match expected.map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) if !computed.matches(e) => Err(ManagementError::validation(format!(
            "Checksum Mismatch: {}",
            computed.value
        ))),
        _ => Ok(computed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dor_store::InMemoryContentStore;
    use std::time::Duration;

    #[test]
    fn dropped_pending_content_is_discarded() {
        let store = InMemoryContentStore::new();
        let staging = StagingArea::new(Duration::from_secs(60));
        {
            let mut pending = PendingContent::new(&store, &staging);
            pending.put("demo:1+IMG+IMG.0", b"png".to_vec()).unwrap();
            assert!(store.exists("demo:1+IMG+IMG.0").unwrap());
        }
        assert!(!store.exists("demo:1+IMG+IMG.0").unwrap());
    }

    #[test]
    fn kept_content_stays_and_consumes_staging() {
        let store = InMemoryContentStore::new();
        let staging = StagingArea::new(Duration::from_secs(60));
        let upload = staging.put(b"png".to_vec());
        let mut pending = PendingContent::new(&store, &staging);
        pending.put("demo:1+IMG+IMG.0", b"png".to_vec()).unwrap();
        pending.consume_staged(&upload);
        pending.keep();
        assert!(store.exists("demo:1+IMG+IMG.0").unwrap());
        assert!(staging.get(&upload).is_err());
    }

    #[test]
    fn checksum_mismatch_reports_computed_value() {
        let computed = ChecksumType::Md5.compute(b"hello");
        let err = seal_checksum(ChecksumType::Md5, Some("deadbeef"), b"hello").unwrap_err();
        assert_eq!(err.to_string(), format!("Checksum Mismatch: {computed}"));
        assert!(seal_checksum(ChecksumType::Md5, Some(&computed.to_uppercase()), b"hello").is_ok());
        assert_eq!(
            seal_checksum(ChecksumType::Disabled, Some("deadbeef"), b"hello").unwrap(),
            Checksum::disabled()
        );
    }
}
