//! Retrieval of externally hosted content.

use std::collections::HashMap;

use dor_gate::CallContext;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{ManagementError, ManagementResult};

/// Fetches bytes from a URL on behalf of a caller.
///
/// Used when managed content is supplied by URL, when ingest meets a
/// relative migration path, and when a referenced datastream must be
/// checksummed.
pub trait ContentFetcher: Send + Sync {
    fn fetch(&self, url: &str, ctx: &CallContext) -> ManagementResult<Vec<u8>>;
}

/// Refuses every fetch.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFetcher;

impl ContentFetcher for NoFetcher {
    fn fetch(&self, url: &str, _ctx: &CallContext) -> ManagementResult<Vec<u8>> {
        Err(ManagementError::general(format!(
            "external content is not available: {url}"
        )))
    }
}

/// Serves a fixed set of URLs from memory.
#[derive(Default)]
pub struct StaticFetcher {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(url, data);
        self
    }

    pub fn insert(&self, url: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.write().insert(url.into(), data.into());
    }
}

impl ContentFetcher for StaticFetcher {
    fn fetch(&self, url: &str, ctx: &CallContext) -> ManagementResult<Vec<u8>> {
        debug!(url, subject = %ctx.subject, "fetching content");
        self.entries
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| ManagementError::general(format!("unable to fetch {url}")))
    }
}
