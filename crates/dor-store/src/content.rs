use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use dor_types::Pid;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// Internal id under which managed content of one datastream version is kept.
pub fn internal_content_id(pid: &Pid, datastream_id: &str, version_id: &str) -> String {
    format!("{pid}+{datastream_id}+{version_id}")
}

/// Split an internal content id into pid, datastream id and version id.
pub fn parse_internal_content_id(id: &str) -> Option<(Pid, String, String)> {
    let mut parts = id.splitn(3, '+');
    let pid = Pid::parse(parts.next()?).ok()?;
    let dsid = parts.next().filter(|s| !s.is_empty())?;
    let vid = parts.next().filter(|s| !s.is_empty())?;
    Some((pid, dsid.to_string(), vid.to_string()))
}

/// In-memory managed content store.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, id: &str, data: Vec<u8>) -> StoreResult<()> {
        debug!(id, size = data.len(), "content stored");
        self.blobs.write().insert(id.to_string(), data);
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Vec<u8>> {
        self.blobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ContentNotFound(id.to_string()))
    }

    fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.blobs.read().contains_key(id))
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.blobs.write().remove(id).is_some())
    }

    fn ids_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .blobs
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }
}
