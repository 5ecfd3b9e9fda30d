use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use dor_model::DigitalObject;
use dor_types::Pid;

use crate::error::{StoreError, StoreResult};
use crate::lock::{PidLock, PidLockTable};
use crate::record::StoredRecord;
use crate::traits::{ObjectStore, ReadView};

/// In-memory object store.
///
/// Records are kept encoded, exactly as a durable backend would persist them,
/// so definitive reads exercise the decode and digest check. A snapshot cache
/// serves [`ReadView::Cached`] reads.
pub struct InMemoryObjectStore {
    records: RwLock<HashMap<Pid, StoredRecord>>,
    cache: RwLock<HashMap<Pid, Arc<DigitalObject>>>,
    locks: Arc<PidLockTable>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            locks: PidLockTable::new(),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Total encoded bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.records.read().values().map(|r| r.size).sum()
    }

    /// Raw persisted record, for inspection.
    pub fn record(&self, pid: &Pid) -> Option<StoredRecord> {
        self.records.read().get(pid).cloned()
    }

    /// Overwrite the persisted bytes without touching the cache.
    #[cfg(test)]
    pub(crate) fn corrupt(&self, pid: &Pid) {
        if let Some(record) = self.records.write().get_mut(pid) {
            if let Some(byte) = record.data.first_mut() {
                *byte ^= 0xff;
            }
        }
    }

    fn check_lock(&self, lock: &PidLock, object: Option<&DigitalObject>) -> StoreResult<()> {
        if !lock.is_from(&self.locks) {
            return Err(StoreError::PidMismatch {
                locked: lock.pid().clone(),
                actual: "lock issued by another store".into(),
            });
        }
        if let Some(object) = object {
            match object.pid() {
                Some(pid) if pid == lock.pid() => {}
                Some(pid) => {
                    return Err(StoreError::PidMismatch {
                        locked: lock.pid().clone(),
                        actual: pid.to_string(),
                    })
                }
                None => {
                    return Err(StoreError::PidMismatch {
                        locked: lock.pid().clone(),
                        actual: "<none>".into(),
                    })
                }
            }
        }
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, pid: &Pid, view: ReadView) -> StoreResult<Arc<DigitalObject>> {
        if view == ReadView::Cached {
            if let Some(hit) = self.cache.read().get(pid) {
                return Ok(Arc::clone(hit));
            }
        }
        let record = self
            .records
            .read()
            .get(pid)
            .cloned()
            .ok_or_else(|| StoreError::ObjectNotFound(pid.clone()))?;
        let object = Arc::new(record.decode(pid)?);
        self.cache.write().insert(pid.clone(), Arc::clone(&object));
        Ok(object)
    }

    fn exists(&self, pid: &Pid) -> StoreResult<bool> {
        Ok(self.records.read().contains_key(pid))
    }

    fn lock(&self, pid: &Pid) -> StoreResult<PidLock> {
        Ok(self.locks.acquire(pid))
    }

    fn put(&self, lock: &PidLock, object: &DigitalObject) -> StoreResult<()> {
        self.check_lock(lock, Some(object))?;
        let record = StoredRecord::encode(object)?;
        debug!(pid = %lock.pid(), size = record.size, "object stored");
        self.records.write().insert(lock.pid().clone(), record);
        self.cache
            .write()
            .insert(lock.pid().clone(), Arc::new(object.clone()));
        Ok(())
    }

    fn remove(&self, lock: &PidLock) -> StoreResult<bool> {
        self.check_lock(lock, None)?;
        self.cache.write().remove(lock.pid());
        let existed = self.records.write().remove(lock.pid()).is_some();
        debug!(pid = %lock.pid(), existed, "object removed");
        Ok(existed)
    }

    fn pids(&self) -> StoreResult<Vec<Pid>> {
        let mut pids: Vec<Pid> = self.records.read().keys().cloned().collect();
        pids.sort();
        Ok(pids)
    }
}
