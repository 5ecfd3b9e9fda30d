use std::sync::Arc;

use dor_model::DigitalObject;
use dor_types::Pid;

use crate::error::StoreResult;
use crate::lock::PidLock;

/// Freshness a reader asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadView {
    /// The last committed snapshot, shared without decoding.
    Cached,
    /// Decoded from the persisted record and integrity-checked. Mutations
    /// always read this view.
    Definitive,
}

/// Persistent object store.
///
/// All implementations must satisfy these invariants:
/// - `put` and `remove` require the caller to hold the pid's [`PidLock`].
/// - A committed object is visible to every subsequent read.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object. Returns `ObjectNotFound` if it does not exist.
    fn read(&self, pid: &Pid, view: ReadView) -> StoreResult<Arc<DigitalObject>>;

    /// Check whether an object exists.
    fn exists(&self, pid: &Pid) -> StoreResult<bool>;

    /// Acquire the exclusive writer lock for `pid`, blocking while another
    /// writer holds it.
    fn lock(&self, pid: &Pid) -> StoreResult<PidLock>;

    /// Persist `object` under the held lock.
    fn put(&self, lock: &PidLock, object: &DigitalObject) -> StoreResult<()>;

    /// Delete the object under the held lock. Returns `true` if it existed.
    fn remove(&self, lock: &PidLock) -> StoreResult<bool>;

    /// All stored pids, sorted.
    fn pids(&self) -> StoreResult<Vec<Pid>>;
}

/// Storage for the bytes of managed datastreams.
pub trait ContentStore: Send + Sync {
    /// Store bytes under `id`, replacing anything already there.
    fn put(&self, id: &str, data: Vec<u8>) -> StoreResult<()>;

    /// Fetch bytes. Returns `ContentNotFound` if absent.
    fn get(&self, id: &str) -> StoreResult<Vec<u8>>;

    fn exists(&self, id: &str) -> StoreResult<bool>;

    /// Delete bytes. Returns `true` if they existed.
    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Ids starting with `prefix`, sorted.
    fn ids_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Source of new pids.
pub trait PidAllocator: Send + Sync {
    /// Generate `count` unused pids in `namespace`.
    fn generate(&self, namespace: &str, count: usize) -> StoreResult<Vec<Pid>>;

    /// Record that `pid` is in use so it is never generated.
    fn reserve(&self, pid: &Pid) -> StoreResult<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn read(&self, pid: &Pid, view: ReadView) -> StoreResult<Arc<DigitalObject>> {
        (**self).read(pid, view)
    }

    fn exists(&self, pid: &Pid) -> StoreResult<bool> {
        (**self).exists(pid)
    }

    fn lock(&self, pid: &Pid) -> StoreResult<PidLock> {
        (**self).lock(pid)
    }

    fn put(&self, lock: &PidLock, object: &DigitalObject) -> StoreResult<()> {
        (**self).put(lock, object)
    }

    fn remove(&self, lock: &PidLock) -> StoreResult<bool> {
        (**self).remove(lock)
    }

    fn pids(&self) -> StoreResult<Vec<Pid>> {
        (**self).pids()
    }
}
