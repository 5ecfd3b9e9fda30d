use tracing::debug;

use dor_model::DigitalObject;
use dor_types::Pid;

use crate::error::{StoreError, StoreResult};
use crate::lock::PidLock;
use crate::traits::{ObjectStore, ReadView};

/// Exclusive, call-scoped handle for mutating one object.
///
/// Holds the pid lock for its whole life. Changes reach the store only
/// through [`commit`](Self::commit) or [`purge`](Self::purge); dropping the
/// writer discards them and releases the lock.
pub struct ObjectWriter<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    lock: PidLock,
    object: DigitalObject,
    is_new: bool,
    finished: bool,
}

impl<'s, S: ObjectStore + ?Sized> ObjectWriter<'s, S> {
    /// Lock `pid` and load its definitive state.
    pub fn open(store: &'s S, pid: &Pid) -> StoreResult<Self> {
        let lock = store.lock(pid)?;
        let object = store.read(pid, ReadView::Definitive)?.as_ref().clone();
        Ok(Self {
            store,
            lock,
            object,
            is_new: false,
            finished: false,
        })
    }

    /// Lock the object's pid for creation. Fails if the pid is taken.
    pub fn create(store: &'s S, object: DigitalObject) -> StoreResult<Self> {
        let pid = object
            .pid()
            .cloned()
            .ok_or_else(|| StoreError::Allocation("object has no pid".into()))?;
        let lock = store.lock(&pid)?;
        if store.exists(&pid)? {
            return Err(StoreError::ObjectExists(pid));
        }
        Ok(Self {
            store,
            lock,
            object,
            is_new: true,
            finished: false,
        })
    }

    pub fn pid(&self) -> &Pid {
        self.lock.pid()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn object(&self) -> &DigitalObject {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut DigitalObject {
        &mut self.object
    }

    /// Persist the working copy and release the lock.
    pub fn commit(mut self) -> StoreResult<DigitalObject> {
        self.store.put(&self.lock, &self.object)?;
        self.finished = true;
        debug!(pid = %self.lock.pid(), created = self.is_new, "writer committed");
        Ok(std::mem::take(&mut self.object))
    }

    /// Remove the object from the store and release the lock.
    pub fn purge(mut self) -> StoreResult<DigitalObject> {
        if !self.store.remove(&self.lock)? {
            return Err(StoreError::ObjectNotFound(self.lock.pid().clone()));
        }
        self.finished = true;
        debug!(pid = %self.lock.pid(), "writer purged object");
        Ok(std::mem::take(&mut self.object))
    }
}

impl<S: ObjectStore + ?Sized> Drop for ObjectWriter<'_, S> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(pid = %self.lock.pid(), "writer released without commit");
        }
    }
}
