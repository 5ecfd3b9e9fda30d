use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use dor_types::Pid;

/// Table of pids currently held by a writer.
///
/// Acquisition blocks while another writer holds the same pid; pids are
/// independent of each other. Release happens when the [`PidLock`] drops.
#[derive(Debug, Default)]
pub struct PidLockTable {
    held: Mutex<HashSet<Pid>>,
    released: Condvar,
}

impl PidLockTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block until `pid` is free, then take it.
    pub fn acquire(self: &Arc<Self>, pid: &Pid) -> PidLock {
        let mut held = self.held.lock();
        while held.contains(pid) {
            debug!(pid = %pid, "waiting for writer lock");
            self.released.wait(&mut held);
        }
        held.insert(pid.clone());
        PidLock {
            table: Arc::clone(self),
            pid: pid.clone(),
        }
    }

    /// Take `pid` only if it is free right now.
    pub fn try_acquire(self: &Arc<Self>, pid: &Pid) -> Option<PidLock> {
        let mut held = self.held.lock();
        if !held.insert(pid.clone()) {
            return None;
        }
        Some(PidLock {
            table: Arc::clone(self),
            pid: pid.clone(),
        })
    }

    pub fn is_held(&self, pid: &Pid) -> bool {
        self.held.lock().contains(pid)
    }

    fn release(&self, pid: &Pid) {
        let mut held = self.held.lock();
        held.remove(pid);
        self.released.notify_all();
    }
}

/// Exclusive right to write one pid. Released on drop.
#[derive(Debug)]
pub struct PidLock {
    table: Arc<PidLockTable>,
    pid: Pid,
}

impl PidLock {
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Whether this lock was issued by `table`.
    pub fn is_from(&self, table: &Arc<PidLockTable>) -> bool {
        Arc::ptr_eq(&self.table, table)
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        self.table.release(&self.pid);
    }
}
