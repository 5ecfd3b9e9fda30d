use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

pub use dor_types::STAGING_SCHEME;

use crate::error::{StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    next: u64,
    entries: HashMap<String, (Vec<u8>, Instant)>,
}

/// Time-bounded holding area for uploaded content.
///
/// Entries older than the ttl are dropped opportunistically on every put and
/// get; there is no background sweeper.
pub struct StagingArea {
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl StagingArea {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `location` names a staged upload.
    pub fn is_staging_id(location: &str) -> bool {
        location
            .strip_prefix(STAGING_SCHEME)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Stage bytes and return their id.
    pub fn put(&self, data: Vec<u8>) -> String {
        let mut inner = self.inner.lock();
        Self::sweep(&mut inner, self.ttl);
        inner.next += 1;
        let id = format!("{STAGING_SCHEME}{}", inner.next);
        debug!(id = %id, size = data.len(), "content staged");
        inner.entries.insert(id.clone(), (data, Instant::now()));
        id
    }

    /// Copy of the staged bytes.
    pub fn get(&self, id: &str) -> StoreResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        Self::sweep(&mut inner, self.ttl);
        inner
            .entries
            .get(id)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StoreError::StagingNotFound(id.to_string()))
    }

    /// Take the staged bytes out of the area.
    pub fn remove(&self, id: &str) -> StoreResult<Vec<u8>> {
        self.inner
            .lock()
            .entries
            .remove(id)
            .map(|(data, _)| data)
            .ok_or_else(|| StoreError::StagingNotFound(id.to_string()))
    }

    /// Drop expired entries. Returns how many were dropped.
    pub fn gc(&self) -> usize {
        let mut inner = self.inner.lock();
        Self::sweep(&mut inner, self.ttl)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(inner: &mut Inner, ttl: Duration) -> usize {
        let before = inner.entries.len();
        inner.entries.retain(|_, (_, at)| at.elapsed() < ttl);
        let dropped = before - inner.entries.len();
        if dropped > 0 {
            debug!(dropped, "expired staged content");
        }
        dropped
    }
}
