use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use dor_types::Pid;

use crate::error::{StoreError, StoreResult};
use crate::traits::PidAllocator;

/// Sequential pid allocator: `namespace:1`, `namespace:2`, ...
///
/// Counters are per namespace. Reserving a pid with a numeric object id
/// moves that namespace's counter past it.
#[derive(Default)]
pub struct InMemoryPidAllocator {
    counters: Mutex<HashMap<String, u64>>,
}

impl InMemoryPidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number handed out or reserved in `namespace`.
    pub fn last(&self, namespace: &str) -> u64 {
        self.counters.lock().get(namespace).copied().unwrap_or(0)
    }
}

impl PidAllocator for InMemoryPidAllocator {
    fn generate(&self, namespace: &str, count: usize) -> StoreResult<Vec<Pid>> {
        let mut counters = self.counters.lock();
        let first = counters.get(namespace).copied().unwrap_or(0);
        let last = u64::try_from(count)
            .ok()
            .and_then(|n| first.checked_add(n))
            .ok_or_else(|| {
                StoreError::Allocation(format!(
                    "namespace {namespace} cannot supply {count} more pids after {first}"
                ))
            })?;
        let mut pids = Vec::new();
        for n in first + 1..=last {
            let pid = Pid::parse(&format!("{namespace}:{n}"))
                .map_err(|e| StoreError::Allocation(e.to_string()))?;
            pids.push(pid);
        }
        counters.insert(namespace.to_string(), last);
        debug!(namespace, count, last, "pids generated");
        Ok(pids)
    }

    fn reserve(&self, pid: &Pid) -> StoreResult<()> {
        if let Ok(n) = pid.object_id().parse::<u64>() {
            let mut counters = self.counters.lock();
            let counter = counters.entry(pid.namespace().to_string()).or_insert(0);
            if n > *counter {
                *counter = n;
            }
        }
        Ok(())
    }
}
