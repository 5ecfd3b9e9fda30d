//! Object store collaborator for the digital object repository.
//!
//! The management layer never touches storage directly; it goes through the
//! traits defined here. In-memory implementations back tests and embedding.
//!
//! # Components
//!
//! - [`ObjectStore`] -- persisted object records, read through a cached or a
//!   definitive view, written only under a pid-scoped [`PidLock`]
//! - [`ObjectWriter`] -- exclusive, call-scoped writer handle; commit or drop
//! - [`ContentStore`] -- repository-owned bytes of managed datastreams
//! - [`StagingArea`] -- time-bounded holding area for uploaded content
//! - [`PidAllocator`] -- pid generation per namespace
//!
//! # Design Rules
//!
//! 1. Writers for the same pid serialize at acquisition; different pids
//!    proceed independently.
//! 2. A writer dropped without `commit` persists nothing.
//! 3. Definitive reads decode the persisted record and verify its BLAKE3
//!    digest; cached reads share the last committed snapshot.
//! 4. All I/O and integrity failures are propagated, never silently ignored.

pub mod content;
pub mod error;
pub mod lock;
pub mod memory;
pub mod pid;
pub mod record;
pub mod staging;
pub mod traits;
pub mod writer;

pub use content::{internal_content_id, parse_internal_content_id, InMemoryContentStore};
pub use error::{StoreError, StoreResult};
pub use lock::{PidLock, PidLockTable};
pub use memory::InMemoryObjectStore;
pub use pid::InMemoryPidAllocator;
pub use record::StoredRecord;
pub use staging::{StagingArea, STAGING_SCHEME};
pub use traits::{ContentStore, ObjectStore, PidAllocator, ReadView};
pub use writer::ObjectWriter;
