//! Digest primitives for the digital object repository.
//!
//! Provides the datastream checksum algorithms clients may request
//! (MD5, SHA-1, SHA-2 family) and a domain-separated BLAKE3 hasher the
//! store uses to detect corruption of persisted records.
//!
//! All digests wrap established libraries; there is no custom cryptography.

pub mod checksum;
pub mod hasher;

pub use checksum::{Checksum, ChecksumError, ChecksumType, DISABLED_VALUE};
pub use hasher::{ContentHasher, HasherError};
