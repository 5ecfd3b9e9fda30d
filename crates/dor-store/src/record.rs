use dor_crypto::ContentHasher;
use dor_model::DigitalObject;
use dor_types::Pid;

use crate::error::{StoreError, StoreResult};

/// A persisted object: encoded bytes plus the digest they were written with.
///
/// The store never interprets `data` beyond decoding it on a definitive
/// read; the digest catches corruption between write and read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRecord {
    /// bincode-encoded [`DigitalObject`].
    pub data: Vec<u8>,
    /// Domain-separated BLAKE3 digest of `data`.
    pub digest: [u8; 32],
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredRecord {
    /// Encode an object for storage.
    pub fn encode(object: &DigitalObject) -> StoreResult<Self> {
        let data =
            bincode::serialize(object).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let digest = ContentHasher::OBJECT_RECORD.hash(&data);
        let size = data.len() as u64;
        Ok(Self { data, digest, size })
    }

    /// Verify the digest and decode. `pid` is used for error reporting.
    pub fn decode(&self, pid: &Pid) -> StoreResult<DigitalObject> {
        let computed = ContentHasher::OBJECT_RECORD.hash(&self.data);
        if computed != self.digest {
            return Err(StoreError::IntegrityMismatch {
                pid: pid.clone(),
                expected: ContentHasher::short_hex(&self.digest),
                computed: ContentHasher::short_hex(&computed),
            });
        }
        bincode::deserialize(&self.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
