/// BLAKE3 digests tagged with what they cover.
///
/// The tag is fed to BLAKE3 ahead of the payload, so a stored object record
/// and a policy set never share a digest even when their bytes coincide.
/// These digests are internal integrity checks; client-visible datastream
/// checksums are [`crate::Checksum`]s.
pub struct ContentHasher {
    tag: &'static str,
}

impl ContentHasher {
    /// Encoded object records in the object store.
    pub const OBJECT_RECORD: Self = Self {
        tag: "dor-object-record-v1",
    };
    /// Serialized authorization policy sets.
    pub const POLICY: Self = Self {
        tag: "dor-policy-v1",
    };

    pub fn hash(&self, payload: &[u8]) -> [u8; 32] {
        let mut state = blake3::Hasher::new();
        state.update(self.tag.as_bytes());
        state.update(b":");
        state.update(payload);
        *state.finalize().as_bytes()
    }

    /// Digest of the JSON encoding of `value`.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let encoded =
            serde_json::to_vec(value).map_err(|e| HasherError::Encoding(e.to_string()))?;
        Ok(self.hash(&encoded))
    }

    /// First four digest bytes in hex, for log fields and error messages.
    pub fn short_hex(digest: &[u8; 32]) -> String {
        hex::encode(&digest[..4])
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("cannot encode value for hashing: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_separate_equal_payloads() {
        let payload = b"<dc>A</dc>";
        assert_eq!(
            ContentHasher::OBJECT_RECORD.hash(payload),
            ContentHasher::OBJECT_RECORD.hash(payload)
        );
        assert_ne!(
            ContentHasher::OBJECT_RECORD.hash(payload),
            ContentHasher::POLICY.hash(payload)
        );
    }

    #[test]
    fn one_changed_byte_changes_the_digest() {
        let digest = ContentHasher::OBJECT_RECORD.hash(b"demo:1 v1");
        assert_ne!(ContentHasher::OBJECT_RECORD.hash(b"demo:1 v2"), digest);
    }

    #[test]
    fn policy_json_digest_follows_field_values() {
        let permit = serde_json::json!({"id": "p", "actions": ["ingest"]});
        let deny = serde_json::json!({"id": "p", "actions": ["purgeObject"]});
        assert_ne!(
            ContentHasher::POLICY.hash_json(&permit).unwrap(),
            ContentHasher::POLICY.hash_json(&deny).unwrap()
        );
    }

    #[test]
    fn short_hex_covers_four_bytes() {
        let digest = ContentHasher::POLICY.hash(b"x");
        let short = ContentHasher::short_hex(&digest);
        assert_eq!(short.len(), 8);
        assert_eq!(short, hex::encode(&digest)[..8]);
    }
}
