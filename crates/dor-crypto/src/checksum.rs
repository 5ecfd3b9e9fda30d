use std::fmt;
use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest;

/// Value recorded as the checksum of a datastream whose checksumming is
/// disabled.
pub const DISABLED_VALUE: &str = "none";

/// Algorithm used to checksum datastream content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    #[default]
    Disabled,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumType {
    /// Canonical name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Parse an algorithm name. Matching ignores case and the dash in the
    /// SHA names (`sha256` is accepted).
    pub fn parse(name: &str) -> Result<Self, ChecksumError> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "");
        match normalized.as_str() {
            "DISABLED" => Ok(Self::Disabled),
            "MD5" => Ok(Self::Md5),
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(ChecksumError::UnknownAlgorithm(name.to_string())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Compute the lowercase hex digest of `data`. Returns
    /// [`DISABLED_VALUE`] for [`ChecksumType::Disabled`].
    pub fn compute(&self, data: &[u8]) -> String {
        match self {
            Self::Disabled => DISABLED_VALUE.to_string(),
            Self::Md5 => hex::encode(md5::Md5::digest(data)),
            Self::Sha1 => hex::encode(sha1::Sha1::digest(data)),
            Self::Sha256 => hex::encode(sha2::Sha256::digest(data)),
            Self::Sha384 => hex::encode(sha2::Sha384::digest(data)),
            Self::Sha512 => hex::encode(sha2::Sha512::digest(data)),
        }
    }

    /// Compute the digest of everything readable from `reader`.
    pub fn compute_reader<R: Read>(&self, mut reader: R) -> Result<String, ChecksumError> {
        fn drain<D: Digest, R: Read>(reader: &mut R) -> Result<String, ChecksumError> {
            let mut digest = D::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                digest.update(&buf[..n]);
            }
            Ok(hex::encode(digest.finalize()))
        }

        match self {
            Self::Disabled => Ok(DISABLED_VALUE.to_string()),
            Self::Md5 => drain::<md5::Md5, _>(&mut reader),
            Self::Sha1 => drain::<sha1::Sha1, _>(&mut reader),
            Self::Sha256 => drain::<sha2::Sha256, _>(&mut reader),
            Self::Sha384 => drain::<sha2::Sha384, _>(&mut reader),
            Self::Sha512 => drain::<sha2::Sha512, _>(&mut reader),
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumType {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A checksum value together with the algorithm that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub kind: ChecksumType,
    pub value: String,
}

impl Checksum {
    /// Checksum of `data` under `kind`.
    pub fn compute(kind: ChecksumType, data: &[u8]) -> Self {
        Self {
            kind,
            value: kind.compute(data),
        }
    }

    /// The checksum recorded for content with checksumming disabled.
    pub fn disabled() -> Self {
        Self {
            kind: ChecksumType::Disabled,
            value: DISABLED_VALUE.to_string(),
        }
    }

    /// Compare against a client-supplied hex value, ignoring case.
    pub fn matches(&self, expected: &str) -> bool {
        self.value.eq_ignore_ascii_case(expected.trim())
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Errors from checksum computation.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("unknown checksum algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("I/O error while checksumming: {0}")]
    Io(#[from] std::io::Error),
}
