//! Content fingerprints for registered evidence.
//!
//! A fingerprint is a SHA-256 digest over the full content bytes of a piece
//! of digital evidence, fixed at registration and never mutated afterwards.
//! Verification recomputes a fresh digest and compares it against the
//! registered value; the registered value itself is immutable.
//!
//! The wire and display form is lowercase hex (64 characters). Comparison
//! for verification purposes goes through [`Fingerprint::matches`], which
//! is constant-time.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CustodyError;

/// Size of a content fingerprint in bytes.
pub const FINGERPRINT_SIZE: usize = 32;

/// A 256-bit content digest, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Builds a fingerprint from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Computes the fingerprint of a complete byte slice.
    #[must_use]
    pub fn compute(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    /// Parses a fingerprint from its hex form.
    ///
    /// Accepts upper- or lowercase hex; the canonical form is lowercase.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the string is not exactly 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CustodyError> {
        if s.len() != FINGERPRINT_SIZE * 2 {
            return Err(CustodyError::Validation {
                field: "fingerprint",
                reason: format!(
                    "expected {} hex characters, got {}",
                    FINGERPRINT_SIZE * 2,
                    s.len()
                ),
            });
        }

        let mut bytes = [0u8; FINGERPRINT_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|err| CustodyError::Validation {
            field: "fingerprint",
            reason: format!("invalid hex: {err}"),
        })?;

        Ok(Self(bytes))
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    /// Constant-time equality check against another fingerprint.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Incremental fingerprint computation for streamed content.
///
/// Used when content is hashed while being written to or read from the
/// vault, so large files never need to be held in memory.
#[derive(Default)]
pub struct FingerprintHasher {
    inner: Sha256,
    bytes_hashed: u64,
}

impl FingerprintHasher {
    /// Creates a fresh hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of content into the digest.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes_hashed += chunk.len() as u64;
    }

    /// Returns the number of bytes hashed so far.
    #[must_use]
    pub const fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Finalizes the digest into a fingerprint.
    #[must_use]
    pub fn finalize(self) -> Fingerprint {
        Fingerprint(self.inner.finalize().into())
    }
}
