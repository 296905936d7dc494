//! Content vault for evidence payloads.
//!
//! The vault holds the byte content of digital evidence, keyed by evidence
//! id, and computes the SHA-256 fingerprint while the content streams in:
//! - Immutability: stored content cannot be replaced through the vault API
//! - Single fingerprint pass: hashing happens during the initial copy
//! - Streaming reads: verification re-reads content in chunks, never whole
//!
//! # Architecture
//!
//! The vault is a trait to allow different backends:
//! - [`MemoryVault`]: In-memory storage for testing
//! - A filesystem backend lives with the service binary
//!
//! # Security
//!
//! The vault itself proves nothing about integrity. The registered
//! fingerprint lives in the ledger; the verifier re-hashes vault content
//! and compares. A vault that silently changes content is exactly the
//! fault the verifier exists to catch.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use uuid::Uuid;

use crate::fingerprint::{Fingerprint, FingerprintHasher};

/// Maximum size of a single evidence payload (100 MB).
pub const MAX_CONTENT_SIZE: u64 = 100 * 1024 * 1024;

/// Default maximum total size for the in-memory vault (1 GB).
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 1024 * 1024 * 1024;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VaultError {
    /// No content stored for the given evidence id.
    #[error("content not found for evidence: {evidence_id}")]
    NotFound {
        /// The evidence id that has no stored content.
        evidence_id: String,
    },

    /// Content already exists for the given evidence id.
    #[error("content already stored for evidence: {evidence_id}")]
    AlreadyStored {
        /// The evidence id that already has content.
        evidence_id: String,
    },

    /// Empty content is not allowed.
    #[error("empty content is not allowed")]
    EmptyContent,

    /// Content exceeds maximum allowed size.
    #[error("content too large: {size} bytes exceeds maximum of {max_size} bytes")]
    ContentTooLarge {
        /// The actual size.
        size: u64,
        /// The maximum allowed size.
        max_size: u64,
    },

    /// Total storage capacity exceeded.
    #[error(
        "vault full: total size {current_size} + {new_size} exceeds limit of {max_total_size} bytes"
    )]
    CapacityExceeded {
        /// Current total size.
        current_size: u64,
        /// Size of new content.
        new_size: u64,
        /// Maximum allowed total size.
        max_total_size: u64,
    },

    /// I/O error from the storage backend.
    #[error("vault I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of storing evidence content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredContent {
    /// SHA-256 fingerprint computed over the stored bytes.
    pub fingerprint: Fingerprint,

    /// Size of the stored content in bytes.
    pub size: u64,
}

/// Trait for evidence content storage backends.
///
/// Implementations must ensure:
/// 1. Content for an evidence id is written at most once
/// 2. The returned fingerprint covers exactly the bytes stored
/// 3. Reads stream; callers never need the payload fully in memory
pub trait EvidenceVault: Send + Sync {
    /// Stores content for an evidence item, consuming the reader.
    ///
    /// # Errors
    ///
    /// - [`VaultError::AlreadyStored`] if the item already has content
    /// - [`VaultError::EmptyContent`] if the reader yields no bytes
    /// - [`VaultError::ContentTooLarge`] if content exceeds the size limit
    /// - [`VaultError::Io`] if the backend fails mid-copy
    fn put_content(
        &self,
        evidence_id: &Uuid,
        reader: &mut dyn Read,
    ) -> Result<StoredContent, VaultError>;

    /// Opens the stored content for streaming reads.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotFound`] if the item has no stored content
    fn open_content(&self, evidence_id: &Uuid) -> Result<Box<dyn Read + Send>, VaultError>;

    /// Checks whether content exists for the given evidence id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn exists(&self, evidence_id: &Uuid) -> Result<bool, VaultError>;

    /// Returns the size of the stored content without reading it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotFound`] if the item has no stored content
    fn content_size(&self, evidence_id: &Uuid) -> Result<u64, VaultError>;
}

/// In-memory evidence vault for testing.
///
/// Stores all content in memory; not suitable for production payloads.
#[derive(Debug)]
pub struct MemoryVault {
    /// Content storage, keyed by evidence id.
    storage: Arc<RwLock<HashMap<Uuid, Vec<u8>>>>,
    /// Maximum total size allowed.
    max_total_size: u64,
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVault {
    /// Creates a new in-memory vault with the default size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_TOTAL_SIZE)
    }

    /// Creates a new in-memory vault with a custom size limit.
    #[must_use]
    pub fn with_max_size(max_total_size: u64) -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            max_total_size,
        }
    }

    /// Returns the number of stored payloads.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.read().expect("lock poisoned").len()
    }

    /// Returns true if the vault is empty.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.read().expect("lock poisoned").is_empty()
    }

    /// Returns the total size of all stored content in bytes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.storage
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Overwrites stored content, bypassing the immutability rule.
    ///
    /// Exists so tests can simulate a storage backend that was mutated
    /// out-of-band; the verifier is expected to catch the result.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    pub fn replace_content(&self, evidence_id: &Uuid, content: Vec<u8>) {
        self.storage
            .write()
            .expect("lock poisoned")
            .insert(*evidence_id, content);
    }
}

impl Clone for MemoryVault {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            max_total_size: self.max_total_size,
        }
    }
}

impl EvidenceVault for MemoryVault {
    fn put_content(
        &self,
        evidence_id: &Uuid,
        reader: &mut dyn Read,
    ) -> Result<StoredContent, VaultError> {
        if self.storage.read().expect("lock poisoned").contains_key(evidence_id) {
            return Err(VaultError::AlreadyStored {
                evidence_id: evidence_id.to_string(),
            });
        }

        // Read one byte past the cap so oversize content is detected
        // without buffering an unbounded stream.
        let mut content = Vec::new();
        reader.take(MAX_CONTENT_SIZE + 1).read_to_end(&mut content)?;

        if content.is_empty() {
            return Err(VaultError::EmptyContent);
        }
        let size = content.len() as u64;
        if size > MAX_CONTENT_SIZE {
            return Err(VaultError::ContentTooLarge {
                size,
                max_size: MAX_CONTENT_SIZE,
            });
        }

        let current_size = self.total_size();
        if current_size.saturating_add(size) > self.max_total_size {
            return Err(VaultError::CapacityExceeded {
                current_size,
                new_size: size,
                max_total_size: self.max_total_size,
            });
        }

        let mut hasher = FingerprintHasher::new();
        hasher.update(&content);
        let fingerprint = hasher.finalize();

        let mut storage = self.storage.write().expect("lock poisoned");
        if storage.contains_key(evidence_id) {
            return Err(VaultError::AlreadyStored {
                evidence_id: evidence_id.to_string(),
            });
        }
        storage.insert(*evidence_id, content);

        Ok(StoredContent { fingerprint, size })
    }

    fn open_content(&self, evidence_id: &Uuid) -> Result<Box<dyn Read + Send>, VaultError> {
        let storage = self.storage.read().expect("lock poisoned");
        let content = storage
            .get(evidence_id)
            .cloned()
            .ok_or_else(|| VaultError::NotFound {
                evidence_id: evidence_id.to_string(),
            })?;
        Ok(Box::new(std::io::Cursor::new(content)))
    }

    fn exists(&self, evidence_id: &Uuid) -> Result<bool, VaultError> {
        Ok(self.storage.read().expect("lock poisoned").contains_key(evidence_id))
    }

    fn content_size(&self, evidence_id: &Uuid) -> Result<u64, VaultError> {
        let storage = self.storage.read().expect("lock poisoned");
        storage
            .get(evidence_id)
            .map(|v| v.len() as u64)
            .ok_or_else(|| VaultError::NotFound {
                evidence_id: evidence_id.to_string(),
            })
    }
}
