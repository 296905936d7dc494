//! Streamed integrity verification of evidence content.
//!
//! Verification re-reads stored content in bounded chunks, recomputes the
//! SHA-256 fingerprint, and compares it against the fingerprint fixed at
//! registration. Three distinctions carry the whole module:
//!
//! - A mismatch is a [`VerificationOutcome`], not an error. The check ran
//!   to completion and produced a verdict; callers must be able to tell
//!   "the content changed" apart from "the check could not run".
//! - An item with no registered fingerprint verifies as `NotApplicable`.
//!   Physical evidence has nothing to hash.
//! - Transient faults (unreachable vault, read error, cancellation) are
//!   errors and never verdicts. They are retryable; a verdict is final
//!   for the content as it stood.
//!
//! Verification takes no lock on the item. Custody may advance while a
//! large payload is being hashed; the verdict applies to the content, not
//! the chain.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CustodyError;
use crate::evidence::EvidenceItem;
use crate::fingerprint::{Fingerprint, FingerprintHasher};
use crate::vault::EvidenceVault;

/// Default chunk size for streamed hashing (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Cooperative cancellation handle for a running verification.
///
/// Clones share the same flag. Cancellation is checked between chunks, so
/// a cancelled verification stops within one chunk of the request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

/// Verdict of a completed integrity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// Recomputed fingerprint equals the registered fingerprint.
    Match,

    /// Recomputed fingerprint differs: the content changed since
    /// registration, or the registration itself was wrong.
    Mismatch,

    /// The item has no registered fingerprint; there is nothing to verify.
    NotApplicable,
}

impl VerificationOutcome {
    /// Returns the canonical string representation of this outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::Mismatch => "MISMATCH",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }

    /// True only for [`Self::Match`].
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The verified item.
    pub evidence_id: Uuid,

    /// The verdict.
    pub outcome: VerificationOutcome,

    /// The fingerprint fixed at registration, if any.
    pub registered: Option<Fingerprint>,

    /// The fingerprint recomputed from stored content. Absent for
    /// `NotApplicable` runs.
    pub recomputed: Option<Fingerprint>,

    /// Number of content bytes hashed.
    pub bytes_hashed: u64,

    /// When the verification finished.
    pub verified_at: DateTime<Utc>,
}

/// Runs one integrity verification over an item's stored content.
///
/// # Errors
///
/// - [`CustodyError::Interrupted`] if `cancel` fires before the content is
///   fully hashed
/// - [`CustodyError::Vault`] if the content cannot be opened
/// - [`CustodyError::Io`] if a read fails mid-stream
///
/// A `Mismatch` verdict is returned in the report, never as an error.
pub fn run_verification(
    item: &EvidenceItem,
    vault: &dyn EvidenceVault,
    chunk_size: usize,
    cancel: &CancelFlag,
) -> Result<VerificationReport, CustodyError> {
    let Some(registered) = item.registered_fingerprint else {
        return Ok(VerificationReport {
            evidence_id: item.id,
            outcome: VerificationOutcome::NotApplicable,
            registered: None,
            recomputed: None,
            bytes_hashed: 0,
            verified_at: Utc::now(),
        });
    };

    let mut reader = vault.open_content(&item.id)?;
    let mut hasher = FingerprintHasher::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        if cancel.is_cancelled() {
            return Err(CustodyError::Interrupted {
                evidence_id: item.id.to_string(),
            });
        }
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let bytes_hashed = hasher.bytes_hashed();
    let recomputed = hasher.finalize();
    let outcome = if registered.matches(&recomputed) {
        VerificationOutcome::Match
    } else {
        VerificationOutcome::Mismatch
    };

    Ok(VerificationReport {
        evidence_id: item.id,
        outcome,
        registered: Some(registered),
        recomputed: Some(recomputed),
        bytes_hashed,
        verified_at: Utc::now(),
    })
}

#[cfg(test)]
mod unit_tests {
    use chrono::Utc;

    use super::*;
    use crate::evidence::EvidenceCategory;
    use crate::vault::MemoryVault;

    fn item_with(fingerprint: Option<Fingerprint>) -> EvidenceItem {
        EvidenceItem {
            id: Uuid::new_v4(),
            label: "Disk image".to_string(),
            category: EvidenceCategory::Digital,
            registered_fingerprint: fingerprint,
            storage_location: "vault-a".to_string(),
            retention_policy: "retain-5y".to_string(),
            registered_by: "alice".to_string(),
            registered_at: Utc::now(),
            disposed: false,
        }
    }

    #[test]
    fn test_matching_content_verifies() {
        let vault = MemoryVault::new();
        let content = b"forensic image payload".repeat(100);
        let item = item_with(Some(Fingerprint::compute(&content)));
        vault
            .put_content(&item.id, &mut content.as_slice())
            .expect("failed to store content");

        // A chunk size smaller than the payload forces multiple reads.
        let report = run_verification(&item, &vault, 64, &CancelFlag::new())
            .expect("verification should complete");
        assert_eq!(report.outcome, VerificationOutcome::Match);
        assert!(report.outcome.is_match());
        assert_eq!(report.bytes_hashed, content.len() as u64);
        assert_eq!(report.recomputed, item.registered_fingerprint);
    }

    #[test]
    fn test_changed_content_is_a_verdict_not_an_error() {
        let vault = MemoryVault::new();
        let item = item_with(Some(Fingerprint::compute(b"original bytes")));
        vault
            .put_content(&item.id, &mut "tampered bytes".as_bytes())
            .expect("failed to store content");

        let report = run_verification(&item, &vault, 64, &CancelFlag::new())
            .expect("a mismatch still completes");
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);
        assert_ne!(report.recomputed, report.registered);
    }

    #[test]
    fn test_no_fingerprint_is_not_applicable() {
        let vault = MemoryVault::new();
        let item = item_with(None);

        let report = run_verification(&item, &vault, 64, &CancelFlag::new())
            .expect("nothing to verify still completes");
        assert_eq!(report.outcome, VerificationOutcome::NotApplicable);
        assert_eq!(report.bytes_hashed, 0);
        assert!(report.recomputed.is_none());
    }

    #[test]
    fn test_missing_content_is_transient() {
        let vault = MemoryVault::new();
        let item = item_with(Some(Fingerprint::compute(b"never stored")));

        let err = run_verification(&item, &vault, 64, &CancelFlag::new())
            .expect_err("missing content cannot produce a verdict");
        assert!(matches!(err, CustodyError::Vault(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_cancellation_interrupts() {
        let vault = MemoryVault::new();
        let content = b"large payload".repeat(1000);
        let item = item_with(Some(Fingerprint::compute(&content)));
        vault
            .put_content(&item.id, &mut content.as_slice())
            .expect("failed to store content");

        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = run_verification(&item, &vault, 64, &cancel)
            .expect_err("cancelled verification must not produce a verdict");
        assert!(matches!(err, CustodyError::Interrupted { .. }));
        assert!(err.is_transient());
    }
}
