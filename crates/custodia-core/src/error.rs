//! Error taxonomy for custody operations.
//!
//! Every exposed operation returns either a success payload or one of the
//! kinds below; none returns partial state. Two classes matter to callers:
//!
//! - **Caller errors** (`Validation`, `*NotFound`, `SequenceViolation`,
//!   `ApprovalConflict`, `PermissionDenied`): recoverable by correcting the
//!   request, never retried automatically.
//! - **Transient errors** (`Vault`, `Database`, `Io`, `Interrupted`, and an
//!   unavailable identity directory): the operation could not complete and
//!   may be retried by the caller. See [`CustodyError::is_transient`].
//!
//! A failed content fingerprint comparison is deliberately *not* in this
//! enum. Integrity mismatch is a verification result
//! ([`crate::verify::VerificationOutcome::Mismatch`]), and conflating it
//! with a transient storage fault would let a retry loop mask evidence
//! tampering.

use thiserror::Error;

use crate::custody::ApprovalStatus;
use crate::identity::IdentityError;
use crate::vault::VaultError;

/// Errors returned by custody engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CustodyError {
    /// Malformed input: missing required field, unrecognized token, or a
    /// value outside its documented bounds.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The request field that failed validation.
        field: &'static str,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Referenced evidence item does not exist.
    #[error("evidence not found: {evidence_id}")]
    EvidenceNotFound {
        /// The evidence id that was not found.
        evidence_id: String,
    },

    /// Referenced custody entry does not exist for the given item.
    #[error("custody entry not found: {entry_id} (evidence {evidence_id})")]
    EntryNotFound {
        /// The owning evidence id.
        evidence_id: String,
        /// The entry id that was not found.
        entry_id: String,
    },

    /// A non-sensitive entry's `from_*` does not match the last active
    /// entry's `to_*`. Nothing was recorded; the caller must submit a
    /// corrective entry instead. Surfaced verbatim, never auto-corrected.
    #[error(
        "sequence violation for evidence {evidence_id}: \
         custody chain ends at {expected_custodian} / {expected_location}"
    )]
    SequenceViolation {
        /// The evidence item whose chain was violated.
        evidence_id: String,
        /// Custodian recorded by the current chain tail.
        expected_custodian: String,
        /// Location recorded by the current chain tail.
        expected_location: String,
        /// Custodian the rejected entry claimed to take over from.
        found_custodian: Option<String>,
        /// Location the rejected entry claimed to take over from.
        found_location: Option<String>,
    },

    /// Self-approval attempt or re-decision of an already-terminal
    /// approval. Fatal to the specific call, not to the session.
    #[error("approval conflict for entry {entry_id}: {reason}")]
    ApprovalConflict {
        /// The entry whose decision was refused.
        entry_id: String,
        /// Why the decision was refused.
        reason: ConflictReason,
    },

    /// Administrative operation attempted without an elevated role.
    #[error("permission denied for {actor}: requires one of [{required}]")]
    PermissionDenied {
        /// The actor that attempted the operation.
        actor: String,
        /// Comma-separated list of roles that would be accepted.
        required: String,
    },

    /// The per-item entry hash chain failed verification. Indicates the
    /// ledger rows were altered or removed outside normal operation.
    #[error("custody chain broken for evidence {evidence_id} at sequence {sequence_no}: {details}")]
    ChainBroken {
        /// The evidence item whose record chain is broken.
        evidence_id: String,
        /// Sequence number of the first entry that failed verification.
        sequence_no: u64,
        /// Details about the failure.
        details: String,
    },

    /// Integrity verification was cancelled before completion. No state
    /// was changed; the caller may retry.
    #[error("verification interrupted for evidence {evidence_id}")]
    Interrupted {
        /// The evidence item whose verification was interrupted.
        evidence_id: String,
    },

    /// Identity directory failure while resolving an actor.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Storage collaborator failure while reading or writing content.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to serialize an audit snapshot.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during a streamed operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CustodyError {
    /// Returns true if the operation may be retried without changing the
    /// request.
    ///
    /// Classification is by kind, not by inspecting the underlying fault:
    /// an unreachable vault and a deleted blob are indistinguishable here,
    /// and both are system conditions rather than integrity verdicts.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Vault(_) | Self::Database(_) | Self::Io(_) | Self::Interrupted { .. } => true,
            Self::Identity(err) => matches!(err, IdentityError::Unavailable { .. }),
            _ => false,
        }
    }
}

/// Reason an approval decision was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The deciding operator is the operator who recorded the entry.
    SelfDecision,

    /// The entry already carries a terminal approval status.
    AlreadyDecided {
        /// The terminal status the entry already carries.
        status: ApprovalStatus,
    },

    /// The entry never required approval (its status is `NONE`).
    NotPending,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfDecision => {
                write!(f, "the recording operator cannot decide their own entry")
            }
            Self::AlreadyDecided { status } => {
                write!(f, "entry is already {status}")
            }
            Self::NotPending => write!(f, "entry does not require approval"),
        }
    }
}
