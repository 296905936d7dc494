//! Evidence registry and chain-of-custody engine.
//!
//! Custodia keeps two records about every piece of evidence:
//!
//! - a registry row describing the item itself, including the SHA-256
//!   fingerprint fixed when digital content was registered, and
//! - an append-only chain of custody entries describing every hand-over,
//!   analysis, and disposition, hash-chained per item.
//!
//! On top of those it provides hand-over continuity validation, four-eyes
//! approval for sensitive actions, and streamed integrity verification of
//! stored content.
//!
//! # Architecture
//!
//! ```text
//!                     CustodyEngine
//!         ┌───────────────┼──────────────────┐
//!   CustodyLedger   EvidenceVault    IdentityDirectory
//!     (SQLite)        (content)        (operators)
//!         │
//!         └── continuity / approval / verify (pure rules)
//! ```
//!
//! The ledger is the source of truth. Events, continuity reports, and the
//! approval queue are derived from it and carry no state of their own.
//!
//! # Security
//!
//! - Custody entries are immutable once written; the only removal path is
//!   the audited administrative delete, and the per-item hash chain makes
//!   out-of-band row changes detectable
//! - Fingerprint comparison is constant-time
//! - Sensitive dispositions require a second operator; the recording
//!   operator can never decide their own entry

#![forbid(unsafe_code)]

pub mod approval;
pub mod config;
pub mod continuity;
pub mod custody;
pub mod engine;
pub mod error;
pub mod events;
pub mod evidence;
pub mod fingerprint;
pub mod identity;
pub mod ledger;
pub mod vault;
pub mod verify;

pub use approval::ApprovalDecision;
pub use config::{ConfigError, EngineConfig, IdentityConfig};
pub use continuity::{ContinuityReport, CustodyGap};
pub use custody::{AppendRequest, ApprovalStatus, CustodyAction, CustodyEntry};
pub use engine::CustodyEngine;
pub use error::{ConflictReason, CustodyError};
pub use events::{EngineEvent, EventSink, MemorySink, NoopSink, TracingSink};
pub use evidence::{EvidenceCategory, EvidenceItem, NewEvidence};
pub use fingerprint::{Fingerprint, FingerprintHasher, FINGERPRINT_SIZE};
pub use identity::{IdentityDirectory, IdentityError, ResolvedUser, StaticDirectory};
pub use ledger::{
    AppendMode, CustodyLedger, EntryFilter, LedgerStats, SideRecord, SideRecordKind,
};
pub use vault::{EvidenceVault, MemoryVault, StoredContent, VaultError};
pub use verify::{CancelFlag, VerificationOutcome, VerificationReport};
