//! The custody engine: the single entry point for all operations.
//!
//! The engine owns the ledger and coordinates its collaborators:
//!
//! ```text
//!                  requests
//!                     │
//!               CustodyEngine ──── events ───> EventSink
//!               │     │     │
//!      CustodyLedger  │  IdentityDirectory
//!         (SQLite)    │    (operators)
//!                EvidenceVault
//!                  (content)
//! ```
//!
//! Every operator id is resolved through the directory before anything is
//! recorded, and administrative operations additionally require an
//! elevated role. Events publish after the ledger transaction commits;
//! they describe rows, they do not replace them.
//!
//! # Concurrency
//!
//! Mutations to one evidence item (appends, decisions, deletions, the
//! disposal mark) serialize on a per-item lock, so two operators racing on
//! the same item see a total order and dense sequence numbers. Different
//! items do not contend. Integrity verification deliberately takes no
//! lock: hashing a large payload must not block custody recording, and
//! its verdict applies to the content, not the chain.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use crate::approval::ApprovalDecision;
use crate::config::EngineConfig;
use crate::continuity::{self, ContinuityReport};
use crate::custody::{AppendRequest, CustodyEntry, MAX_PURPOSE_LEN};
use crate::error::CustodyError;
use crate::events::{EngineEvent, EventSink, NoopSink};
use crate::evidence::{require_nonempty, EvidenceItem, NewEvidence};
use crate::identity::{IdentityDirectory, ResolvedUser};
use crate::ledger::{AppendMode, CustodyLedger, EntryFilter, LedgerStats, SideRecord};
use crate::vault::EvidenceVault;
use crate::verify::{run_verification, CancelFlag, VerificationOutcome, VerificationReport};

/// Per-item mutation locks, created on first use.
struct ItemLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ItemLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn for_item(&self, evidence_id: &Uuid) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .entry(*evidence_id)
            .or_default()
            .clone()
    }
}

/// The chain-of-custody engine.
pub struct CustodyEngine {
    ledger: CustodyLedger,
    vault: Arc<dyn EvidenceVault>,
    identity: Arc<dyn IdentityDirectory>,
    sink: Arc<dyn EventSink>,
    locks: ItemLocks,
    config: EngineConfig,
}

impl CustodyEngine {
    /// Creates an engine over the given collaborators with no event sink.
    #[must_use]
    pub fn new(
        ledger: CustodyLedger,
        vault: Arc<dyn EvidenceVault>,
        identity: Arc<dyn IdentityDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            vault,
            identity,
            sink: Arc::new(NoopSink),
            locks: ItemLocks::new(),
            config,
        }
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Registers a new evidence item, optionally storing its content.
    ///
    /// When content is supplied, it streams into the vault and the
    /// SHA-256 fingerprint computed during the copy becomes the item's
    /// registered fingerprint. Without content the item registers with no
    /// fingerprint and integrity verification reports `NotApplicable`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed request, `Identity` for an
    /// unresolvable operator, or `Vault` if content storage fails.
    pub fn register_evidence(
        &self,
        new: NewEvidence,
        content: Option<&mut dyn Read>,
    ) -> Result<EvidenceItem, CustodyError> {
        self.resolve(&new.registered_by)?;
        new.validate()?;

        let mut item = new.into_item(None);
        if let Some(reader) = content {
            if !item.category.carries_fingerprint() {
                warn!(
                    evidence_id = %item.id,
                    category = %item.category,
                    "storing byte content for a non-digital item"
                );
            }
            let stored = self.vault.put_content(&item.id, reader)?;
            item.registered_fingerprint = Some(stored.fingerprint);
            info!(
                evidence_id = %item.id,
                size = stored.size,
                fingerprint = %stored.fingerprint,
                "stored evidence content"
            );
        }

        self.ledger.insert_item(&item)?;
        info!(
            evidence_id = %item.id,
            category = %item.category,
            registered_by = %item.registered_by,
            "registered evidence"
        );
        self.sink.publish(&EngineEvent::EvidenceRegistered {
            evidence_id: item.id,
            category: item.category,
            registered_by: item.registered_by.clone(),
            at: item.registered_at,
        });

        Ok(item)
    }

    /// Fetches an evidence item.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if no item exists with that id.
    pub fn get_evidence(&self, evidence_id: &Uuid) -> Result<EvidenceItem, CustodyError> {
        self.ledger.get_item(evidence_id)
    }

    /// Lists registered evidence items, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger query fails.
    pub fn list_evidence(&self) -> Result<Vec<EvidenceItem>, CustodyError> {
        self.ledger.list_items(self.config.list_limit)
    }

    /// Appends a custody entry through the continuity gate.
    ///
    /// Sensitive actions are recorded `PENDING` and stay inert until a
    /// second operator approves them.
    ///
    /// # Errors
    ///
    /// Returns `SequenceViolation` if the entry does not continue the
    /// active chain; nothing is recorded in that case.
    pub fn append_entry(&self, req: &AppendRequest) -> Result<CustodyEntry, CustodyError> {
        self.resolve(&req.performed_by)?;

        let lock = self.locks.for_item(&req.evidence_id);
        let _guard = lock.lock().expect("lock poisoned");

        let entry = self.ledger.append_entry(req, AppendMode::Strict)?;
        self.log_and_publish_append(&entry, false);
        Ok(entry)
    }

    /// Appends a custody entry that deliberately breaks continuity.
    ///
    /// The mismatch is not an error here: the entry is recorded, the
    /// reason lands in a side-record, and the gap stays visible to
    /// [`Self::validate_continuity`] permanently.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the reason is empty or the request is
    /// malformed.
    pub fn append_corrective(
        &self,
        req: &AppendRequest,
        reason: &str,
    ) -> Result<CustodyEntry, CustodyError> {
        require_nonempty("reason", reason, MAX_PURPOSE_LEN)?;
        self.resolve(&req.performed_by)?;

        let lock = self.locks.for_item(&req.evidence_id);
        let _guard = lock.lock().expect("lock poisoned");

        let entry = self
            .ledger
            .append_entry(req, AppendMode::Corrective { reason })?;
        self.log_and_publish_append(&entry, true);
        Ok(entry)
    }

    /// Fetches a single custody entry.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` or `EntryNotFound`.
    pub fn get_entry(
        &self,
        evidence_id: &Uuid,
        entry_id: &Uuid,
    ) -> Result<CustodyEntry, CustodyError> {
        self.ledger.get_entry(evidence_id, entry_id)
    }

    /// Lists custody entries for an item in sequence order.
    ///
    /// Active entries are always included; `include_pending` and
    /// `include_rejected` widen the view.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if the item does not exist.
    pub fn list_entries(
        &self,
        evidence_id: &Uuid,
        include_pending: bool,
        include_rejected: bool,
    ) -> Result<Vec<CustodyEntry>, CustodyError> {
        self.ledger.list_entries(
            evidence_id,
            EntryFilter {
                include_pending,
                include_rejected,
            },
            self.config.list_limit,
        )
    }

    /// Approves a pending entry, admitting it to the active chain.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalConflict` if the approver recorded the entry or
    /// the entry is no longer pending.
    pub fn approve_entry(
        &self,
        evidence_id: &Uuid,
        entry_id: &Uuid,
        approver: &str,
    ) -> Result<CustodyEntry, CustodyError> {
        self.resolve(approver)?;

        let lock = self.locks.for_item(evidence_id);
        let _guard = lock.lock().expect("lock poisoned");

        let entry = self.ledger.decide_entry(
            evidence_id,
            entry_id,
            approver,
            ApprovalDecision::Approved,
            None,
        )?;
        info!(
            evidence_id = %evidence_id,
            entry_id = %entry_id,
            approved_by = approver,
            chain_no = entry.chain_no,
            "approved custody entry"
        );
        self.sink.publish(&EngineEvent::EntryApproved {
            evidence_id: *evidence_id,
            entry_id: *entry_id,
            chain_no: entry.chain_no.unwrap_or_default(),
            approved_by: approver.to_string(),
            at: entry.decided_at.unwrap_or(entry.recorded_at),
        });
        Ok(entry)
    }

    /// Rejects a pending entry with a mandatory reason.
    ///
    /// The same conflict rules apply as for approval; rejecting is a
    /// decision too.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty reason, or `ApprovalConflict`
    /// under the same conditions as [`Self::approve_entry`].
    pub fn reject_entry(
        &self,
        evidence_id: &Uuid,
        entry_id: &Uuid,
        approver: &str,
        reason: &str,
    ) -> Result<CustodyEntry, CustodyError> {
        require_nonempty("reason", reason, MAX_PURPOSE_LEN)?;
        self.resolve(approver)?;

        let lock = self.locks.for_item(evidence_id);
        let _guard = lock.lock().expect("lock poisoned");

        let entry = self.ledger.decide_entry(
            evidence_id,
            entry_id,
            approver,
            ApprovalDecision::Rejected,
            Some(reason),
        )?;
        info!(
            evidence_id = %evidence_id,
            entry_id = %entry_id,
            rejected_by = approver,
            "rejected custody entry"
        );
        self.sink.publish(&EngineEvent::EntryRejected {
            evidence_id: *evidence_id,
            entry_id: *entry_id,
            rejected_by: approver.to_string(),
            at: entry.decided_at.unwrap_or(entry.recorded_at),
        });
        Ok(entry)
    }

    /// Validates hand-over continuity across the item's active chain.
    ///
    /// Gaps are findings, not errors; the report lists every one.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if the item does not exist.
    pub fn validate_continuity(
        &self,
        evidence_id: &Uuid,
    ) -> Result<ContinuityReport, CustodyError> {
        let chain = self.ledger.active_chain(evidence_id)?;
        let report = continuity::validate_chain(&chain);
        if !report.ok {
            warn!(
                evidence_id = %evidence_id,
                gaps = report.gaps.len(),
                "custody chain has continuity gaps"
            );
        }
        Ok(report)
    }

    /// Verifies the stored content against the registered fingerprint.
    ///
    /// Runs without the item lock; custody may continue while content is
    /// hashed. A `Mismatch` verdict comes back in the report, never as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` on cancellation, or a transient error if the
    /// content cannot be read.
    pub fn verify_integrity(
        &self,
        evidence_id: &Uuid,
        cancel: &CancelFlag,
    ) -> Result<VerificationReport, CustodyError> {
        let item = self.ledger.get_item(evidence_id)?;
        let report = run_verification(
            &item,
            self.vault.as_ref(),
            self.config.verify_chunk_size,
            cancel,
        )?;

        if report.outcome == VerificationOutcome::Mismatch {
            warn!(
                evidence_id = %evidence_id,
                registered = ?report.registered,
                recomputed = ?report.recomputed,
                "evidence content does not match its registered fingerprint"
            );
        } else {
            info!(
                evidence_id = %evidence_id,
                outcome = %report.outcome,
                bytes_hashed = report.bytes_hashed,
                "verified evidence integrity"
            );
        }
        self.sink.publish(&EngineEvent::IntegrityChecked {
            evidence_id: *evidence_id,
            outcome: report.outcome,
            bytes_hashed: report.bytes_hashed,
            at: report.verified_at,
        });
        Ok(report)
    }

    /// Administratively deletes a custody entry.
    ///
    /// Requires an elevated role. The deleted entry is preserved in a
    /// side-record, and the hole it leaves in the record hash chain stays
    /// detectable.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` without an elevated role, or
    /// `EntryNotFound` if the entry does not exist.
    pub fn delete_entry(
        &self,
        evidence_id: &Uuid,
        entry_id: &Uuid,
        actor: &str,
        reason: &str,
    ) -> Result<CustodyEntry, CustodyError> {
        require_nonempty("reason", reason, MAX_PURPOSE_LEN)?;
        let user = self.require_elevated(actor)?;

        let lock = self.locks.for_item(evidence_id);
        let _guard = lock.lock().expect("lock poisoned");

        let entry = self
            .ledger
            .delete_entry(evidence_id, entry_id, &user.id, reason)?;
        warn!(
            evidence_id = %evidence_id,
            entry_id = %entry_id,
            actor = %user.id,
            reason,
            "administratively deleted custody entry"
        );
        self.sink.publish(&EngineEvent::EntryDeleted {
            evidence_id: *evidence_id,
            entry_id: *entry_id,
            actor: user.id,
            at: chrono::Utc::now(),
        });
        Ok(entry)
    }

    /// Records the fact that an item was disposed outside the system.
    ///
    /// Requires an elevated role. Disposal is a soft mark: the item and
    /// its history stay readable and verifiable, but plain appends are
    /// refused from here on. The corrective path stays open for
    /// after-the-fact record repair.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` without an elevated role, or
    /// `EvidenceNotFound` if the item does not exist.
    pub fn mark_disposed(
        &self,
        evidence_id: &Uuid,
        actor: &str,
    ) -> Result<EvidenceItem, CustodyError> {
        let user = self.require_elevated(actor)?;

        let lock = self.locks.for_item(evidence_id);
        let _guard = lock.lock().expect("lock poisoned");

        self.ledger.mark_disposed(evidence_id)?;
        info!(evidence_id = %evidence_id, actor = %user.id, "marked evidence disposed");
        self.sink.publish(&EngineEvent::EvidenceDisposed {
            evidence_id: *evidence_id,
            actor: user.id,
            at: chrono::Utc::now(),
        });
        self.ledger.get_item(evidence_id)
    }

    /// Lists entries awaiting an approval decision.
    ///
    /// With no evidence id this is the engine-wide approval queue, oldest
    /// first. The queue is derived from entry state; there is no separate
    /// queue store to fall out of sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger query fails.
    pub fn list_pending(
        &self,
        evidence_id: Option<&Uuid>,
    ) -> Result<Vec<CustodyEntry>, CustodyError> {
        self.ledger.list_pending(evidence_id, self.config.list_limit)
    }

    /// Verifies the item's record hash chain.
    ///
    /// # Errors
    ///
    /// Returns `ChainBroken` if any stored entry was altered or removed
    /// outside normal operation.
    pub fn verify_chain(&self, evidence_id: &Uuid) -> Result<u64, CustodyError> {
        self.ledger.verify_chain(evidence_id)
    }

    /// Lists the side-records auditing exceptional operations on an item.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if the item does not exist.
    pub fn side_records(&self, evidence_id: &Uuid) -> Result<Vec<SideRecord>, CustodyError> {
        self.ledger
            .list_side_records(evidence_id, self.config.list_limit)
    }

    /// Gets statistics about the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    pub fn stats(&self) -> Result<LedgerStats, CustodyError> {
        self.ledger.stats()
    }

    fn resolve(&self, actor_id: &str) -> Result<ResolvedUser, CustodyError> {
        Ok(self.identity.resolve_user(actor_id)?)
    }

    fn require_elevated(&self, actor_id: &str) -> Result<ResolvedUser, CustodyError> {
        let user = self.resolve(actor_id)?;
        if !self.config.is_elevated(&user.role) {
            return Err(CustodyError::PermissionDenied {
                actor: actor_id.to_string(),
                required: self.config.elevated_roles.join(", "),
            });
        }
        Ok(user)
    }

    fn log_and_publish_append(&self, entry: &CustodyEntry, corrective: bool) {
        info!(
            evidence_id = %entry.evidence_id,
            entry_id = %entry.id,
            sequence_no = entry.sequence_no,
            action = %entry.action,
            status = %entry.approval_status,
            corrective,
            "appended custody entry"
        );
        self.sink.publish(&EngineEvent::EntryAppended {
            evidence_id: entry.evidence_id,
            entry_id: entry.id,
            sequence_no: entry.sequence_no,
            action: entry.action,
            approval_status: entry.approval_status,
            performed_by: entry.performed_by.clone(),
            corrective,
            at: entry.recorded_at,
        });
    }
}
