//! `SQLite`-backed custody ledger.
//!
//! The ledger uses `SQLite` with WAL mode. All writes for one evidence item
//! happen inside a single transaction on a single shared connection, so a
//! reader never observes a half-written append or decision.

// SQLite exposes row ids and counts as i64; they are never negative here.
// Mutex poisoning means another thread panicked mid-operation, which is
// unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc
)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chain::{entry_payload, ChainHash, EntryHasher, CHAIN_HASH_SIZE, GENESIS_CHAIN_HASH};
use crate::approval::{self, ApprovalDecision};
use crate::custody::{AppendRequest, ApprovalStatus, CustodyEntry};
use crate::error::CustodyError;
use crate::evidence::{EvidenceCategory, EvidenceItem};
use crate::fingerprint::Fingerprint;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Column list for evidence item queries.
const ITEM_COLUMNS: &str = "id, label, category, registered_fingerprint, storage_location, \
     retention_policy, registered_by, registered_at, disposed";

/// Column list for custody entry queries.
const ENTRY_COLUMNS: &str = "id, evidence_id, sequence_no, chain_no, action, from_custodian, \
     to_custodian, from_location, to_location, purpose, performed_by, recorded_at, \
     requires_approval, approval_status, approved_by, decided_at, decision_reason, \
     prev_hash, entry_hash";

/// How an append interacts with the continuity gate.
#[derive(Debug, Clone, Copy)]
pub enum AppendMode<'a> {
    /// Normal append: a continuity mismatch rejects the entry and records
    /// nothing.
    Strict,

    /// Deliberately records a discontinuity (e.g. evidence recovered after
    /// a break in custody). The gate is skipped, the reason is written to
    /// an immutable side-record, and the resulting gap stays visible to
    /// the continuity validator forever.
    Corrective {
        /// Why the discontinuity is being recorded.
        reason: &'a str,
    },
}

/// Which entries a listing includes beyond the active ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilter {
    /// Include entries still awaiting an approval decision.
    pub include_pending: bool,

    /// Include rejected entries.
    pub include_rejected: bool,
}

impl EntryFilter {
    /// Active entries only (`NONE` and `APPROVED`).
    #[must_use]
    pub const fn active_only() -> Self {
        Self {
            include_pending: false,
            include_rejected: false,
        }
    }

    /// Every entry regardless of approval state.
    #[must_use]
    pub const fn everything() -> Self {
        Self {
            include_pending: true,
            include_rejected: true,
        }
    }
}

/// Kind of an exceptional-operation audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideRecordKind {
    /// An entry was administratively deleted; the snapshot preserves it.
    EntryDeleted,

    /// An entry was appended through the corrective path.
    CorrectiveAppend,
}

impl SideRecordKind {
    /// Returns the canonical string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EntryDeleted => "ENTRY_DELETED",
            Self::CorrectiveAppend => "CORRECTIVE_APPEND",
        }
    }

    /// Parses a side-record kind from a string.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the string is not a recognized kind.
    pub fn parse(s: &str) -> Result<Self, CustodyError> {
        match s {
            "ENTRY_DELETED" => Ok(Self::EntryDeleted),
            "CORRECTIVE_APPEND" => Ok(Self::CorrectiveAppend),
            _ => Err(CustodyError::Validation {
                field: "side_record_kind",
                reason: format!("unrecognized kind: {s}"),
            }),
        }
    }
}

/// Immutable audit record of an exceptional operation.
///
/// Side-records are never updated or deleted; in particular, deleting a
/// custody entry never removes the audit of the deletion itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideRecord {
    /// Row id, assigned by the ledger.
    pub id: Option<u64>,

    /// The evidence item the operation concerned.
    pub evidence_id: Uuid,

    /// What kind of exceptional operation happened.
    pub kind: SideRecordKind,

    /// The entry involved, where one was.
    pub entry_id: Option<Uuid>,

    /// JSON snapshot of the affected state at the time of the operation.
    pub snapshot: serde_json::Value,

    /// Operator-supplied justification.
    pub reason: String,

    /// Operator who performed the operation.
    pub actor: String,

    /// Server-assigned timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// Statistics about the ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    /// Total number of registered evidence items.
    pub evidence_count: u64,

    /// Total number of custody entries across all items.
    pub entry_count: u64,

    /// Number of entries awaiting an approval decision.
    pub pending_count: u64,

    /// Total number of side-records.
    pub side_record_count: u64,

    /// Database file size in bytes.
    pub db_size_bytes: u64,
}

/// The append-only custody ledger backed by `SQLite`.
///
/// Entries carry monotonically increasing, dense sequence numbers per
/// evidence item and are immutable once written, apart from the guarded
/// approval transition. The only delete path is the audited administrative
/// removal, which preserves a snapshot side-record.
pub struct CustodyLedger {
    conn: Arc<Mutex<Connection>>,
    #[allow(dead_code)]
    path: Option<PathBuf>,
}

impl CustodyLedger {
    /// Opens or creates a ledger at the specified path.
    ///
    /// If the database doesn't exist, it is created with the appropriate
    /// schema. WAL mode is enabled for concurrent reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CustodyError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory ledger for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, CustodyError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Initialize the connection with schema and pragmas.
    fn initialize_connection(conn: &Connection) -> Result<(), CustodyError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Registers an evidence item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be inserted.
    pub fn insert_item(&self, item: &EvidenceItem) -> Result<(), CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");

        conn.execute(
            "INSERT INTO evidence_items (id, label, category, registered_fingerprint, \
             storage_location, retention_policy, registered_by, registered_at, disposed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.id.to_string(),
                item.label,
                item.category.as_str(),
                item.registered_fingerprint.as_ref().map(Fingerprint::to_hex),
                item.storage_location,
                item.retention_policy,
                item.registered_by,
                item.registered_at.to_rfc3339(),
                item.disposed,
            ],
        )?;

        Ok(())
    }

    /// Fetches an evidence item by id.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if no item exists with that id.
    pub fn get_item(&self, evidence_id: &Uuid) -> Result<EvidenceItem, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");
        item_tx(&conn, evidence_id)?.ok_or_else(|| CustodyError::EvidenceNotFound {
            evidence_id: evidence_id.to_string(),
        })
    }

    /// Lists registered evidence items, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_items(&self, limit: u64) -> Result<Vec<EvidenceItem>, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");

        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM evidence_items
             ORDER BY registered_at DESC, id ASC
             LIMIT ?1"
        ))?;

        let items = stmt
            .query_map(params![limit], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Records the soft disposal fact for an item.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if no item exists with that id.
    pub fn mark_disposed(&self, evidence_id: &Uuid) -> Result<(), CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");

        let changed = conn.execute(
            "UPDATE evidence_items SET disposed = 1 WHERE id = ?1",
            params![evidence_id.to_string()],
        )?;

        if changed == 0 {
            return Err(CustodyError::EvidenceNotFound {
                evidence_id: evidence_id.to_string(),
            });
        }
        Ok(())
    }

    /// Appends a custody entry.
    ///
    /// Assigns the item's next sequence number and, for non-sensitive
    /// entries, the next active-chain position. Sensitive entries are
    /// created `PENDING` with no chain position; they reserve their
    /// sequence number but stay inert until approved.
    ///
    /// In [`AppendMode::Strict`], a non-sensitive entry whose `from_*`
    /// does not match the active chain tail is rejected with
    /// `SequenceViolation` and nothing is recorded. In
    /// [`AppendMode::Corrective`], the gate is skipped and the
    /// discontinuity is documented in a side-record.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound`, `Validation`, `SequenceViolation`, or a
    /// database error.
    pub fn append_entry(
        &self,
        req: &AppendRequest,
        mode: AppendMode<'_>,
    ) -> Result<CustodyEntry, CustodyError> {
        req.validate()?;

        let mut conn = self.conn.lock().expect("lock poisoned");
        let tx = conn.transaction()?;

        let evidence_id = req.evidence_id;
        let item =
            item_tx(&tx, &evidence_id)?.ok_or_else(|| CustodyError::EvidenceNotFound {
                evidence_id: evidence_id.to_string(),
            })?;

        if item.disposed && matches!(mode, AppendMode::Strict) {
            return Err(CustodyError::Validation {
                field: "evidence_id",
                reason: "item is disposed; custody can no longer change".to_string(),
            });
        }

        let sequence_no = next_sequence_no(&tx, &evidence_id)?;

        if req.from_custodian.is_none() && sequence_no != 1 {
            return Err(CustodyError::Validation {
                field: "from_custodian",
                reason: "a null from_custodian is only permitted on the first entry".to_string(),
            });
        }

        let sensitive = req.action.requires_approval();
        let tail = active_tail_tx(&tx, &evidence_id)?;

        if !sensitive && matches!(mode, AppendMode::Strict) {
            if let Some(tail) = &tail {
                let continuous = req.from_custodian.as_deref() == Some(tail.to_custodian.as_str())
                    && req.from_location.as_deref() == Some(tail.to_location.as_str());
                if !continuous {
                    return Err(CustodyError::SequenceViolation {
                        evidence_id: evidence_id.to_string(),
                        expected_custodian: tail.to_custodian.clone(),
                        expected_location: tail.to_location.clone(),
                        found_custodian: req.from_custodian.clone(),
                        found_location: req.from_location.clone(),
                    });
                }
            }
        }

        let chain_no = if sensitive {
            None
        } else {
            Some(next_chain_no(&tx, &evidence_id)?)
        };
        let prev_hash = last_chain_hash_tx(&tx, &evidence_id)?;

        let mut entry = CustodyEntry {
            id: Uuid::new_v4(),
            evidence_id,
            sequence_no,
            chain_no,
            action: req.action,
            from_custodian: req.from_custodian.clone(),
            to_custodian: req.to_custodian.clone(),
            from_location: req.from_location.clone(),
            to_location: req.to_location.clone(),
            purpose: req.purpose.clone(),
            performed_by: req.performed_by.clone(),
            recorded_at: Utc::now(),
            requires_approval: sensitive,
            approval_status: if sensitive {
                ApprovalStatus::Pending
            } else {
                ApprovalStatus::None
            },
            approved_by: None,
            decided_at: None,
            decision_reason: None,
            prev_hash,
            entry_hash: [0u8; CHAIN_HASH_SIZE],
        };
        entry.entry_hash = EntryHasher::hash_entry(&entry_payload(&entry), &entry.prev_hash);

        tx.execute(
            &format!(
                "INSERT INTO custody_entries ({ENTRY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
                 ?15, ?16, ?17, ?18, ?19)"
            ),
            params![
                entry.id.to_string(),
                entry.evidence_id.to_string(),
                entry.sequence_no,
                entry.chain_no,
                entry.action.as_str(),
                entry.from_custodian,
                entry.to_custodian,
                entry.from_location,
                entry.to_location,
                entry.purpose,
                entry.performed_by,
                entry.recorded_at.to_rfc3339(),
                entry.requires_approval,
                entry.approval_status.as_str(),
                entry.approved_by,
                entry.decided_at.map(|t| t.to_rfc3339()),
                entry.decision_reason,
                entry.prev_hash.as_slice(),
                entry.entry_hash.as_slice(),
            ],
        )?;

        if let AppendMode::Corrective { reason } = mode {
            let snapshot = serde_json::json!({
                "entry": entry,
                "chain_tail_custodian": tail.as_ref().map(|t| t.to_custodian.clone()),
                "chain_tail_location": tail.as_ref().map(|t| t.to_location.clone()),
            });
            insert_side_record_tx(
                &tx,
                &SideRecord {
                    id: None,
                    evidence_id,
                    kind: SideRecordKind::CorrectiveAppend,
                    entry_id: Some(entry.id),
                    snapshot,
                    reason: reason.to_string(),
                    actor: entry.performed_by.clone(),
                    recorded_at: Utc::now(),
                },
            )?;
        }

        tx.commit()?;
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
        let conn = self.conn.lock().expect("lock poisoned");
        require_item_tx(&conn, evidence_id)?;
        entry_tx(&conn, evidence_id, entry_id)?.ok_or_else(|| CustodyError::EntryNotFound {
            evidence_id: evidence_id.to_string(),
            entry_id: entry_id.to_string(),
        })
    }

    /// Lists custody entries for an item, ordered by sequence number.
    ///
    /// Active entries (`NONE`, `APPROVED`) are always included; the filter
    /// adds pending and rejected ones.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if the item does not exist.
    pub fn list_entries(
        &self,
        evidence_id: &Uuid,
        filter: EntryFilter,
        limit: u64,
    ) -> Result<Vec<CustodyEntry>, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");
        require_item_tx(&conn, evidence_id)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM custody_entries
             WHERE evidence_id = ?1
               AND (approval_status IN ('NONE', 'APPROVED')
                    OR (?2 AND approval_status = 'PENDING')
                    OR (?3 AND approval_status = 'REJECTED'))
             ORDER BY sequence_no ASC
             LIMIT ?4"
        ))?;

        let entries = stmt
            .query_map(
                params![
                    evidence_id.to_string(),
                    filter.include_pending,
                    filter.include_rejected,
                    limit
                ],
                row_to_entry,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Returns the active chain for an item in chain order.
    ///
    /// Chain order differs from sequence order when a sensitive entry was
    /// approved after later entries were appended: the approved entry
    /// participates from the moment of approval.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if the item does not exist.
    pub fn active_chain(&self, evidence_id: &Uuid) -> Result<Vec<CustodyEntry>, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");
        require_item_tx(&conn, evidence_id)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM custody_entries
             WHERE evidence_id = ?1 AND chain_no IS NOT NULL
             ORDER BY chain_no ASC"
        ))?;

        let entries = stmt
            .query_map(params![evidence_id.to_string()], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Applies an approval decision to a pending entry.
    ///
    /// The transition is a compare-and-swap on `approval_status`: the row
    /// is re-read inside the transaction, the decision rules are checked,
    /// and the update is guarded by `approval_status = 'PENDING'` so a
    /// concurrent decision from another process cannot apply twice. On
    /// approval the entry receives the item's next chain position.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound`, `EntryNotFound`, or `ApprovalConflict`.
    pub fn decide_entry(
        &self,
        evidence_id: &Uuid,
        entry_id: &Uuid,
        decider: &str,
        decision: ApprovalDecision,
        reason: Option<&str>,
    ) -> Result<CustodyEntry, CustodyError> {
        let mut conn = self.conn.lock().expect("lock poisoned");
        let tx = conn.transaction()?;

        require_item_tx(&tx, evidence_id)?;
        let entry = entry_tx(&tx, evidence_id, entry_id)?.ok_or_else(|| {
            CustodyError::EntryNotFound {
                evidence_id: evidence_id.to_string(),
                entry_id: entry_id.to_string(),
            }
        })?;

        approval::check_decision(&entry, decider)?;

        let decided_at = Utc::now();
        let changed = match decision {
            ApprovalDecision::Approved => {
                let chain_no = next_chain_no(&tx, evidence_id)?;
                tx.execute(
                    "UPDATE custody_entries
                     SET approval_status = 'APPROVED', approved_by = ?1, decided_at = ?2,
                         decision_reason = ?3, chain_no = ?4
                     WHERE evidence_id = ?5 AND id = ?6 AND approval_status = 'PENDING'",
                    params![
                        decider,
                        decided_at.to_rfc3339(),
                        reason,
                        chain_no,
                        evidence_id.to_string(),
                        entry_id.to_string(),
                    ],
                )?
            }
            ApprovalDecision::Rejected => tx.execute(
                "UPDATE custody_entries
                 SET approval_status = 'REJECTED', approved_by = ?1, decided_at = ?2,
                     decision_reason = ?3
                 WHERE evidence_id = ?4 AND id = ?5 AND approval_status = 'PENDING'",
                params![
                    decider,
                    decided_at.to_rfc3339(),
                    reason,
                    evidence_id.to_string(),
                    entry_id.to_string(),
                ],
            )?,
        };

        if changed == 0 {
            // Lost the swap to a decision applied outside this connection.
            let current = entry_tx(&tx, evidence_id, entry_id)?;
            return Err(match current {
                None => CustodyError::EntryNotFound {
                    evidence_id: evidence_id.to_string(),
                    entry_id: entry_id.to_string(),
                },
                Some(e) => CustodyError::ApprovalConflict {
                    entry_id: entry_id.to_string(),
                    reason: crate::error::ConflictReason::AlreadyDecided {
                        status: e.approval_status,
                    },
                },
            });
        }

        let decided = entry_tx(&tx, evidence_id, entry_id)?.ok_or_else(|| {
            CustodyError::EntryNotFound {
                evidence_id: evidence_id.to_string(),
                entry_id: entry_id.to_string(),
            }
        })?;

        tx.commit()?;
        Ok(decided)
    }

    /// Administratively deletes a custody entry.
    ///
    /// The full entry is snapshotted into a side-record before the row is
    /// removed, so the audit of the deletion outlives the deletion. Any
    /// continuity or record-chain break this causes is deliberately left
    /// visible to [`Self::verify_chain`] and the continuity validator.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` or `EntryNotFound`.
    pub fn delete_entry(
        &self,
        evidence_id: &Uuid,
        entry_id: &Uuid,
        actor: &str,
        reason: &str,
    ) -> Result<CustodyEntry, CustodyError> {
        let mut conn = self.conn.lock().expect("lock poisoned");
        let tx = conn.transaction()?;

        require_item_tx(&tx, evidence_id)?;
        let entry = entry_tx(&tx, evidence_id, entry_id)?.ok_or_else(|| {
            CustodyError::EntryNotFound {
                evidence_id: evidence_id.to_string(),
                entry_id: entry_id.to_string(),
            }
        })?;

        insert_side_record_tx(
            &tx,
            &SideRecord {
                id: None,
                evidence_id: *evidence_id,
                kind: SideRecordKind::EntryDeleted,
                entry_id: Some(*entry_id),
                snapshot: serde_json::to_value(&entry)?,
                reason: reason.to_string(),
                actor: actor.to_string(),
                recorded_at: Utc::now(),
            },
        )?;

        tx.execute(
            "DELETE FROM custody_entries WHERE evidence_id = ?1 AND id = ?2",
            params![evidence_id.to_string(), entry_id.to_string()],
        )?;

        tx.commit()?;
        Ok(entry)
    }

    /// Lists entries awaiting an approval decision, oldest first.
    ///
    /// With no evidence id this is the engine-wide approval queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_pending(
        &self,
        evidence_id: Option<&Uuid>,
        limit: u64,
    ) -> Result<Vec<CustodyEntry>, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");

        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM custody_entries
             WHERE approval_status = 'PENDING'
               AND (?1 IS NULL OR evidence_id = ?1)
             ORDER BY recorded_at ASC, sequence_no ASC
             LIMIT ?2"
        ))?;

        let entries = stmt
            .query_map(
                params![evidence_id.map(Uuid::to_string), limit],
                row_to_entry,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Lists side-records for an item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceNotFound` if the item does not exist.
    pub fn list_side_records(
        &self,
        evidence_id: &Uuid,
        limit: u64,
    ) -> Result<Vec<SideRecord>, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");
        require_item_tx(&conn, evidence_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, evidence_id, kind, entry_id, snapshot, reason, actor, recorded_at
             FROM side_records
             WHERE evidence_id = ?1
             ORDER BY id ASC
             LIMIT ?2",
        )?;

        let records = stmt
            .query_map(params![evidence_id.to_string(), limit], row_to_side_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Verifies the record hash chain for an item.
    ///
    /// Walks every entry in sequence order (pending and rejected included;
    /// they are part of the record) and checks each link. Returns the
    /// number of entries verified.
    ///
    /// # Errors
    ///
    /// Returns `ChainBroken` at the first entry whose link fails, which
    /// indicates rows were altered or removed outside normal operation.
    pub fn verify_chain(&self, evidence_id: &Uuid) -> Result<u64, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");
        require_item_tx(&conn, evidence_id)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM custody_entries
             WHERE evidence_id = ?1
             ORDER BY sequence_no ASC"
        ))?;

        let entries = stmt
            .query_map(params![evidence_id.to_string()], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut expected_prev = GENESIS_CHAIN_HASH;
        let mut verified = 0u64;

        for entry in &entries {
            if entry.prev_hash != expected_prev {
                return Err(CustodyError::ChainBroken {
                    evidence_id: evidence_id.to_string(),
                    sequence_no: entry.sequence_no,
                    details: "previous-hash link does not match the preceding entry".to_string(),
                });
            }
            let payload = entry_payload(entry);
            if !EntryHasher::verify_link(&payload, &entry.prev_hash, &entry.entry_hash) {
                return Err(CustodyError::ChainBroken {
                    evidence_id: evidence_id.to_string(),
                    sequence_no: entry.sequence_no,
                    details: "entry hash does not match stored fields".to_string(),
                });
            }
            expected_prev = entry.entry_hash;
            verified += 1;
        }

        Ok(verified)
    }

    /// Gets statistics about the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    pub fn stats(&self) -> Result<LedgerStats, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");

        let evidence_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM evidence_items", [], |row| row.get(0))?;

        let entry_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM custody_entries", [], |row| row.get(0))?;

        let pending_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM custody_entries WHERE approval_status = 'PENDING'",
            [],
            |row| row.get(0),
        )?;

        let side_record_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM side_records", [], |row| row.get(0))?;

        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

        Ok(LedgerStats {
            evidence_count: evidence_count as u64,
            entry_count: entry_count as u64,
            pending_count: pending_count as u64,
            side_record_count: side_record_count as u64,
            db_size_bytes: (page_count * page_size) as u64,
        })
    }

    /// Verifies that WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal mode cannot be queried.
    pub fn verify_wal_mode(&self) -> Result<bool, CustodyError> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(mode.to_lowercase() == "wal")
    }
}

// --- transaction-scoped helpers ---------------------------------------------

fn item_tx(conn: &Connection, evidence_id: &Uuid) -> Result<Option<EvidenceItem>, CustodyError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM evidence_items WHERE id = ?1"
    ))?;
    let item = stmt
        .query_row(params![evidence_id.to_string()], row_to_item)
        .optional()?;
    Ok(item)
}

fn require_item_tx(conn: &Connection, evidence_id: &Uuid) -> Result<(), CustodyError> {
    if item_tx(conn, evidence_id)?.is_none() {
        return Err(CustodyError::EvidenceNotFound {
            evidence_id: evidence_id.to_string(),
        });
    }
    Ok(())
}

fn entry_tx(
    conn: &Connection,
    evidence_id: &Uuid,
    entry_id: &Uuid,
) -> Result<Option<CustodyEntry>, CustodyError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM custody_entries WHERE evidence_id = ?1 AND id = ?2"
    ))?;
    let entry = stmt
        .query_row(
            params![evidence_id.to_string(), entry_id.to_string()],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

fn next_sequence_no(conn: &Connection, evidence_id: &Uuid) -> Result<u64, CustodyError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(sequence_no) FROM custody_entries WHERE evidence_id = ?1",
        params![evidence_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0) as u64 + 1)
}

fn next_chain_no(conn: &Connection, evidence_id: &Uuid) -> Result<u64, CustodyError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(chain_no) FROM custody_entries WHERE evidence_id = ?1",
        params![evidence_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0) as u64 + 1)
}

fn active_tail_tx(
    conn: &Connection,
    evidence_id: &Uuid,
) -> Result<Option<CustodyEntry>, CustodyError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM custody_entries
         WHERE evidence_id = ?1 AND chain_no IS NOT NULL
         ORDER BY chain_no DESC
         LIMIT 1"
    ))?;
    let entry = stmt
        .query_row(params![evidence_id.to_string()], row_to_entry)
        .optional()?;
    Ok(entry)
}

fn last_chain_hash_tx(conn: &Connection, evidence_id: &Uuid) -> Result<ChainHash, CustodyError> {
    let hash: Option<Vec<u8>> = conn
        .query_row(
            "SELECT entry_hash FROM custody_entries
             WHERE evidence_id = ?1
             ORDER BY sequence_no DESC
             LIMIT 1",
            params![evidence_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match hash {
        None => Ok(GENESIS_CHAIN_HASH),
        Some(bytes) => {
            bytes
                .try_into()
                .map_err(|_| CustodyError::ChainBroken {
                    evidence_id: evidence_id.to_string(),
                    sequence_no: 0,
                    details: format!("stored hash is not {CHAIN_HASH_SIZE} bytes"),
                })
        }
    }
}

fn insert_side_record_tx(conn: &Connection, record: &SideRecord) -> Result<(), CustodyError> {
    conn.execute(
        "INSERT INTO side_records (evidence_id, kind, entry_id, snapshot, reason, actor, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.evidence_id.to_string(),
            record.kind.as_str(),
            record.entry_id.map(|id| id.to_string()),
            record.snapshot.to_string(),
            record.reason,
            record.actor,
            record.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

// --- row mapping -------------------------------------------------------------

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<EvidenceItem> {
    Ok(EvidenceItem {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        label: row.get(1)?,
        category: parse_category(2, &row.get::<_, String>(2)?)?,
        registered_fingerprint: row
            .get::<_, Option<String>>(3)?
            .map(|s| parse_fingerprint(3, &s))
            .transpose()?,
        storage_location: row.get(4)?,
        retention_policy: row.get(5)?,
        registered_by: row.get(6)?,
        registered_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
        disposed: row.get::<_, i64>(8)? != 0,
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CustodyEntry> {
    Ok(CustodyEntry {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        evidence_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        sequence_no: row.get::<_, i64>(2)? as u64,
        chain_no: row.get::<_, Option<i64>>(3)?.map(|n| n as u64),
        action: parse_action(4, &row.get::<_, String>(4)?)?,
        from_custodian: row.get(5)?,
        to_custodian: row.get(6)?,
        from_location: row.get(7)?,
        to_location: row.get(8)?,
        purpose: row.get(9)?,
        performed_by: row.get(10)?,
        recorded_at: parse_timestamp(11, &row.get::<_, String>(11)?)?,
        requires_approval: row.get::<_, i64>(12)? != 0,
        approval_status: parse_status(13, &row.get::<_, String>(13)?)?,
        approved_by: row.get(14)?,
        decided_at: row
            .get::<_, Option<String>>(15)?
            .map(|s| parse_timestamp(15, &s))
            .transpose()?,
        decision_reason: row.get(16)?,
        prev_hash: parse_hash(17, row.get::<_, Vec<u8>>(17)?)?,
        entry_hash: parse_hash(18, row.get::<_, Vec<u8>>(18)?)?,
    })
}

fn row_to_side_record(row: &Row<'_>) -> rusqlite::Result<SideRecord> {
    let snapshot_text: String = row.get(4)?;
    Ok(SideRecord {
        id: Some(row.get::<_, i64>(0)? as u64),
        evidence_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        kind: parse_side_record_kind(2, &row.get::<_, String>(2)?)?,
        entry_id: row
            .get::<_, Option<String>>(3)?
            .map(|s| parse_uuid(3, &s))
            .transpose()?,
        snapshot: serde_json::from_str(&snapshot_text)
            .map_err(|e| conversion_error(4, Type::Text, e))?,
        reason: row.get(5)?,
        actor: row.get(6)?,
        recorded_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
    })
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_category(idx: usize, s: &str) -> rusqlite::Result<EvidenceCategory> {
    EvidenceCategory::parse(s).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_action(idx: usize, s: &str) -> rusqlite::Result<crate::custody::CustodyAction> {
    crate::custody::CustodyAction::parse(s).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_status(idx: usize, s: &str) -> rusqlite::Result<ApprovalStatus> {
    ApprovalStatus::parse(s).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_fingerprint(idx: usize, s: &str) -> rusqlite::Result<Fingerprint> {
    Fingerprint::from_hex(s).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_side_record_kind(idx: usize, s: &str) -> rusqlite::Result<SideRecordKind> {
    SideRecordKind::parse(s).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_hash(idx: usize, bytes: Vec<u8>) -> rusqlite::Result<ChainHash> {
    ChainHash::try_from(bytes.as_slice()).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Blob,
            format!("chain hash must be {CHAIN_HASH_SIZE} bytes").into(),
        )
    })
}
