//! Custody entry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::CustodyAction;
use super::status::ApprovalStatus;
use crate::error::CustodyError;
use crate::evidence::{require_bounded, require_nonempty, MAX_ACTOR_LEN, MAX_LOCATION_LEN};
use crate::ledger::chain::ChainHash;

/// Maximum length of an entry purpose note in bytes.
pub const MAX_PURPOSE_LEN: usize = 1024;

/// One recorded transfer or handling event for a piece of evidence.
///
/// Entries are immutable after append except for the approval transition,
/// which is a one-way `PENDING -> {APPROVED | REJECTED}` edge owned by the
/// approval coordinator. `sequence_no` is assigned by the ledger, never by
/// the caller, and is dense per evidence item. `chain_no` is the entry's
/// position in the active chain: assigned at append for non-sensitive
/// entries, at approval for sensitive ones, and never for pending or
/// rejected entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyEntry {
    /// Unique entry identifier.
    pub id: Uuid,

    /// The evidence item this entry belongs to.
    pub evidence_id: Uuid,

    /// Ledger-assigned position, dense and strictly increasing per item.
    pub sequence_no: u64,

    /// Position in the active chain, or `None` while the entry is
    /// pending or after it was rejected.
    pub chain_no: Option<u64>,

    /// The handling event this entry records.
    pub action: CustodyAction,

    /// Custodian the evidence was taken over from. `None` marks the
    /// start of the chain and is only permitted on an item's first entry.
    pub from_custodian: Option<String>,

    /// Custodian taking the evidence over.
    pub to_custodian: String,

    /// Location the evidence was moved from.
    pub from_location: Option<String>,

    /// Location the evidence was moved to.
    pub to_location: String,

    /// Free-text purpose or notes for the action.
    pub purpose: String,

    /// Operator who recorded the entry.
    pub performed_by: String,

    /// Server-assigned timestamp of the append.
    pub recorded_at: DateTime<Utc>,

    /// Whether this entry's action is sensitive, derived from the action
    /// rule table at append time.
    pub requires_approval: bool,

    /// Current approval state.
    pub approval_status: ApprovalStatus,

    /// Operator who decided the approval, once decided.
    pub approved_by: Option<String>,

    /// Timestamp of the approval decision, once decided.
    pub decided_at: Option<DateTime<Utc>>,

    /// Reason recorded with a rejection.
    pub decision_reason: Option<String>,

    /// Hash of the preceding entry in this item's record chain, or the
    /// genesis hash for the first entry.
    #[serde(with = "hex::serde")]
    pub prev_hash: ChainHash,

    /// Hash over this entry's append-time fields, linked to `prev_hash`.
    #[serde(with = "hex::serde")]
    pub entry_hash: ChainHash,
}

impl CustodyEntry {
    /// Returns whether this entry participates in the active chain.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.approval_status.is_active()
    }
}

/// Request to append a custody entry to an item's ledger.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// The evidence item to append to.
    pub evidence_id: Uuid,

    /// The handling event to record.
    pub action: CustodyAction,

    /// Custodian the evidence is taken over from; `None` only on the
    /// item's first entry.
    pub from_custodian: Option<String>,

    /// Custodian taking the evidence over.
    pub to_custodian: String,

    /// Location the evidence is moved from.
    pub from_location: Option<String>,

    /// Location the evidence is moved to.
    pub to_location: String,

    /// Free-text purpose or notes.
    pub purpose: String,

    /// Operator recording the entry.
    pub performed_by: String,
}

impl AppendRequest {
    /// Validates the request against field bounds.
    ///
    /// The `from_*` pair must be supplied together: a custodian without a
    /// location (or the reverse) cannot be checked for continuity.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), CustodyError> {
        require_nonempty("to_custodian", &self.to_custodian, MAX_ACTOR_LEN)?;
        require_nonempty("to_location", &self.to_location, MAX_LOCATION_LEN)?;
        require_bounded("purpose", &self.purpose, MAX_PURPOSE_LEN)?;
        require_nonempty("performed_by", &self.performed_by, MAX_ACTOR_LEN)?;

        if let Some(from) = &self.from_custodian {
            require_nonempty("from_custodian", from, MAX_ACTOR_LEN)?;
        }
        if let Some(from) = &self.from_location {
            require_nonempty("from_location", from, MAX_LOCATION_LEN)?;
        }
        if self.from_custodian.is_some() != self.from_location.is_some() {
            return Err(CustodyError::Validation {
                field: "from_location",
                reason: "from_custodian and from_location must be supplied together".to_string(),
            });
        }

        Ok(())
    }
}
