//! Four-eyes approval for sensitive custody entries.
//!
//! Sensitive actions (disposal, return, court presentation) are recorded
//! immediately but stay inert until a second operator decides them:
//!
//! ```text
//!        append (sensitive)
//!               |
//!               v
//!            PENDING ---approve---> APPROVED   (joins the active chain)
//!               |
//!               +------reject-----> REJECTED   (never joins)
//! ```
//!
//! `PENDING` is the only state a decision applies to, and the transition
//! out of it happens exactly once. The rules here are pure; the ledger
//! re-checks them inside the decision transaction and guards the row
//! update on the still-pending status, so two racing decisions cannot
//! both land.

use crate::custody::{ApprovalStatus, CustodyEntry};
use crate::error::{ConflictReason, CustodyError};

/// The decision a reviewing operator applies to a pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Accept the entry into the active chain.
    Approved,

    /// Refuse the entry; it stays recorded but never participates.
    Rejected,
}

/// Checks whether `decider` may decide `entry`.
///
/// # Errors
///
/// Returns `ApprovalConflict` when the entry is not pending or when the
/// decider is the operator who recorded it. The self-decision rule applies
/// to rejections as much as approvals; waving an entry through and waving
/// it away are both decisions.
pub fn check_decision(entry: &CustodyEntry, decider: &str) -> Result<(), CustodyError> {
    match entry.approval_status {
        ApprovalStatus::Pending => {}
        ApprovalStatus::None => {
            return Err(CustodyError::ApprovalConflict {
                entry_id: entry.id.to_string(),
                reason: ConflictReason::NotPending,
            });
        }
        status @ (ApprovalStatus::Approved | ApprovalStatus::Rejected) => {
            return Err(CustodyError::ApprovalConflict {
                entry_id: entry.id.to_string(),
                reason: ConflictReason::AlreadyDecided { status },
            });
        }
    }

    if decider == entry.performed_by {
        return Err(CustodyError::ApprovalConflict {
            entry_id: entry.id.to_string(),
            reason: ConflictReason::SelfDecision,
        });
    }

    Ok(())
}
