//! Continuity validation over an item's active custody chain.
//!
//! Validation is a pure pass over the already-accepted chain: it takes the
//! active entries in chain order and checks that each entry's source matches
//! its predecessor's destination. It never mutates the ledger and never
//! stops at the first finding; a chain with three breaks reports three gaps.
//!
//! A gap is not an error. Corrective appends put discontinuities into the
//! record on purpose, and this validator is how they stay visible.

use serde::{Deserialize, Serialize};

use crate::custody::CustodyEntry;

/// A point in the active chain where custody does not hand over cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyGap {
    /// Sequence number of the entry the chain was continuous up to.
    pub after_sequence_no: u64,

    /// Custodian that entry handed the item to.
    pub expected_custodian: String,

    /// Location that entry placed the item at.
    pub expected_location: String,

    /// Custodian the next entry claims to have taken the item from.
    pub found_custodian: Option<String>,

    /// Location the next entry claims to have taken the item from.
    pub found_location: Option<String>,
}

/// Result of validating an item's active chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuityReport {
    /// True when no gaps were found.
    pub ok: bool,

    /// Number of active entries examined.
    pub entries_checked: u64,

    /// Every discontinuity found, in chain order.
    pub gaps: Vec<CustodyGap>,
}

/// Validates hand-over continuity across a chain of active entries.
///
/// The slice must be in chain order (the order entries became active, which
/// is not always sequence order once approvals are involved). Pending and
/// rejected entries must not be included; they do not participate in
/// custody.
///
/// The first entry's source is never checked. An item enters the chain
/// either from outside the system (no source) or from a recorded external
/// party, and neither needs a predecessor.
#[must_use]
pub fn validate_chain(chain: &[CustodyEntry]) -> ContinuityReport {
    let mut gaps = Vec::new();

    for pair in chain.windows(2) {
        let prev = &pair[0];
        let next = &pair[1];
        if !hands_over(prev, next) {
            gaps.push(CustodyGap {
                after_sequence_no: prev.sequence_no,
                expected_custodian: prev.to_custodian.clone(),
                expected_location: prev.to_location.clone(),
                found_custodian: next.from_custodian.clone(),
                found_location: next.from_location.clone(),
            });
        }
    }

    ContinuityReport {
        ok: gaps.is_empty(),
        entries_checked: chain.len() as u64,
        gaps,
    }
}

/// True when `next` takes the item exactly where `prev` left it.
fn hands_over(prev: &CustodyEntry, next: &CustodyEntry) -> bool {
    next.from_custodian.as_deref() == Some(prev.to_custodian.as_str())
        && next.from_location.as_deref() == Some(prev.to_location.as_str())
}

#[cfg(test)]
mod unit_tests {
    use uuid::Uuid;

    use super::*;
    use crate::custody::{ApprovalStatus, CustodyAction};
    use crate::ledger::chain::GENESIS_CHAIN_HASH;

    fn entry(sequence_no: u64, from: Option<(&str, &str)>, to: (&str, &str)) -> CustodyEntry {
        CustodyEntry {
            id: Uuid::new_v4(),
            evidence_id: Uuid::nil(),
            sequence_no,
            chain_no: Some(sequence_no),
            action: CustodyAction::Transferred,
            from_custodian: from.map(|f| f.0.to_string()),
            to_custodian: to.0.to_string(),
            from_location: from.map(|f| f.1.to_string()),
            to_location: to.1.to_string(),
            purpose: "handover".to_string(),
            performed_by: "alice".to_string(),
            recorded_at: chrono::Utc::now(),
            requires_approval: false,
            approval_status: ApprovalStatus::None,
            approved_by: None,
            decided_at: None,
            decision_reason: None,
            prev_hash: GENESIS_CHAIN_HASH,
            entry_hash: GENESIS_CHAIN_HASH,
        }
    }

    #[test]
    fn test_empty_chain_is_clean() {
        let report = validate_chain(&[]);
        assert!(report.ok);
        assert_eq!(report.entries_checked, 0);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn test_single_entry_is_clean() {
        let report = validate_chain(&[entry(1, None, ("alice", "locker-07"))]);
        assert!(report.ok);
        assert_eq!(report.entries_checked, 1);
    }

    #[test]
    fn test_contiguous_chain_is_clean() {
        let chain = vec![
            entry(1, None, ("alice", "locker-07")),
            entry(2, Some(("alice", "locker-07")), ("bob", "lab-2")),
            entry(3, Some(("bob", "lab-2")), ("carol", "court-annex")),
        ];
        let report = validate_chain(&chain);
        assert!(report.ok);
        assert_eq!(report.entries_checked, 3);
    }

    #[test]
    fn test_gap_reports_both_sides() {
        let chain = vec![
            entry(1, None, ("alice", "locker-07")),
            entry(2, Some(("bob", "lab-2")), ("carol", "court-annex")),
        ];
        let report = validate_chain(&chain);
        assert!(!report.ok);
        assert_eq!(report.gaps.len(), 1);

        let gap = &report.gaps[0];
        assert_eq!(gap.after_sequence_no, 1);
        assert_eq!(gap.expected_custodian, "alice");
        assert_eq!(gap.expected_location, "locker-07");
        assert_eq!(gap.found_custodian.as_deref(), Some("bob"));
        assert_eq!(gap.found_location.as_deref(), Some("lab-2"));
    }

    #[test]
    fn test_location_only_mismatch_is_a_gap() {
        let chain = vec![
            entry(1, None, ("alice", "locker-07")),
            entry(2, Some(("alice", "lab-2")), ("bob", "lab-2")),
        ];
        let report = validate_chain(&chain);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].found_custodian.as_deref(), Some("alice"));
    }

    #[test]
    fn test_validation_is_exhaustive() {
        let chain = vec![
            entry(1, None, ("alice", "locker-07")),
            entry(2, Some(("bob", "lab-2")), ("carol", "court-annex")),
            entry(3, Some(("carol", "court-annex")), ("dave", "archive")),
            entry(4, Some(("eve", "unknown")), ("frank", "vault")),
        ];
        let report = validate_chain(&chain);
        assert!(!report.ok);
        assert_eq!(report.gaps.len(), 2);
        assert_eq!(report.gaps[0].after_sequence_no, 1);
        assert_eq!(report.gaps[1].after_sequence_no, 3);
    }

    #[test]
    fn test_missing_source_mid_chain_is_a_gap() {
        let chain = vec![
            entry(1, None, ("alice", "locker-07")),
            entry(2, None, ("bob", "lab-2")),
        ];
        let report = validate_chain(&chain);
        assert_eq!(report.gaps.len(), 1);
        assert!(report.gaps[0].found_custodian.is_none());
        assert!(report.gaps[0].found_location.is_none());
    }
}
