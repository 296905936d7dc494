//! End-to-end tests for the custody engine.
//!
//! Each test drives the full stack: registration, custody appends through
//! the continuity gate, four-eyes approval, continuity validation, and
//! streamed integrity verification.
//!
//! ```text
//! register ──> append ──> approve / reject ──> validate ──> verify
//!     │           │               │                │            │
//!     └───────────┴── CustodyLedger (SQLite) ──────┴────────────┘
//! ```

use std::sync::Arc;

use custodia_core::{
    AppendRequest, ApprovalStatus, CancelFlag, ConflictReason, CustodyAction, CustodyEngine,
    CustodyError, CustodyLedger, EngineConfig, EngineEvent, EvidenceCategory, Fingerprint,
    MemorySink, MemoryVault, NewEvidence, SideRecordKind, StaticDirectory, VerificationOutcome,
};
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

struct TestEngine {
    engine: CustodyEngine,
    vault: MemoryVault,
    sink: Arc<MemorySink>,
}

/// Engine over in-memory collaborators. `root` carries the admin role;
/// every other operator id resolves with the default role.
fn test_engine() -> TestEngine {
    let ledger = CustodyLedger::in_memory().expect("failed to create ledger");
    let vault = MemoryVault::new();
    let directory = StaticDirectory::new()
        .with_actor("root", "admin")
        .with_default_role("operator");
    let sink = Arc::new(MemorySink::new());

    let engine = CustodyEngine::new(
        ledger,
        Arc::new(vault.clone()),
        Arc::new(directory),
        EngineConfig::default(),
    )
    .with_event_sink(sink.clone());

    TestEngine { engine, vault, sink }
}

fn new_evidence(label: &str, category: EvidenceCategory) -> NewEvidence {
    NewEvidence {
        label: label.to_string(),
        category,
        storage_location: "locker-07".to_string(),
        retention_policy: "retain-5y".to_string(),
        registered_by: "alice".to_string(),
    }
}

fn first_entry(evidence_id: Uuid, custodian: &str, location: &str) -> AppendRequest {
    AppendRequest {
        evidence_id,
        action: CustodyAction::Collected,
        from_custodian: None,
        to_custodian: custodian.to_string(),
        from_location: None,
        to_location: location.to_string(),
        purpose: "initial collection".to_string(),
        performed_by: custodian.to_string(),
    }
}

fn transfer(
    evidence_id: Uuid,
    from: (&str, &str),
    to: (&str, &str),
    operator: &str,
) -> AppendRequest {
    AppendRequest {
        evidence_id,
        action: CustodyAction::Transferred,
        from_custodian: Some(from.0.to_string()),
        to_custodian: to.0.to_string(),
        from_location: Some(from.1.to_string()),
        to_location: to.1.to_string(),
        purpose: "handover".to_string(),
        performed_by: operator.to_string(),
    }
}

fn disposal(evidence_id: Uuid, from: (&str, &str), operator: &str) -> AppendRequest {
    AppendRequest {
        evidence_id,
        action: CustodyAction::Disposed,
        from_custodian: Some(from.0.to_string()),
        to_custodian: "disposal-facility".to_string(),
        from_location: Some(from.1.to_string()),
        to_location: "incinerator-bay".to_string(),
        purpose: "retention period elapsed".to_string(),
        performed_by: operator.to_string(),
    }
}

// ============================================================================
// Uninterrupted custody
// ============================================================================

/// A contiguous collect-transfer-transfer chain validates with no gaps.
#[test]
fn test_contiguous_transfers_validate_clean() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Seized laptop", EvidenceCategory::Physical), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    t.engine
        .append_entry(&transfer(item.id, ("alice", "locker-07"), ("bob", "lab-2"), "alice"))
        .expect("failed to append");
    t.engine
        .append_entry(&transfer(item.id, ("bob", "lab-2"), ("carol", "court-annex"), "bob"))
        .expect("failed to append");

    let report = t
        .engine
        .validate_continuity(&item.id)
        .expect("failed to validate");
    assert!(report.ok);
    assert_eq!(report.entries_checked, 3);
    assert!(report.gaps.is_empty());

    // The record hash chain is intact as well.
    assert_eq!(t.engine.verify_chain(&item.id).expect("failed to verify"), 3);
}

// ============================================================================
// Recorded discontinuity
// ============================================================================

/// A strict append that breaks continuity is rejected outright; the
/// corrective path records it and the validator reports the gap forever.
#[test]
fn test_recorded_discontinuity_reported_as_gap() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Backpack", EvidenceCategory::Physical), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    t.engine
        .append_entry(&transfer(item.id, ("alice", "locker-07"), ("bob", "lab-2"), "alice"))
        .expect("failed to append");

    // The item went missing and resurfaced with carol. A strict append
    // refuses the break and records nothing.
    let discontinuous = transfer(item.id, ("carol", "offsite"), ("dave", "archive"), "carol");
    let err = t
        .engine
        .append_entry(&discontinuous)
        .expect_err("gate should refuse the discontinuity");
    assert!(matches!(err, CustodyError::SequenceViolation { .. }));
    assert_eq!(
        t.engine
            .list_entries(&item.id, true, true)
            .expect("failed to list")
            .len(),
        2
    );

    // The corrective path records the same entry with a documented reason.
    t.engine
        .append_corrective(&discontinuous, "item recovered after loss in transit")
        .expect("corrective append should record");

    let report = t
        .engine
        .validate_continuity(&item.id)
        .expect("failed to validate");
    assert!(!report.ok);
    assert_eq!(report.entries_checked, 3);
    assert_eq!(report.gaps.len(), 1);

    let gap = &report.gaps[0];
    assert_eq!(gap.after_sequence_no, 2);
    assert_eq!(gap.expected_custodian, "bob");
    assert_eq!(gap.expected_location, "lab-2");
    assert_eq!(gap.found_custodian.as_deref(), Some("carol"));
    assert_eq!(gap.found_location.as_deref(), Some("offsite"));

    // The reason is preserved in the audit side-record.
    let records = t.engine.side_records(&item.id).expect("failed to list records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, SideRecordKind::CorrectiveAppend);
    assert_eq!(records[0].reason, "item recovered after loss in transit");
}

// ============================================================================
// Disposal approval
// ============================================================================

/// A disposal entry stays inert until a second operator approves it, and
/// the recording operator cannot be that second operator.
#[test]
fn test_pending_disposal_inert_until_approved() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Ledger book", EvidenceCategory::Document), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    let pending = t
        .engine
        .append_entry(&disposal(item.id, ("alice", "locker-07"), "alice"))
        .expect("failed to append");
    assert_eq!(pending.approval_status, ApprovalStatus::Pending);

    // Inert: not in the active chain, not in the default listing.
    let report = t
        .engine
        .validate_continuity(&item.id)
        .expect("failed to validate");
    assert_eq!(report.entries_checked, 1);
    assert_eq!(
        t.engine
            .list_entries(&item.id, false, false)
            .expect("failed to list")
            .len(),
        1
    );

    // The recording operator cannot wave it through.
    let err = t
        .engine
        .approve_entry(&item.id, &pending.id, "alice")
        .expect_err("self-approval must be refused");
    assert!(matches!(
        err,
        CustodyError::ApprovalConflict {
            reason: ConflictReason::SelfDecision,
            ..
        }
    ));

    // A second operator can.
    let approved = t
        .engine
        .approve_entry(&item.id, &pending.id, "bob")
        .expect("approval should succeed");
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("bob"));

    let report = t
        .engine
        .validate_continuity(&item.id)
        .expect("failed to validate");
    assert!(report.ok);
    assert_eq!(report.entries_checked, 2);
    assert_eq!(
        t.engine
            .list_entries(&item.id, false, false)
            .expect("failed to list")
            .len(),
        2
    );
}

/// Approve and reject race for the same decision; exactly one transition
/// out of `PENDING` exists.
#[test]
fn test_approval_decisions_are_exclusive() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Phone", EvidenceCategory::Physical), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    let pending = t
        .engine
        .append_entry(&disposal(item.id, ("alice", "locker-07"), "alice"))
        .expect("failed to append");

    t.engine
        .approve_entry(&item.id, &pending.id, "bob")
        .expect("first decision should succeed");

    let err = t
        .engine
        .reject_entry(&item.id, &pending.id, "carol", "second thoughts")
        .expect_err("the decision is already terminal");
    assert!(matches!(
        err,
        CustodyError::ApprovalConflict {
            reason: ConflictReason::AlreadyDecided {
                status: ApprovalStatus::Approved
            },
            ..
        }
    ));
}

/// A rejected entry stays recorded but never participates, and listings
/// only show it on request.
#[test]
fn test_rejected_entry_visible_only_on_request() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Folder", EvidenceCategory::Document), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    let pending = t
        .engine
        .append_entry(&disposal(item.id, ("alice", "locker-07"), "alice"))
        .expect("failed to append");

    let rejected = t
        .engine
        .reject_entry(&item.id, &pending.id, "bob", "retention period has not elapsed")
        .expect("rejection should succeed");
    assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);

    assert_eq!(
        t.engine
            .list_entries(&item.id, false, false)
            .expect("failed to list")
            .len(),
        1
    );
    assert_eq!(
        t.engine
            .list_entries(&item.id, false, true)
            .expect("failed to list")
            .len(),
        2
    );

    // An empty rejection reason is refused before anything is read.
    let another = t
        .engine
        .append_entry(&disposal(item.id, ("alice", "locker-07"), "alice"))
        .expect("failed to append");
    let err = t
        .engine
        .reject_entry(&item.id, &another.id, "bob", "")
        .expect_err("rejection requires a reason");
    assert!(matches!(err, CustodyError::Validation { field: "reason", .. }));
}

/// The approval queue is derived from entry state, engine-wide or
/// per item.
#[test]
fn test_pending_queue_is_derived() {
    let t = test_engine();
    let item_a = t
        .engine
        .register_evidence(new_evidence("Item A", EvidenceCategory::Physical), None)
        .expect("failed to register");
    let item_b = t
        .engine
        .register_evidence(new_evidence("Item B", EvidenceCategory::Physical), None)
        .expect("failed to register");

    for item in [&item_a, &item_b] {
        t.engine
            .append_entry(&first_entry(item.id, "alice", "locker-07"))
            .expect("failed to append");
        t.engine
            .append_entry(&disposal(item.id, ("alice", "locker-07"), "alice"))
            .expect("failed to append");
    }

    assert_eq!(t.engine.list_pending(None).expect("failed to list").len(), 2);

    let queue_a = t
        .engine
        .list_pending(Some(&item_a.id))
        .expect("failed to list");
    assert_eq!(queue_a.len(), 1);
    assert_eq!(queue_a[0].evidence_id, item_a.id);

    t.engine
        .approve_entry(&item_a.id, &queue_a[0].id, "bob")
        .expect("approval should succeed");
    assert_eq!(t.engine.list_pending(None).expect("failed to list").len(), 1);
}

// ============================================================================
// Content integrity
// ============================================================================

/// Registration with content fixes the fingerprint; an out-of-band change
/// to stored content comes back as a Mismatch verdict, not an error.
#[test]
fn test_storage_mutation_detected() {
    let t = test_engine();
    let content = b"forensic disk image".repeat(500);

    let item = t
        .engine
        .register_evidence(
            new_evidence("Disk image", EvidenceCategory::Digital),
            Some(&mut content.as_slice()),
        )
        .expect("failed to register");
    let registered = item
        .registered_fingerprint
        .expect("content registration must fix a fingerprint");
    assert_eq!(registered, Fingerprint::compute(&content));

    let report = t
        .engine
        .verify_integrity(&item.id, &CancelFlag::new())
        .expect("verification should complete");
    assert_eq!(report.outcome, VerificationOutcome::Match);
    assert_eq!(report.bytes_hashed, content.len() as u64);

    // Mutate the stored bytes behind the engine's back.
    let mut altered = content.clone();
    altered[17] ^= 0xff;
    t.vault.replace_content(&item.id, altered);

    let report = t
        .engine
        .verify_integrity(&item.id, &CancelFlag::new())
        .expect("a mismatch still completes");
    assert_eq!(report.outcome, VerificationOutcome::Mismatch);
    assert!(!report.outcome.is_match());
    assert_eq!(report.registered, Some(registered));
    assert_ne!(report.recomputed, Some(registered));

    // The registered fingerprint itself never moved.
    let fetched = t.engine.get_evidence(&item.id).expect("failed to fetch");
    assert_eq!(fetched.registered_fingerprint, Some(registered));
}

/// Items registered without content verify as NotApplicable.
#[test]
fn test_verification_not_applicable_without_fingerprint() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Witness statement", EvidenceCategory::Testimonial), None)
        .expect("failed to register");
    assert!(item.registered_fingerprint.is_none());

    let report = t
        .engine
        .verify_integrity(&item.id, &CancelFlag::new())
        .expect("verification should complete");
    assert_eq!(report.outcome, VerificationOutcome::NotApplicable);
    assert_eq!(report.bytes_hashed, 0);
}

// ============================================================================
// Identity and permissions
// ============================================================================

/// Registration and appends validate their inputs before recording.
#[test]
fn test_register_validates_input() {
    let t = test_engine();

    let mut bad = new_evidence("", EvidenceCategory::Physical);
    let err = t
        .engine
        .register_evidence(bad.clone(), None)
        .expect_err("empty label must be refused");
    assert!(matches!(err, CustodyError::Validation { field: "label", .. }));

    bad.label = "Crate".to_string();
    bad.storage_location = String::new();
    let err = t
        .engine
        .register_evidence(bad, None)
        .expect_err("empty location must be refused");
    assert!(matches!(
        err,
        CustodyError::Validation {
            field: "storage_location",
            ..
        }
    ));
}

/// With a closed directory, unknown operator ids are refused before
/// anything lands in the ledger.
#[test]
fn test_unknown_operator_refused() {
    let ledger = CustodyLedger::in_memory().expect("failed to create ledger");
    let directory = StaticDirectory::new().with_actor("alice", "operator");
    let engine = CustodyEngine::new(
        ledger,
        Arc::new(MemoryVault::new()),
        Arc::new(directory),
        EngineConfig::default(),
    );

    let err = engine
        .register_evidence(
            NewEvidence {
                label: "Crate".to_string(),
                category: EvidenceCategory::Physical,
                storage_location: "locker-07".to_string(),
                retention_policy: "retain-5y".to_string(),
                registered_by: "ghost".to_string(),
            },
            None,
        )
        .expect_err("unknown operator must be refused");
    assert!(matches!(err, CustodyError::Identity(_)));
    assert!(!err.is_transient());
}

/// Administrative deletion needs an elevated role, audits itself, and
/// leaves a detectable hole in the record chain.
#[test]
fn test_delete_entry_requires_elevated_role() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Notebook", EvidenceCategory::Physical), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    let doomed = t
        .engine
        .append_entry(&transfer(item.id, ("alice", "locker-07"), ("bob", "lab-2"), "alice"))
        .expect("failed to append");
    t.engine
        .append_entry(&transfer(item.id, ("bob", "lab-2"), ("carol", "court-annex"), "bob"))
        .expect("failed to append");

    // An ordinary operator is refused.
    let err = t
        .engine
        .delete_entry(&item.id, &doomed.id, "alice", "recorded against the wrong item")
        .expect_err("ordinary operators cannot delete");
    match err {
        CustodyError::PermissionDenied { actor, required } => {
            assert_eq!(actor, "alice");
            assert!(required.contains("admin"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The admin path works and audits itself.
    t.engine
        .delete_entry(&item.id, &doomed.id, "root", "recorded against the wrong item")
        .expect("admin deletion should succeed");
    let records = t.engine.side_records(&item.id).expect("failed to list records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, SideRecordKind::EntryDeleted);

    let err = t
        .engine
        .verify_chain(&item.id)
        .expect_err("the hole must stay detectable");
    assert!(matches!(err, CustodyError::ChainBroken { .. }));
}

/// The disposal mark is elevated, soft, and terminal for plain appends.
#[test]
fn test_mark_disposed_is_elevated_and_soft() {
    let t = test_engine();
    let content = b"archived image";
    let item = t
        .engine
        .register_evidence(
            new_evidence("Old disk", EvidenceCategory::Digital),
            Some(&mut content.as_slice()),
        )
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");

    let err = t
        .engine
        .mark_disposed(&item.id, "alice")
        .expect_err("ordinary operators cannot mark disposal");
    assert!(matches!(err, CustodyError::PermissionDenied { .. }));

    let disposed = t
        .engine
        .mark_disposed(&item.id, "root")
        .expect("admin disposal mark should succeed");
    assert!(disposed.disposed);

    // Custody can no longer change through the plain path.
    let err = t
        .engine
        .append_entry(&transfer(item.id, ("alice", "locker-07"), ("bob", "lab-2"), "alice"))
        .expect_err("disposed items accept no plain appends");
    assert!(matches!(err, CustodyError::Validation { .. }));

    // History stays readable and verifiable.
    assert_eq!(
        t.engine
            .list_entries(&item.id, true, true)
            .expect("failed to list")
            .len(),
        1
    );
    let report = t
        .engine
        .verify_integrity(&item.id, &CancelFlag::new())
        .expect("verification still runs");
    assert_eq!(report.outcome, VerificationOutcome::Match);
}

// ============================================================================
// Events
// ============================================================================

/// Completed operations publish one event each, in commit order.
#[test]
fn test_events_published_in_commit_order() {
    let t = test_engine();
    let item = t
        .engine
        .register_evidence(new_evidence("Camera", EvidenceCategory::Physical), None)
        .expect("failed to register");

    t.engine
        .append_entry(&first_entry(item.id, "alice", "locker-07"))
        .expect("failed to append");
    let pending = t
        .engine
        .append_entry(&disposal(item.id, ("alice", "locker-07"), "alice"))
        .expect("failed to append");
    t.engine
        .approve_entry(&item.id, &pending.id, "bob")
        .expect("approval should succeed");
    t.engine
        .verify_integrity(&item.id, &CancelFlag::new())
        .expect("verification should complete");

    let events = t.sink.drain();
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], EngineEvent::EvidenceRegistered { .. }));
    assert!(matches!(
        events[1],
        EngineEvent::EntryAppended {
            sequence_no: 1,
            corrective: false,
            ..
        }
    ));
    assert!(matches!(
        events[2],
        EngineEvent::EntryAppended {
            approval_status: ApprovalStatus::Pending,
            ..
        }
    ));
    assert!(matches!(
        events[3],
        EngineEvent::EntryApproved { chain_no: 2, .. }
    ));
    assert!(matches!(
        events[4],
        EngineEvent::IntegrityChecked {
            outcome: VerificationOutcome::NotApplicable,
            ..
        }
    ));

    // A refused operation publishes nothing.
    let err = t
        .engine
        .append_entry(&transfer(item.id, ("nobody", "nowhere"), ("bob", "lab-2"), "bob"))
        .expect_err("gate should refuse");
    assert!(matches!(err, CustodyError::SequenceViolation { .. }));
    assert!(t.sink.is_empty());
}
