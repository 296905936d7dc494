//! Engine event notifications.
//!
//! Every completed mutation and integrity check publishes one event to the
//! configured sink after the ledger transaction commits. Sinks are
//! fire-and-forget: a sink never fails the operation it observes, and an
//! event is not a substitute for the ledger row it describes.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::custody::{ApprovalStatus, CustodyAction};
use crate::evidence::EvidenceCategory;
use crate::verify::VerificationOutcome;

/// Notification of a completed engine operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new evidence item entered the registry.
    EvidenceRegistered {
        /// The new item's id.
        evidence_id: Uuid,
        /// The item's category.
        category: EvidenceCategory,
        /// Operator who registered it.
        registered_by: String,
        /// When the registration committed.
        at: DateTime<Utc>,
    },

    /// A custody entry was appended.
    EntryAppended {
        /// The owning evidence item.
        evidence_id: Uuid,
        /// The new entry's id.
        entry_id: Uuid,
        /// The entry's sequence number.
        sequence_no: u64,
        /// The custody action recorded.
        action: CustodyAction,
        /// `PENDING` for sensitive entries, `NONE` otherwise.
        approval_status: ApprovalStatus,
        /// Operator who recorded the entry.
        performed_by: String,
        /// True when the entry went through the corrective path.
        corrective: bool,
        /// When the append committed.
        at: DateTime<Utc>,
    },

    /// A pending entry was approved and joined the active chain.
    EntryApproved {
        /// The owning evidence item.
        evidence_id: Uuid,
        /// The decided entry's id.
        entry_id: Uuid,
        /// The chain position the entry received.
        chain_no: u64,
        /// Operator who approved.
        approved_by: String,
        /// When the decision committed.
        at: DateTime<Utc>,
    },

    /// A pending entry was rejected.
    EntryRejected {
        /// The owning evidence item.
        evidence_id: Uuid,
        /// The decided entry's id.
        entry_id: Uuid,
        /// Operator who rejected.
        rejected_by: String,
        /// When the decision committed.
        at: DateTime<Utc>,
    },

    /// An entry was administratively deleted.
    EntryDeleted {
        /// The owning evidence item.
        evidence_id: Uuid,
        /// The removed entry's id.
        entry_id: Uuid,
        /// Operator who deleted it.
        actor: String,
        /// When the deletion committed.
        at: DateTime<Utc>,
    },

    /// An evidence item was marked disposed.
    EvidenceDisposed {
        /// The disposed item.
        evidence_id: Uuid,
        /// Operator who recorded the disposal fact.
        actor: String,
        /// When the mark committed.
        at: DateTime<Utc>,
    },

    /// An integrity verification finished.
    IntegrityChecked {
        /// The verified item.
        evidence_id: Uuid,
        /// The verification verdict.
        outcome: VerificationOutcome,
        /// Bytes hashed during the check.
        bytes_hashed: u64,
        /// When the check finished.
        at: DateTime<Utc>,
    },
}

/// Trait for event consumers.
pub trait EventSink: Send + Sync {
    /// Delivers one event. Must not block for long and must not fail.
    fn publish(&self, event: &EngineEvent);
}

/// Sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: &EngineEvent) {}
}

/// Sink that buffers events in memory, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of buffered events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().expect("lock poisoned").len()
    }

    /// Returns true if no events are buffered.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().expect("lock poisoned").is_empty()
    }

    /// Removes and returns all buffered events in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    pub fn drain(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock().expect("lock poisoned"))
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &EngineEvent) {
        self.events.lock().expect("lock poisoned").push(event.clone());
    }
}

/// Sink that logs each event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &EngineEvent) {
        tracing::info!(event = ?event, "custody event");
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_memory_sink_buffers_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        let first = EngineEvent::EvidenceDisposed {
            evidence_id: Uuid::nil(),
            actor: "root".to_string(),
            at: Utc::now(),
        };
        let second = EngineEvent::EntryDeleted {
            evidence_id: Uuid::nil(),
            entry_id: Uuid::nil(),
            actor: "root".to_string(),
            at: Utc::now(),
        };
        sink.publish(&first);
        sink.publish(&second);

        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained, vec![first, second]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_events_tag_by_type() {
        let event = EngineEvent::EntryRejected {
            evidence_id: Uuid::nil(),
            entry_id: Uuid::nil(),
            rejected_by: "bob".to_string(),
            at: Utc::now(),
        };
        let value = serde_json::to_value(&event).expect("failed to serialize event");
        assert_eq!(value["type"], serde_json::json!("entry_rejected"));
        assert_eq!(value["rejected_by"], serde_json::json!("bob"));
    }
}
