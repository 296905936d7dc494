//! Tamper-evident hash chaining for custody entries.
//!
//! Every custody entry carries a BLAKE3 hash over its append-time fields,
//! linked to the preceding entry of the same evidence item. The first
//! entry of an item links to the genesis hash (32 zero bytes). Altering or
//! removing any stored entry breaks every later link, so post-hoc edits to
//! the record are detectable by a single chain walk.
//!
//! The content fingerprint of the evidence itself (see
//! [`crate::fingerprint`]) is a separate mechanism: it covers evidence
//! bytes, while this chain covers the custody record.

use blake3::Hasher;

use crate::custody::CustodyEntry;

/// Size of a chain hash in bytes.
pub const CHAIN_HASH_SIZE: usize = 32;

/// A chain hash value.
pub type ChainHash = [u8; CHAIN_HASH_SIZE];

/// The hash an item's first entry links to.
pub const GENESIS_CHAIN_HASH: ChainHash = [0u8; CHAIN_HASH_SIZE];

/// Domain separation tag, bumped on any canonical encoding change.
const DOMAIN_TAG: &[u8] = b"custodia.custody-entry.v1";

/// Computes and verifies entry chain hashes.
pub struct EntryHasher;

impl EntryHasher {
    /// Computes the chain hash for an entry payload linked to `prev_hash`.
    #[must_use]
    pub fn hash_entry(payload: &[u8], prev_hash: &ChainHash) -> ChainHash {
        let mut hasher = Hasher::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(prev_hash);
        hasher.update(payload);
        *hasher.finalize().as_bytes()
    }

    /// Verifies that `entry_hash` is the hash of `payload` under
    /// `prev_hash`.
    #[must_use]
    pub fn verify_link(payload: &[u8], prev_hash: &ChainHash, entry_hash: &ChainHash) -> bool {
        Self::hash_entry(payload, prev_hash) == *entry_hash
    }
}

/// Canonical byte encoding of an entry's append-time fields.
///
/// Approval fields, `chain_no`, and the hashes themselves are excluded:
/// the hash is fixed at append time, and the one-way approval transition
/// must not invalidate it. Every field is length-prefixed so no two
/// distinct entries share an encoding.
#[must_use]
pub fn entry_payload(entry: &CustodyEntry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    put_str(&mut buf, &entry.id.to_string());
    put_str(&mut buf, &entry.evidence_id.to_string());
    buf.extend_from_slice(&entry.sequence_no.to_le_bytes());
    put_str(&mut buf, entry.action.as_str());
    put_opt(&mut buf, entry.from_custodian.as_deref());
    put_str(&mut buf, &entry.to_custodian);
    put_opt(&mut buf, entry.from_location.as_deref());
    put_str(&mut buf, &entry.to_location);
    put_str(&mut buf, &entry.purpose);
    put_str(&mut buf, &entry.performed_by);
    put_str(&mut buf, &entry.recorded_at.to_rfc3339());
    buf.push(u8::from(entry.requires_approval));
    buf
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_opt(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => buf.push(0),
        Some(s) => {
            buf.push(1);
            put_str(buf, s);
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::custody::{ApprovalStatus, CustodyAction};

    fn entry() -> CustodyEntry {
        CustodyEntry {
            id: Uuid::new_v4(),
            evidence_id: Uuid::new_v4(),
            sequence_no: 1,
            chain_no: Some(1),
            action: CustodyAction::Collected,
            from_custodian: None,
            to_custodian: "alice".to_string(),
            from_location: None,
            to_location: "locker 12".to_string(),
            purpose: "intake".to_string(),
            performed_by: "alice".to_string(),
            recorded_at: Utc::now(),
            requires_approval: false,
            approval_status: ApprovalStatus::None,
            approved_by: None,
            decided_at: None,
            decision_reason: None,
            prev_hash: GENESIS_CHAIN_HASH,
            entry_hash: [0u8; CHAIN_HASH_SIZE],
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let e = entry();
        let payload = entry_payload(&e);
        let h1 = EntryHasher::hash_entry(&payload, &GENESIS_CHAIN_HASH);
        let h2 = EntryHasher::hash_entry(&payload, &GENESIS_CHAIN_HASH);
        assert_eq!(h1, h2);
        assert!(EntryHasher::verify_link(&payload, &GENESIS_CHAIN_HASH, &h1));
    }

    #[test]
    fn test_hash_depends_on_prev() {
        let e = entry();
        let payload = entry_payload(&e);
        let h1 = EntryHasher::hash_entry(&payload, &GENESIS_CHAIN_HASH);
        let h2 = EntryHasher::hash_entry(&payload, &[1u8; CHAIN_HASH_SIZE]);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_payload_changes_with_fields() {
        let base = entry();
        let mut moved = base.clone();
        moved.to_location = "lab 3".to_string();
        assert_ne!(entry_payload(&base), entry_payload(&moved));

        let mut renumbered = base.clone();
        renumbered.sequence_no = 2;
        assert_ne!(entry_payload(&base), entry_payload(&renumbered));
    }

    #[test]
    fn test_approval_transition_does_not_change_payload() {
        let base = entry();
        let mut decided = base.clone();
        decided.approval_status = ApprovalStatus::Approved;
        decided.approved_by = Some("bob".to_string());
        decided.decided_at = Some(Utc::now());
        decided.chain_no = Some(7);
        assert_eq!(entry_payload(&base), entry_payload(&decided));
    }

    #[test]
    fn test_none_and_empty_from_are_distinct() {
        let with_none = entry();
        let mut with_empty = with_none.clone();
        with_empty.from_custodian = Some(String::new());
        with_empty.from_location = Some(String::new());
        assert_ne!(entry_payload(&with_none), entry_payload(&with_empty));
    }
}
