//! Custody ledger storage layer.
//!
//! This module provides the append-only chain-of-custody ledger backed by
//! `SQLite` with WAL mode for efficient concurrent reads. The ledger stores
//! evidence items, their custody entries, and the side-records that audit
//! exceptional operations.
//!
//! # Features
//!
//! - **Append-only semantics**: Entries are never updated in place apart
//!   from the guarded approval transition; the only removal path is the
//!   audited administrative delete
//! - **Dense sequence numbers**: Each item's entries are numbered 1, 2, 3,
//!   ... with numbers assigned inside the append transaction
//! - **Hash-chained records**: Every entry carries a BLAKE3 link to its
//!   predecessor, so out-of-band row tampering is detectable
//! - **WAL mode**: Concurrent read access while writes are in progress
//!
//! # Example
//!
//! ```rust,no_run
//! use custodia_core::custody::{AppendRequest, CustodyAction};
//! use custodia_core::evidence::{EvidenceCategory, NewEvidence};
//! use custodia_core::ledger::{AppendMode, CustodyLedger};
//!
//! # fn example() -> Result<(), custodia_core::error::CustodyError> {
//! let ledger = CustodyLedger::open("/path/to/custody.db")?;
//!
//! let item = NewEvidence {
//!     label: "Seized laptop".to_string(),
//!     category: EvidenceCategory::Digital,
//!     storage_location: "locker-07".to_string(),
//!     retention_policy: "retain-5y".to_string(),
//!     registered_by: "alice".to_string(),
//! }
//! .into_item(None);
//! ledger.insert_item(&item)?;
//!
//! let entry = ledger.append_entry(
//!     &AppendRequest {
//!         evidence_id: item.id,
//!         action: CustodyAction::Collected,
//!         from_custodian: None,
//!         to_custodian: "alice".to_string(),
//!         from_location: None,
//!         to_location: "locker-07".to_string(),
//!         purpose: "initial collection".to_string(),
//!         performed_by: "alice".to_string(),
//!     },
//!     AppendMode::Strict,
//! )?;
//! assert_eq!(entry.sequence_no, 1);
//! # Ok(())
//! # }
//! ```

pub mod chain;
mod store;


pub use store::{
    AppendMode, CustodyLedger, EntryFilter, LedgerStats, SideRecord, SideRecordKind,
};
