//! Evidence registry types.
//!
//! The registry owns evidence item identity, metadata, and the registered
//! content fingerprint. Items are immutable apart from the soft `disposed`
//! flag; replacing a physical item requires re-registration under a new id,
//! never an in-place fingerprint update.

mod category;
mod item;

pub use category::EvidenceCategory;
pub use item::{
    EvidenceItem, MAX_ACTOR_LEN, MAX_LABEL_LEN, MAX_LOCATION_LEN, MAX_POLICY_LEN, NewEvidence,
};

pub(crate) use item::{require_bounded, require_nonempty};
