//! Custody entry model: actions, approval status, and entry records.

mod action;
mod entry;
mod status;

pub use action::CustodyAction;
pub use entry::{AppendRequest, CustodyEntry, MAX_PURPOSE_LEN};
pub use status::ApprovalStatus;
