//! Approval status of a custody entry.

use serde::{Deserialize, Serialize};

use crate::error::CustodyError;

/// Approval state of a custody entry.
///
/// Non-sensitive entries are created with `None` and are active
/// immediately; sensitive entries start `Pending` and take the one-way
/// edge `Pending -> {Approved | Rejected}`. There is no transition out of
/// a terminal state, and only the approval coordinator performs the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Entry never required approval and is active.
    None,

    /// Awaiting a dual-control decision; inert until decided.
    Pending,

    /// Decision granted; the entry is active from the decision onward.
    Approved,

    /// Decision refused; the entry is permanently excluded from the
    /// active chain but remains visible for audit.
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ApprovalStatus {
    /// Parses an approval status from a string.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the string is not a recognized status.
    pub fn parse(s: &str) -> Result<Self, CustodyError> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(CustodyError::Validation {
                field: "approval_status",
                reason: format!("unrecognized status: {s}"),
            }),
        }
    }

    /// Returns the canonical string representation of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Returns all known statuses.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::None, Self::Pending, Self::Approved, Self::Rejected]
    }

    /// Returns whether an entry with this status participates in the
    /// active custody chain.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        match self {
            Self::None | Self::Approved => true,
            Self::Pending | Self::Rejected => false,
        }
    }

    /// Returns whether this status is terminal (no further transition).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        match self {
            Self::None | Self::Approved | Self::Rejected => true,
            Self::Pending => false,
        }
    }
}
