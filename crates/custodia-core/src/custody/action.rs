//! Custody action classification.
//!
//! Actions are a closed set so the sensitivity rule table is decided by
//! exhaustive match: adding an action forces a decision about whether it
//! needs dual-control approval, and nothing can bypass the table.

use serde::{Deserialize, Serialize};

use crate::error::CustodyError;

/// The kind of handling event a custody entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyAction {
    /// Initial collection at a scene.
    Collected,

    /// Taken under warrant or statutory power.
    Seized,

    /// Handed from one custodian to another.
    Transferred,

    /// Checked out for forensic analysis.
    Analyzed,

    /// Presented in court proceedings.
    PresentedCourt,

    /// Returned to its owner.
    Returned,

    /// Destroyed or otherwise disposed of.
    Disposed,
}

impl std::fmt::Display for CustodyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CustodyAction {
    /// Parses a custody action from a string.
    ///
    /// Accepts both `SCREAMING_SNAKE_CASE` (canonical) and lowercase forms.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the string is not a recognized action.
    pub fn parse(s: &str) -> Result<Self, CustodyError> {
        match s.to_uppercase().as_str() {
            "COLLECTED" => Ok(Self::Collected),
            "SEIZED" => Ok(Self::Seized),
            "TRANSFERRED" => Ok(Self::Transferred),
            "ANALYZED" => Ok(Self::Analyzed),
            "PRESENTED_COURT" => Ok(Self::PresentedCourt),
            "RETURNED" => Ok(Self::Returned),
            "DISPOSED" => Ok(Self::Disposed),
            _ => Err(CustodyError::Validation {
                field: "action",
                reason: format!("unrecognized action: {s}"),
            }),
        }
    }

    /// Returns the canonical string representation of this action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collected => "COLLECTED",
            Self::Seized => "SEIZED",
            Self::Transferred => "TRANSFERRED",
            Self::Analyzed => "ANALYZED",
            Self::PresentedCourt => "PRESENTED_COURT",
            Self::Returned => "RETURNED",
            Self::Disposed => "DISPOSED",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Collected,
            Self::Seized,
            Self::Transferred,
            Self::Analyzed,
            Self::PresentedCourt,
            Self::Returned,
            Self::Disposed,
        ]
    }

    /// Returns whether this action is sensitive and requires dual-control
    /// approval before it takes effect on the custody chain.
    ///
    /// Sensitive actions are the irreversible ones: once evidence has been
    /// disposed of, returned, or shown in court, the act cannot be undone.
    #[must_use]
    pub const fn requires_approval(&self) -> bool {
        match self {
            Self::Disposed | Self::Returned | Self::PresentedCourt => true,
            Self::Collected | Self::Seized | Self::Transferred | Self::Analyzed => false,
        }
    }
}
