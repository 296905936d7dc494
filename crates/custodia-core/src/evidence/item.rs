//! Evidence item identity and metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::EvidenceCategory;
use crate::error::CustodyError;
use crate::fingerprint::Fingerprint;

/// Maximum length of an evidence label in bytes.
pub const MAX_LABEL_LEN: usize = 256;

/// Maximum length of a location string in bytes.
pub const MAX_LOCATION_LEN: usize = 512;

/// Maximum length of an actor identifier in bytes.
pub const MAX_ACTOR_LEN: usize = 128;

/// Maximum length of a retention policy tag in bytes.
pub const MAX_POLICY_LEN: usize = 128;

/// A registered piece of evidence.
///
/// Items are created once at intake and never hard-deleted; disposal is a
/// soft lifecycle fact recorded by the external retention process. The
/// `registered_fingerprint`, once set, is immutable: re-hashing only ever
/// produces a new comparison result, never a new registered value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Unique identifier, assigned at registration.
    pub id: Uuid,

    /// Human-readable label for the item.
    pub label: String,

    /// Category classification.
    pub category: EvidenceCategory,

    /// Content digest fixed at registration. Absent for items registered
    /// without content bytes (typically non-digital evidence).
    pub registered_fingerprint: Option<Fingerprint>,

    /// Authoritative location of the physical or logical asset.
    pub storage_location: String,

    /// Opaque tag consumed by the external retention system. The engine
    /// records it and never interprets it.
    pub retention_policy: String,

    /// Operator who registered the item.
    pub registered_by: String,

    /// Server-assigned registration timestamp.
    pub registered_at: DateTime<Utc>,

    /// Soft lifecycle flag, set by the external retention process once
    /// the item has been disposed of.
    pub disposed: bool,
}

/// Registration request for a new evidence item.
///
/// The fingerprint is not part of the request: it is computed by the
/// registry from content bytes when they are supplied.
#[derive(Debug, Clone)]
pub struct NewEvidence {
    /// Human-readable label, required.
    pub label: String,

    /// Category classification.
    pub category: EvidenceCategory,

    /// Authoritative location of the asset.
    pub storage_location: String,

    /// Opaque retention tag; may be empty.
    pub retention_policy: String,

    /// Operator registering the item.
    pub registered_by: String,
}

impl NewEvidence {
    /// Validates the request against field bounds.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), CustodyError> {
        require_nonempty("label", &self.label, MAX_LABEL_LEN)?;
        require_nonempty("storage_location", &self.storage_location, MAX_LOCATION_LEN)?;
        require_bounded("retention_policy", &self.retention_policy, MAX_POLICY_LEN)?;
        require_nonempty("registered_by", &self.registered_by, MAX_ACTOR_LEN)?;
        Ok(())
    }

    /// Builds the item this request registers.
    ///
    /// Assigns a fresh id and the current server time.
    #[must_use]
    pub fn into_item(self, fingerprint: Option<Fingerprint>) -> EvidenceItem {
        EvidenceItem {
            id: Uuid::new_v4(),
            label: self.label,
            category: self.category,
            registered_fingerprint: fingerprint,
            storage_location: self.storage_location,
            retention_policy: self.retention_policy,
            registered_by: self.registered_by,
            registered_at: Utc::now(),
            disposed: false,
        }
    }
}

/// Rejects an empty or over-long field value.
pub(crate) fn require_nonempty(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), CustodyError> {
    if value.trim().is_empty() {
        return Err(CustodyError::Validation {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    require_bounded(field, value, max_len)
}

/// Rejects an over-long field value; empty is allowed.
pub(crate) fn require_bounded(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), CustodyError> {
    if value.len() > max_len {
        return Err(CustodyError::Validation {
            field,
            reason: format!("exceeds maximum length of {max_len} bytes"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn request() -> NewEvidence {
        NewEvidence {
            label: "seized laptop".to_string(),
            category: EvidenceCategory::Digital,
            storage_location: "locker 12".to_string(),
            retention_policy: "crim-7y".to_string(),
            registered_by: "officer.diaz".to_string(),
        }
    }

    #[test]
    fn test_valid_request() {
        request().validate().expect("request should validate");
    }

    #[test]
    fn test_empty_label_rejected() {
        let mut req = request();
        req.label = "   ".to_string();
        assert!(matches!(
            req.validate(),
            Err(CustodyError::Validation { field: "label", .. })
        ));
    }

    #[test]
    fn test_overlong_label_rejected() {
        let mut req = request();
        req.label = "x".repeat(MAX_LABEL_LEN + 1);
        assert!(matches!(
            req.validate(),
            Err(CustodyError::Validation { field: "label", .. })
        ));
    }

    #[test]
    fn test_empty_retention_policy_allowed() {
        let mut req = request();
        req.retention_policy = String::new();
        req.validate().expect("empty retention tag is allowed");
    }

    #[test]
    fn test_into_item_assigns_identity() {
        let item = request().into_item(None);
        assert!(!item.disposed);
        assert!(item.registered_fingerprint.is_none());
        assert_eq!(item.category, EvidenceCategory::Digital);

        let other = request().into_item(None);
        assert_ne!(item.id, other.id);
    }

    #[test]
    fn test_into_item_keeps_fingerprint() {
        let fp = Fingerprint::compute(b"disk image");
        let item = request().into_item(Some(fp));
        assert_eq!(item.registered_fingerprint, Some(fp));
    }
}
