//! Evidence category classification.
//!
//! Categories classify what kind of thing an evidence item is. The set is
//! closed so that handling rules (fingerprinting, verification) are decided
//! by exhaustive match and a new category cannot silently bypass them.

use serde::{Deserialize, Serialize};

use crate::error::CustodyError;

/// Category classification for evidence items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceCategory {
    /// Files, disk images, extractions, and other digital material.
    Digital,

    /// Physical objects: weapons, clothing, seized hardware.
    Physical,

    /// Paper documents and their certified copies.
    Document,

    /// Recorded statements and testimony transcripts.
    Testimonial,
}

impl std::fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl EvidenceCategory {
    /// Parses an evidence category from a string.
    ///
    /// Accepts both `SCREAMING_SNAKE_CASE` (canonical) and lowercase forms.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the string is not a recognized category.
    pub fn parse(s: &str) -> Result<Self, CustodyError> {
        match s.to_uppercase().as_str() {
            "DIGITAL" => Ok(Self::Digital),
            "PHYSICAL" => Ok(Self::Physical),
            "DOCUMENT" => Ok(Self::Document),
            "TESTIMONIAL" => Ok(Self::Testimonial),
            _ => Err(CustodyError::Validation {
                field: "category",
                reason: format!("unrecognized category: {s}"),
            }),
        }
    }

    /// Returns the canonical string representation of this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "DIGITAL",
            Self::Physical => "PHYSICAL",
            Self::Document => "DOCUMENT",
            Self::Testimonial => "TESTIMONIAL",
        }
    }

    /// Returns all known categories.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Digital,
            Self::Physical,
            Self::Document,
            Self::Testimonial,
        ]
    }

    /// Returns whether items of this category normally carry a content
    /// fingerprint.
    ///
    /// Only digital material has canonical bytes to digest. Non-digital
    /// items may still be registered without one, and integrity
    /// verification reports them as not applicable.
    #[must_use]
    pub const fn carries_fingerprint(&self) -> bool {
        match self {
            Self::Digital => true,
            Self::Physical | Self::Document | Self::Testimonial => false,
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(
            EvidenceCategory::parse("DIGITAL").unwrap(),
            EvidenceCategory::Digital
        );
        assert_eq!(
            EvidenceCategory::parse("digital").unwrap(),
            EvidenceCategory::Digital
        );
        assert_eq!(
            EvidenceCategory::parse("PHYSICAL").unwrap(),
            EvidenceCategory::Physical
        );
        assert_eq!(
            EvidenceCategory::parse("DOCUMENT").unwrap(),
            EvidenceCategory::Document
        );
        assert_eq!(
            EvidenceCategory::parse("TESTIMONIAL").unwrap(),
            EvidenceCategory::Testimonial
        );
    }

    #[test]
    fn test_category_parse_unknown_fails() {
        let result = EvidenceCategory::parse("HEARSAY");
        assert!(matches!(
            result,
            Err(CustodyError::Validation { field: "category", .. })
        ));

        let result = EvidenceCategory::parse("");
        assert!(matches!(result, Err(CustodyError::Validation { .. })));
    }

    #[test]
    fn test_category_roundtrip() {
        for category in EvidenceCategory::all() {
            let s = category.as_str();
            let parsed = EvidenceCategory::parse(s).unwrap();
            assert_eq!(*category, parsed);
        }
    }

    #[test]
    fn test_category_display() {
        assert_eq!(format!("{}", EvidenceCategory::Digital), "DIGITAL");
    }

    #[test]
    fn test_carries_fingerprint() {
        assert!(EvidenceCategory::Digital.carries_fingerprint());
        assert!(!EvidenceCategory::Physical.carries_fingerprint());
        assert!(!EvidenceCategory::Document.carries_fingerprint());
        assert!(!EvidenceCategory::Testimonial.carries_fingerprint());
    }
}
