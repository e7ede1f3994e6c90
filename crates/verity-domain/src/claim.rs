//! Claim module - atomic factual statements extracted from a draft

use std::fmt;

/// Unique identifier for a claim, based on UUIDv7.
///
/// UUIDv7 gives chronological sortability (claims extracted later sort
/// later), 128-bit uniqueness, and no coordination between concurrent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId(u128);

impl ClaimId {
    /// Generate a new UUIDv7-based ClaimId.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ClaimId from a raw u128 value (for tests and fixtures).
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ClaimId from its UUID string form.
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid claim id: {}", e))
    }

    /// Get the raw u128 value.
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// An atomic, independently verifiable factual statement extracted from one
/// drafted answer.
///
/// A claim must be self-contained: pronouns and ellipsis resolved, one
/// falsifiable fact per claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,

    /// The claim text
    pub text: String,

    /// The attempt whose draft this claim was extracted from (1-based)
    pub attempt: u32,
}

impl Claim {
    /// Create a new claim attributed to the draft of the given attempt.
    pub fn new(text: impl Into<String>, attempt: u32) -> Self {
        Self {
            id: ClaimId::new(),
            text: text.into(),
            attempt,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: ClaimId ordering matches underlying value ordering
        #[test]
        fn test_id_ordering_property(a: u128, b: u128) {
            let id_a = ClaimId::from_value(a);
            let id_b = ClaimId::from_value(b);
            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: round-trip through string form preserves the id
        #[test]
        fn test_id_string_roundtrip(value: u128) {
            let id = ClaimId::from_value(value);
            match ClaimId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
