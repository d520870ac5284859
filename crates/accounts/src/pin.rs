//! PIN value objects.
//!
//! A raw PIN only ever exists inside a [`Pin`], which validates its shape on
//! construction and redacts itself in `Debug` output. Accounts store a
//! [`PinHash`] (SHA-256, hex-encoded); the raw digits are never persisted
//! anywhere.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use minibank_core::{LedgerError, ValueObject};

/// Required PIN length, in digits.
pub const PIN_LENGTH: usize = 4;

/// A validated PIN: exactly four ASCII digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Parse a raw string into a `Pin`.
    ///
    /// Rejects anything that is not exactly four ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        if raw.len() == PIN_LENGTH && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(LedgerError::validation(
                "PIN must be exactly 4 digits (numbers only)",
            ))
        }
    }

    /// One-way hash of this PIN.
    pub fn hash(&self) -> PinHash {
        PinHash::of(&self.0)
    }
}

impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never leak the digits through logs or assertion output.
        f.write_str("Pin(****)")
    }
}

impl ValueObject for Pin {}

/// SHA-256 digest of a PIN, hex-encoded. Compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinHash(String);

impl PinHash {
    fn of(digits: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(digits.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Whether `pin` hashes to this value.
    pub fn matches(&self, pin: &Pin) -> bool {
        *self == pin.hash()
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl ValueObject for PinHash {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_four_ascii_digits() {
        assert!(Pin::parse("0000").is_ok());
        assert!(Pin::parse("1234").is_ok());
        assert!(Pin::parse("9999").is_ok());
    }

    #[test]
    fn rejects_wrong_shapes() {
        for raw in ["", "123", "12345", "12a4", "12 4", "-123", "١٢٣٤"] {
            let err = Pin::parse(raw).unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)), "accepted {raw:?}");
        }
    }

    #[test]
    fn hash_is_stable_sha256_hex() {
        let pin = Pin::parse("1234").unwrap();
        // sha256("1234")
        assert_eq!(
            pin.hash().as_hex(),
            "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4"
        );
    }

    #[test]
    fn matches_only_the_same_digits() {
        let stored = Pin::parse("1234").unwrap().hash();
        assert!(stored.matches(&Pin::parse("1234").unwrap()));
        assert!(!stored.matches(&Pin::parse("0000").unwrap()));
    }

    #[test]
    fn debug_output_redacts_digits() {
        let pin = Pin::parse("1234").unwrap();
        assert_eq!(format!("{pin:?}"), "Pin(****)");
    }
}
