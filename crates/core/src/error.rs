//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// authentication, funds). Everything here is recoverable at the call
/// boundary; nothing is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A value failed validation (underage holder, duplicate account number,
    /// malformed PIN, non-positive amount, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// PIN missing or mismatched on a guarded operation.
    #[error("authentication failed")]
    Auth,

    /// A withdrawal exceeded the available balance. Amounts in minor units.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    /// The account number is not present in the ledger.
    #[error("account not found")]
    NotFound,
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
