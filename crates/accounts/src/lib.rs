//! Accounts module (PIN-secured in-memory ledger).
//!
//! Pure domain logic only: no IO, no persistence concerns. The `Ledger`
//! owns every `Account`; nothing outside this crate holds a mutable alias
//! to one.

pub mod account;
pub mod ledger;
pub mod pin;

pub use account::{
    Account, AccountCommand, AccountEvent, AccountOpened, Deposit, MoneyDeposited,
    MoneyWithdrawn, OpenAccount, PinUpdated, SetPin, TransactionKind, TransactionRecord,
    Withdraw, MINIMUM_HOLDER_AGE,
};
pub use ledger::Ledger;
pub use pin::{Pin, PinHash};
