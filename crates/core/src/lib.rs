//! `minibank-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no CLI concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{LedgerError, LedgerResult};
pub use event::Event;
pub use id::{AccountNumber, TransactionId};
pub use value_object::ValueObject;
