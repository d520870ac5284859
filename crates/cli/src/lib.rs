//! Interactive front end for the in-memory account ledger.
//!
//! Thin glue: reads menu choices and arguments, calls the matching ledger
//! operation, prints results or error messages. Every ledger error is
//! recovered here and the menu loop continues.

pub mod menu;
pub mod money;
