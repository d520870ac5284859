//! Tracing/logging setup shared by the binaries.

/// Tracing configuration (filters, formatting).
pub mod tracing;

pub use self::tracing::init;
