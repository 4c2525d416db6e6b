//! SQLite implementations for local operation
//!
//! Backs the service when `DATABASE_URL` points at a SQLite file, and the
//! in-memory store used by tests.

mod records;

pub use records::*;
