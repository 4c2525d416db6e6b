//! PostgreSQL implementations for the production service

mod records;

pub use records::*;
