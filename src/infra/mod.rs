//! Infrastructure layer for infraction records
//!
//! Contains the record store trait and its implementations:
//! - PostgreSQL (server deployments)
//! - SQLite (local deployments, tests)
//! - Graceful shutdown (signal handling for the HTTP server)

mod decode;
mod error;
mod graceful_shutdown;
pub mod postgres;
pub mod sqlite;
mod traits;

pub use error::*;
pub use graceful_shutdown::shutdown_signal;
pub use postgres::PgRecordStore;
pub use sqlite::SqliteRecordStore;
pub use traits::*;
