//! Trait definitions for record persistence

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{InfractionId, InfractionRecord, NewInfraction};

use super::Result;

/// Record store persists infraction notices.
///
/// Records are write-once: there is no update, delete or list operation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a validated record and return its assigned identifier.
    ///
    /// The parent row and all witness rows are written in one transaction;
    /// on failure nothing is persisted.
    async fn create(&self, record: NewInfraction) -> Result<InfractionId>;

    /// Read a record by identifier. `None` when no such record exists.
    async fn get(&self, id: InfractionId) -> Result<Option<InfractionRecord>>;

    /// Cheap connectivity check used by the readiness endpoint.
    async fn ping(&self) -> Result<()>;
}
