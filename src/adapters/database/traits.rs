//! Persistence traits
//!
//! The runner only talks to storage through these two traits. PostgreSQL is
//! the production backend; the in-memory backend serves tests and embedding.

use crate::core::accessor::EntityDescriptor;
use crate::core::processing::filter::RecordFilter;
use crate::domain::{FieldName, ProcessingLog, ProcessingRegister, RegisterId, Result, TargetRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Access to the target entity tables
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ids of records matching `filter`, in ascending order
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn select_ids(&self, filter: &RecordFilter) -> Result<Vec<i64>>;

    /// Loads one record with every field the descriptor declares
    ///
    /// Returns `Ok(None)` when the row no longer exists.
    async fn load_record(
        &self,
        entity: &EntityDescriptor,
        id: i64,
    ) -> Result<Option<TargetRecord>>;

    /// Writes the archived flag and `fields` of `record` in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; nothing is persisted in that case.
    async fn persist_record(
        &self,
        entity: &EntityDescriptor,
        record: &TargetRecord,
        fields: &[FieldName],
    ) -> Result<()>;

    /// Releases per-session caches so memory stays bounded on long passes
    async fn clear_session(&self) -> Result<()>;
}

/// Access to register configuration, run locks and processing logs
#[async_trait]
pub trait RegisterRepository: Send + Sync {
    /// Test the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// All registers with their anonymizer and rules, ordered by id
    async fn list_registers(&self) -> Result<Vec<ProcessingRegister>>;

    /// Fresh copy of one register; `Ok(None)` when it no longer exists
    async fn find_register(&self, id: RegisterId) -> Result<Option<ProcessingRegister>>;

    /// Takes the run lock for `id`
    ///
    /// Returns `false` when another run holds it.
    async fn try_begin_run(&self, id: RegisterId, now: DateTime<Utc>) -> Result<bool>;

    /// Releases the run lock for `id`
    async fn end_run(&self, id: RegisterId) -> Result<()>;

    /// Appends a processing log row
    async fn save_processing_log(&self, log: &ProcessingLog) -> Result<()>;

    /// Logs for one register (or all), most recent first
    async fn list_processing_logs(
        &self,
        register_id: Option<RegisterId>,
    ) -> Result<Vec<ProcessingLog>>;
}
