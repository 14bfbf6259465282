//! In-memory backend
//!
//! Implements both persistence traits over a mutex-guarded map. Used by the
//! test suite and by embedders that keep records in process.

use crate::adapters::database::{RecordStore, RegisterRepository};
use crate::core::accessor::EntityDescriptor;
use crate::core::processing::filter::RecordFilter;
use crate::domain::{
    CustodianError, EntityType, FieldName, ProcessingLog, ProcessingRegister, RegisterId, Result,
    TargetRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

type RecordKey = (EntityType, i64);

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<RecordKey, TargetRecord>,
    registers: BTreeMap<RegisterId, ProcessingRegister>,
    running: HashSet<RegisterId>,
    logs: Vec<ProcessingLog>,
    failing_writes: HashSet<RecordKey>,
    failing_releases: HashSet<RegisterId>,
    session_clears: usize,
    writes: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| CustodianError::Database("In-memory store poisoned".to_string()))
    }

    /// Inserts or replaces a record
    pub fn insert_record(&self, record: TargetRecord) -> Result<()> {
        self.lock()?
            .records
            .insert((record.entity.clone(), record.id), record);
        Ok(())
    }

    /// Inserts or replaces a register
    pub fn insert_register(&self, register: ProcessingRegister) -> Result<()> {
        self.lock()?.registers.insert(register.id, register);
        Ok(())
    }

    pub fn remove_register(&self, id: RegisterId) -> Result<()> {
        self.lock()?.registers.remove(&id);
        Ok(())
    }

    /// Stored copy of a record
    pub fn record(&self, entity: &EntityType, id: i64) -> Option<TargetRecord> {
        self.lock()
            .ok()
            .and_then(|state| state.records.get(&(entity.clone(), id)).cloned())
    }

    /// Makes every persist of `(entity, id)` fail
    pub fn inject_write_failure(&self, entity: EntityType, id: i64) -> Result<()> {
        self.lock()?.failing_writes.insert((entity, id));
        Ok(())
    }

    /// Makes `end_run(id)` fail and keep the lock
    pub fn inject_release_failure(&self, id: RegisterId) -> Result<()> {
        self.lock()?.failing_releases.insert(id);
        Ok(())
    }

    /// Marks `id` as held by another run
    pub fn hold_run_lock(&self, id: RegisterId) -> Result<()> {
        self.lock()?.running.insert(id);
        Ok(())
    }

    pub fn is_running(&self, id: RegisterId) -> bool {
        self.lock()
            .map(|state| state.running.contains(&id))
            .unwrap_or(false)
    }

    /// Number of `clear_session` calls so far
    pub fn session_clears(&self) -> usize {
        self.lock().map(|state| state.session_clears).unwrap_or(0)
    }

    /// Number of successful `persist_record` calls so far
    pub fn writes(&self) -> usize {
        self.lock().map(|state| state.writes).unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn select_ids(&self, filter: &RecordFilter) -> Result<Vec<i64>> {
        let state = self.lock()?;
        Ok(state
            .records
            .values()
            .filter(|record| filter.matches(record))
            .map(|record| record.id)
            .collect())
    }

    async fn load_record(
        &self,
        entity: &EntityDescriptor,
        id: i64,
    ) -> Result<Option<TargetRecord>> {
        Ok(self.record(&entity.name, id))
    }

    async fn persist_record(
        &self,
        entity: &EntityDescriptor,
        record: &TargetRecord,
        fields: &[FieldName],
    ) -> Result<()> {
        let mut state = self.lock()?;
        let key = (entity.name.clone(), record.id);
        if state.failing_writes.contains(&key) {
            return Err(CustodianError::Database(format!(
                "Write rejected for {} #{}",
                entity.name, record.id
            )));
        }

        let stored = state.records.get_mut(&key).ok_or_else(|| {
            CustodianError::Database(format!("{} #{} not found", entity.name, record.id))
        })?;
        stored.archived = record.archived;
        for field in fields {
            if let Some(value) = record.get(field) {
                stored.put(field.clone(), value.clone());
            }
        }
        state.writes += 1;
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        self.lock()?.session_clears += 1;
        Ok(())
    }
}

#[async_trait]
impl RegisterRepository for InMemoryStore {
    async fn list_registers(&self) -> Result<Vec<ProcessingRegister>> {
        Ok(self.lock()?.registers.values().cloned().collect())
    }

    async fn find_register(&self, id: RegisterId) -> Result<Option<ProcessingRegister>> {
        Ok(self.lock()?.registers.get(&id).cloned())
    }

    async fn try_begin_run(&self, id: RegisterId, _now: DateTime<Utc>) -> Result<bool> {
        Ok(self.lock()?.running.insert(id))
    }

    async fn end_run(&self, id: RegisterId) -> Result<()> {
        let mut state = self.lock()?;
        if state.failing_releases.contains(&id) {
            return Err(CustodianError::Database(format!(
                "Injected release failure for register {id}"
            )));
        }
        state.running.remove(&id);
        Ok(())
    }

    async fn save_processing_log(&self, log: &ProcessingLog) -> Result<()> {
        self.lock()?.logs.push(log.clone());
        Ok(())
    }

    async fn list_processing_logs(
        &self,
        register_id: Option<RegisterId>,
    ) -> Result<Vec<ProcessingLog>> {
        let state = self.lock()?;
        Ok(state
            .logs
            .iter()
            .rev()
            .filter(|log| register_id.map_or(true, |id| log.register_id == id))
            .cloned()
            .collect())
    }
}
