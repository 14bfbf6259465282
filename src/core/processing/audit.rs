//! Processing log writer

use crate::adapters::database::RegisterRepository;
use crate::domain::{ExecutionContext, ProcessingLog, ProcessingRegister, Result};
use std::sync::Arc;

/// Appends one [`ProcessingLog`] per pass that processed records
pub struct ProcessingLogger {
    repository: Arc<dyn RegisterRepository>,
}

impl ProcessingLogger {
    pub fn new(repository: Arc<dyn RegisterRepository>) -> Self {
        Self { repository }
    }

    /// Writes a log row for `count > 0`; nothing for an empty pass
    pub async fn record_pass(
        &self,
        register: &ProcessingRegister,
        count: u64,
        ctx: &ExecutionContext,
    ) -> Result<Option<ProcessingLog>> {
        if count == 0 {
            tracing::debug!(register_id = %register.id, "Empty pass, no processing log written");
            return Ok(None);
        }

        let log = ProcessingLog {
            register_id: register.id,
            processed_at: ctx.now(),
            processed_count: count,
        };
        self.repository.save_processing_log(&log).await?;

        tracing::info!(
            register_id = %register.id,
            processed_count = count,
            "Processing log written"
        );
        Ok(Some(log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::{FixedClock, Locale, RegisterId, RegisterStatus, UserRef};
    use chrono::NaiveDate;

    fn register() -> ProcessingRegister {
        ProcessingRegister {
            id: RegisterId::new(4).unwrap(),
            name: "Contacts".into(),
            status: RegisterStatus::Active,
            retention_period_months: 12,
            anonymizer: None,
            rules: vec![],
        }
    }

    fn ctx() -> ExecutionContext {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        ExecutionContext::new(UserRef::new("admin"), Locale::En, Arc::new(FixedClock::on(date)))
    }

    #[tokio::test]
    async fn test_empty_pass_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let logger = ProcessingLogger::new(store.clone());

        let log = logger.record_pass(&register(), 0, &ctx()).await.unwrap();
        assert!(log.is_none());
        assert!(store.list_processing_logs(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pass_writes_one_log() {
        let store = Arc::new(InMemoryStore::new());
        let logger = ProcessingLogger::new(store.clone());

        let log = logger.record_pass(&register(), 7, &ctx()).await.unwrap().unwrap();
        assert_eq!(log.processed_count, 7);
        assert_eq!(log.processed_at, ctx().now());

        let logs = store.list_processing_logs(Some(register().id)).await.unwrap();
        assert_eq!(logs, vec![log]);
    }
}
