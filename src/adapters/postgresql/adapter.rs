//! PostgreSQL adapter implementing the persistence and notification traits

use crate::adapters::database::traits::{RecordStore, RegisterRepository};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    line_from_row, load_statement, log_from_row, record_from_json, register_from_row,
    rule_from_row, update_statement,
};
use crate::core::accessor::EntityDescriptor;
use crate::core::processing::filter::RecordFilter;
use crate::domain::{
    CustodianError, FieldName, ProcessingLog, ProcessingRegister, RegisterId, Result,
    TargetRecord,
};
use crate::notification::{Notification, NotificationService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

const SELECT_REGISTERS: &str = "SELECT r.id, r.name, r.status, r.retention_period_months, \
     r.anonymizer_id, a.name AS anonymizer_name \
     FROM processing_register r LEFT JOIN anonymizer a ON a.id = r.anonymizer_id \
     WHERE ($1::bigint IS NULL OR r.id = $1) ORDER BY r.id";

const SELECT_RULES: &str = "SELECT register_id, entity_type, age_fields \
     FROM processing_register_rule WHERE register_id = ANY($1) \
     ORDER BY register_id, sequence, id";

const SELECT_LINES: &str = "SELECT anonymizer_id, entity_type, field_name, strategy \
     FROM anonymizer_line WHERE anonymizer_id = ANY($1) \
     ORDER BY anonymizer_id, sequence, id";

/// Single-writer lock transition; a lock older than `$3` minutes is reclaimed
const BEGIN_RUN: &str = "UPDATE processing_register \
     SET running = TRUE, running_since = $2 \
     WHERE id = $1 AND (running = FALSE OR running_since IS NULL \
     OR running_since < $2 - make_interval(mins => $3::int))";

const END_RUN: &str =
    "UPDATE processing_register SET running = FALSE, running_since = NULL WHERE id = $1";

/// PostgreSQL implementation of the persistence traits
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    stale_lock_minutes: i32,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient, stale_lock_minutes: u64) -> Self {
        Self::new_with_arc(Arc::new(client), stale_lock_minutes)
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>, stale_lock_minutes: u64) -> Self {
        Self {
            client,
            stale_lock_minutes: i32::try_from(stale_lock_minutes).unwrap_or(i32::MAX),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn load_registers(&self, id: Option<i64>) -> Result<Vec<ProcessingRegister>> {
        let rows = self.client.query(SELECT_REGISTERS, &[&id]).await?;
        let mut registers = rows
            .iter()
            .map(register_from_row)
            .collect::<Result<Vec<_>>>()?;
        if registers.is_empty() {
            return Ok(registers);
        }

        let register_ids: Vec<i64> = registers.iter().map(|r| r.id.value()).collect();
        let mut rules: HashMap<i64, Vec<_>> = HashMap::new();
        for row in self.client.query(SELECT_RULES, &[&register_ids]).await? {
            let (register_id, rule) = rule_from_row(&row)?;
            rules.entry(register_id).or_default().push(rule);
        }

        let anonymizer_ids: Vec<i64> = registers
            .iter()
            .filter_map(|r| r.anonymizer.as_ref().map(|a| a.id))
            .collect();
        let mut lines: HashMap<i64, Vec<_>> = HashMap::new();
        if !anonymizer_ids.is_empty() {
            for row in self.client.query(SELECT_LINES, &[&anonymizer_ids]).await? {
                let (anonymizer_id, line) = line_from_row(&row)?;
                lines.entry(anonymizer_id).or_default().push(line);
            }
        }

        for register in &mut registers {
            register.rules = rules.remove(&register.id.value()).unwrap_or_default();
            if let Some(anonymizer) = register.anonymizer.as_mut() {
                anonymizer.lines = lines.get(&anonymizer.id).cloned().unwrap_or_default();
            }
        }
        Ok(registers)
    }
}

#[async_trait]
impl RecordStore for PostgreSQLAdapter {
    async fn select_ids(&self, filter: &RecordFilter) -> Result<Vec<i64>> {
        let cutoff = filter.cutoff();
        let rows = self.client.query(&filter.select_ids_sql(), &[&cutoff]).await?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, i64>(0)
                    .map_err(|e| CustodianError::Database(format!("Failed to read record id: {e}")))
            })
            .collect()
    }

    async fn load_record(
        &self,
        entity: &EntityDescriptor,
        id: i64,
    ) -> Result<Option<TargetRecord>> {
        let rows = self.client.query(&load_statement(entity), &[&id]).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let doc: serde_json::Value = row
            .try_get("doc")
            .map_err(|e| CustodianError::Database(format!("Failed to read record: {e}")))?;
        record_from_json(entity, id, &doc).map(Some)
    }

    async fn persist_record(
        &self,
        entity: &EntityDescriptor,
        record: &TargetRecord,
        fields: &[FieldName],
    ) -> Result<()> {
        let (statement, params) = update_statement(entity, record, fields)?;
        let params: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to begin transaction: {e}")))?;
        tx.batch_execute(&self.client.statement_timeout_sql(true))
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to set statement timeout: {e}")))?;

        let updated = tx.execute(statement.as_str(), &params).await.map_err(|e| {
            CustodianError::Database(format!(
                "Failed to persist {} #{}: {e}",
                entity.name, record.id
            ))
        })?;
        if updated != 1 {
            return Err(CustodianError::Database(format!(
                "Expected to update one {} row for id {}, updated {updated}",
                entity.name, record.id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to commit transaction: {e}")))
    }

    async fn clear_session(&self) -> Result<()> {
        // Statements run on pooled connections; no session cache to release
        Ok(())
    }
}

#[async_trait]
impl RegisterRepository for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn list_registers(&self) -> Result<Vec<ProcessingRegister>> {
        self.load_registers(None).await
    }

    async fn find_register(&self, id: RegisterId) -> Result<Option<ProcessingRegister>> {
        Ok(self.load_registers(Some(id.value())).await?.into_iter().next())
    }

    async fn try_begin_run(&self, id: RegisterId, now: DateTime<Utc>) -> Result<bool> {
        let updated = self
            .client
            .execute(BEGIN_RUN, &[&id.value(), &now, &self.stale_lock_minutes])
            .await?;
        Ok(updated == 1)
    }

    async fn end_run(&self, id: RegisterId) -> Result<()> {
        self.client.execute(END_RUN, &[&id.value()]).await?;
        Ok(())
    }

    async fn save_processing_log(&self, log: &ProcessingLog) -> Result<()> {
        let count = i64::try_from(log.processed_count).map_err(|_| {
            CustodianError::Validation(format!("Processed count {} out of range", log.processed_count))
        })?;
        self.client
            .execute(
                "INSERT INTO processing_register_log (register_id, processed_at, processed_count) \
                 VALUES ($1, $2, $3)",
                &[&log.register_id.value(), &log.processed_at, &count],
            )
            .await?;
        Ok(())
    }

    async fn list_processing_logs(
        &self,
        register_id: Option<RegisterId>,
    ) -> Result<Vec<ProcessingLog>> {
        let id = register_id.map(|id| id.value());
        let rows = self
            .client
            .query(
                "SELECT register_id, processed_at, processed_count FROM processing_register_log \
                 WHERE ($1::bigint IS NULL OR register_id = $1) \
                 ORDER BY processed_at DESC, id DESC",
                &[&id],
            )
            .await?;
        rows.iter().map(log_from_row).collect()
    }
}

/// Stores notifications in the `notification` table
pub struct PostgreSQLNotifier {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLNotifier {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationService for PostgreSQLNotifier {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        let related_id = notification.related.as_ref().map(|r| r.id);
        let related_type = notification.related.as_ref().map(|r| r.entity_type.clone());
        self.client
            .execute(
                "INSERT INTO notification (recipient, title, body, related_id, related_type) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &notification.recipient.login,
                    &notification.title,
                    &notification.body,
                    &related_id,
                    &related_type,
                ],
            )
            .await
            .map_err(|e| CustodianError::Notification(e.to_string()))?;
        Ok(())
    }
}
