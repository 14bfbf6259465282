//! Register runner - main orchestrator for a processing run
//!
//! For each active register: reload it, take its run lock, archive and
//! anonymize every record its rules select, release the lock, write the
//! processing log and notify the acting user. The first failure aborts the
//! whole invocation: it is traced, a failure notification is sent and the
//! error is returned. Records persisted before the failure stay persisted.

use crate::adapters::database::{RecordStore, RegisterRepository};
use crate::anonymization::{AuditTrail, MaskingService, SelectionCatalog};
use crate::config::ProcessingConfig;
use crate::core::accessor::FieldAccessorRegistry;
use crate::core::processing::anonymize::{written_fields, RecordAnonymizer};
use crate::core::processing::audit::ProcessingLogger;
use crate::core::processing::filter::{compile, retention_cutoff};
use crate::core::processing::state::PassState;
use crate::core::processing::summary::{RegisterOutcome, RunSummary, SkipReason};
use crate::domain::{ExecutionContext, ProcessingRegister, ProcessingRule, Result};
use crate::notification::{messages, Notification, NotificationService, RelatedEntity};
use crate::{log_error_with_context, log_register_complete, log_register_start};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

/// Default number of records between store session clears
pub const DEFAULT_FLUSH_INTERVAL: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Records processed between store session clears
    pub flush_interval: usize,
    /// Select and count only
    pub dry_run: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            dry_run: false,
        }
    }
}

impl RunnerConfig {
    pub fn from_config(config: &ProcessingConfig, dry_run: bool) -> Self {
        Self {
            flush_interval: config.flush_interval.max(1),
            dry_run,
        }
    }
}

/// Collaborators shared by every pass
pub struct RegisterRunner {
    records: Arc<dyn RecordStore>,
    registers: Arc<dyn RegisterRepository>,
    registry: Arc<FieldAccessorRegistry>,
    anonymizer: RecordAnonymizer,
    logger: ProcessingLogger,
    notifier: Arc<dyn NotificationService>,
    audit: Option<AuditTrail>,
    config: RunnerConfig,
}

impl RegisterRunner {
    pub fn new(
        records: Arc<dyn RecordStore>,
        registers: Arc<dyn RegisterRepository>,
        registry: Arc<FieldAccessorRegistry>,
        masking: Arc<dyn MaskingService>,
        selections: Arc<dyn SelectionCatalog>,
        notifier: Arc<dyn NotificationService>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            anonymizer: RecordAnonymizer::new(registry.clone(), masking, selections),
            logger: ProcessingLogger::new(registers.clone()),
            records,
            registers,
            registry,
            notifier,
            audit: None,
            config,
        }
    }

    /// Also append every anonymized record to `trail`
    pub fn with_audit_trail(mut self, trail: AuditTrail) -> Self {
        self.audit = Some(trail);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs every active register of `registers`, returning those processed
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any pass, after the failure
    /// notification has been attempted.
    pub async fn run(
        &self,
        registers: &[ProcessingRegister],
        ctx: &ExecutionContext,
    ) -> Result<Vec<ProcessingRegister>> {
        self.run_with_summary(registers, ctx)
            .await
            .map(|summary| summary.processed_registers())
    }

    /// Same as [`run`](Self::run), with per-register outcomes
    pub async fn run_with_summary(
        &self,
        registers: &[ProcessingRegister],
        ctx: &ExecutionContext,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut summary = RunSummary::new(self.config.dry_run);

        tracing::info!(
            requested = registers.len(),
            dry_run = self.config.dry_run,
            user = %ctx.user,
            "Starting processing run"
        );

        match self.run_batch(registers, ctx, &mut summary).await {
            Ok(()) => {
                let summary = summary.with_duration(start_time.elapsed());
                summary.log_summary();
                Ok(summary)
            }
            Err(e) => {
                log_error_with_context!(e, "Processing register run failed");
                if !self.config.dry_run {
                    self.notify_failure(ctx).await;
                }
                Err(e)
            }
        }
    }

    async fn run_batch(
        &self,
        registers: &[ProcessingRegister],
        ctx: &ExecutionContext,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for requested in registers {
            if !requested.is_active() {
                tracing::debug!(register_id = %requested.id, "Skipping inactive register");
                summary.skip(requested.id, SkipReason::Inactive);
                continue;
            }

            let Some(register) = self.registers.find_register(requested.id).await? else {
                tracing::warn!(register_id = %requested.id, "Register no longer exists, skipping");
                summary.skip(requested.id, SkipReason::Vanished);
                continue;
            };
            if !register.is_active() {
                tracing::warn!(register_id = %register.id, "Register deactivated since selection, skipping");
                summary.skip(register.id, SkipReason::Inactive);
                continue;
            }

            if self.config.dry_run {
                summary.outcomes.push(self.dry_run_register(&register, ctx).await?);
                continue;
            }

            if !self.registers.try_begin_run(register.id, ctx.now()).await? {
                tracing::warn!(register_id = %register.id, "Register is being processed by another run, skipping");
                summary.skip(register.id, SkipReason::Locked);
                continue;
            }

            let result = self.process_register(&register, ctx).await;
            let released = self.registers.end_run(register.id).await;
            let outcome = match (result, released) {
                (Ok(outcome), released) => {
                    released?;
                    outcome
                }
                (Err(e), Err(release_err)) => {
                    tracing::warn!(
                        register_id = %register.id,
                        error = %release_err,
                        "Failed to release run lock after failed pass"
                    );
                    return Err(e);
                }
                (Err(e), Ok(())) => return Err(e),
            };

            self.notify_success(&register, ctx).await?;
            summary.outcomes.push(outcome);
        }
        Ok(())
    }

    async fn process_register(
        &self,
        register: &ProcessingRegister,
        ctx: &ExecutionContext,
    ) -> Result<RegisterOutcome> {
        let started = Instant::now();
        log_register_start!(register.id, register.name, register.retention_period_months);

        let state = PassState::Pending.start()?;
        if let Some(anonymizer) = &register.anonymizer {
            let targets = register.rules.iter().map(|r| &r.entity_type);
            self.registry.validate_anonymizer_for(anonymizer, targets)?;
        }
        let cutoff = retention_cutoff(ctx.today(), register.retention_period_months)?;

        let mut count = 0u64;
        for rule in &register.rules {
            count += self.process_rule(register, rule, cutoff, count, ctx).await?;
        }

        let log = self.logger.record_pass(register, count, ctx).await?;
        let state = state.finish(count)?;

        log_register_complete!(register.id, count, started.elapsed());
        Ok(RegisterOutcome {
            register: register.clone(),
            state,
            processed_count: count,
            log,
        })
    }

    async fn process_rule(
        &self,
        register: &ProcessingRegister,
        rule: &ProcessingRule,
        cutoff: NaiveDate,
        register_count: u64,
        ctx: &ExecutionContext,
    ) -> Result<u64> {
        let descriptor = self.registry.resolve(&rule.entity_type)?;
        let filter = compile(rule, descriptor, cutoff)?;
        let ids = self.records.select_ids(&filter).await?;

        tracing::debug!(
            register_id = %register.id,
            entity = %rule.entity_type,
            predicate = %filter.predicate(),
            cutoff = %cutoff,
            matched = ids.len(),
            "Rule compiled"
        );

        let mut processed = 0u64;
        for id in ids {
            let Some(mut record) = self.records.load_record(descriptor, id).await? else {
                tracing::warn!(entity = %rule.entity_type, record_id = id, "Record disappeared before processing");
                continue;
            };

            record.archived = Some(true);
            let masked = self
                .anonymizer
                .anonymize(&mut record, register.anonymizer.as_ref())?;
            self.records
                .persist_record(descriptor, &record, &written_fields(&masked))
                .await?;

            if let Some(audit) = &self.audit {
                audit.log_record(ctx.now(), register.id, &record.entity, record.id, &masked)?;
            }

            processed += 1;
            // cadence follows the register-wide count, not the per-rule one
            if (register_count + processed) % self.config.flush_interval as u64 == 0 {
                self.records.clear_session().await?;
            }
        }
        self.records.clear_session().await?;

        Ok(processed)
    }

    async fn dry_run_register(
        &self,
        register: &ProcessingRegister,
        ctx: &ExecutionContext,
    ) -> Result<RegisterOutcome> {
        let cutoff = retention_cutoff(ctx.today(), register.retention_period_months)?;

        let mut count = 0u64;
        for rule in &register.rules {
            let descriptor = self.registry.resolve(&rule.entity_type)?;
            let filter = compile(rule, descriptor, cutoff)?;
            let matched = self.records.select_ids(&filter).await?.len() as u64;
            tracing::info!(
                register_id = %register.id,
                entity = %rule.entity_type,
                cutoff = %cutoff,
                matched,
                "Dry run: records that would be processed"
            );
            count += matched;
        }

        Ok(RegisterOutcome {
            register: register.clone(),
            state: PassState::Pending,
            processed_count: count,
            log: None,
        })
    }

    async fn notify_success(
        &self,
        register: &ProcessingRegister,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        self.notifier
            .send_notification(Notification {
                recipient: ctx.user.clone(),
                title: messages::archiving_title(ctx.locale).to_string(),
                body: messages::processed_finished(ctx.locale).to_string(),
                related: Some(RelatedEntity::new(
                    register.id.value(),
                    messages::REGISTER_ENTITY_TYPE,
                )),
            })
            .await
    }

    async fn notify_failure(&self, ctx: &ExecutionContext) {
        let notification = Notification {
            recipient: ctx.user.clone(),
            title: messages::archiving_title(ctx.locale).to_string(),
            body: messages::error_occurred(ctx.locale).to_string(),
            related: None,
        };
        if let Err(e) = self.notifier.send_notification(notification).await {
            tracing::error!(error = %e, "Failed to send failure notification");
        }
    }
}
