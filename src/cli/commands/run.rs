//! Run command implementation
//!
//! Loads the configured registers and hands them to the [`RegisterRunner`].

use crate::adapters::database::{create_backend, RecordStore, RegisterRepository};
use crate::anonymization::{AuditTrail, FakerMaskingService, StaticSelectionCatalog};
use crate::config::load_config;
use crate::config::schema::CustodianConfig;
use crate::core::accessor::FieldAccessorRegistry;
use crate::core::processing::{RegisterRunner, RunSummary, RunnerConfig};
use crate::domain::{ExecutionContext, Locale, ProcessingRegister, Result, UserRef};
use crate::notification::NotificationService;
use clap::Args;
use std::io::{self, Write};
use std::sync::Arc;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Register ids to process, comma-separated (default: processing.register_ids,
    /// or every active register)
    #[arg(long, value_delimiter = ',')]
    pub register: Vec<i64>,

    /// Select and count only; nothing is written, logged or notified
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting register run");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            return Ok(2);
        }

        let registry = match FieldAccessorRegistry::from_config(&config.entities) {
            Ok(r) => Arc::new(r),
            Err(e) => {
                println!("❌ Invalid entity configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let locale: Locale = match config.application.locale.parse() {
            Ok(l) => l,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let backend = match create_backend(&config).await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to connect to PostgreSQL");
                println!("   Error: {e}");
                return Ok(4);
            }
        };
        if let Err(e) = backend.registers.test_connection().await {
            println!("❌ Failed to connect to PostgreSQL");
            println!("   Error: {e}");
            return Ok(4);
        }

        let all = match backend.registers.list_registers().await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load processing registers");
                println!("   Error: {e}");
                return Ok(5);
            }
        };
        let (selected, missing) = select_registers(all, &config.processing.register_ids);
        for id in &missing {
            tracing::warn!(register_id = id, "Requested register not found");
            println!("⚠️  Register {id} not found, ignoring");
        }

        if selected.is_empty() {
            println!("No active processing register to run.");
            return Ok(0);
        }

        print_plan(&config, &selected);

        if !self.yes && !config.application.dry_run {
            print!("Archive and anonymize matching records? [y/N] ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Run cancelled.");
                return Ok(0);
            }
        }

        let runner = match build_runner(
            &config,
            registry,
            backend.records.clone(),
            backend.registers.clone(),
            backend.notifier.clone(),
        ) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to prepare the run");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let ctx = ExecutionContext::system(UserRef::new(&config.application.run_as), locale);

        match runner.run_with_summary(&selected, &ctx).await {
            Ok(summary) => {
                print_summary(&summary);
                Ok(0)
            }
            Err(e) => {
                println!();
                println!("❌ Run failed: {e}");
                println!("   Records persisted before the failure stay archived.");
                Ok(5)
            }
        }
    }

    fn apply_overrides(&self, config: &mut CustodianConfig) {
        if self.dry_run {
            config.application.dry_run = true;
        }
        if !self.register.is_empty() {
            config.processing.register_ids = self.register.clone();
        }
    }
}

/// Active registers among `all`, restricted to `ids` when non-empty
///
/// Also returns the requested ids that do not exist.
pub fn select_registers(
    all: Vec<ProcessingRegister>,
    ids: &[i64],
) -> (Vec<ProcessingRegister>, Vec<i64>) {
    let missing = ids
        .iter()
        .copied()
        .filter(|id| !all.iter().any(|r| r.id.value() == *id))
        .collect();

    let selected = all
        .into_iter()
        .filter(|r| r.is_active())
        .filter(|r| ids.is_empty() || ids.contains(&r.id.value()))
        .collect();

    (selected, missing)
}

/// Wires a runner from configuration and the given collaborators
///
/// # Errors
///
/// Returns an error if the audit trail directory cannot be created.
pub fn build_runner(
    config: &CustodianConfig,
    registry: Arc<FieldAccessorRegistry>,
    records: Arc<dyn RecordStore>,
    registers: Arc<dyn RegisterRepository>,
    notifier: Arc<dyn NotificationService>,
) -> Result<RegisterRunner> {
    let masking = Arc::new(FakerMaskingService::with_optional_seed(
        config.processing.masking_seed,
    ));
    let selections = Arc::new(StaticSelectionCatalog::from_config(&config.selections));

    let runner = RegisterRunner::new(
        records,
        registers,
        registry,
        masking,
        selections,
        notifier,
        RunnerConfig::from_config(&config.processing, config.application.dry_run),
    );

    Ok(match AuditTrail::from_config(&config.processing.audit)? {
        Some(trail) => runner.with_audit_trail(trail),
        None => runner,
    })
}

fn print_plan(config: &CustodianConfig, registers: &[ProcessingRegister]) {
    println!("🗂️  Processing registers");
    println!();
    if config.application.dry_run {
        println!("   Mode: DRY RUN (no records will be modified)");
    }
    for register in registers {
        println!(
            "   #{} {} (retention {} months, {} rule(s), anonymizer: {})",
            register.id,
            register.name,
            register.retention_period_months,
            register.rules.len(),
            register
                .anonymizer
                .as_ref()
                .map(|a| a.name.as_str())
                .unwrap_or("none")
        );
    }
    println!();
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Run Summary");
    println!("   Registers processed: {}", summary.outcomes.len());
    for outcome in &summary.outcomes {
        println!(
            "     #{} {}: {} record(s) [{}]",
            outcome.register.id, outcome.register.name, outcome.processed_count, outcome.state
        );
    }
    if !summary.skipped.is_empty() {
        println!("   Registers skipped: {}", summary.skipped.len());
        for skipped in &summary.skipped {
            println!(
                "     #{}: {}",
                skipped.register_id,
                skipped.reason.as_str()
            );
        }
    }
    println!("   Total records: {}", summary.total_processed());
    println!("   Duration: {:.2}s", summary.duration.as_secs_f64());

    if summary.dry_run {
        println!();
        println!("⚠️  DRY RUN: counts only, no records were archived or anonymized");
    } else {
        println!();
        println!("✅ Run completed");
    }
}
