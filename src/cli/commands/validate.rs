//! Validate config command implementation
//!
//! This module implements the `validate-config` command. With `--registers`
//! it also loads the stored registers and checks them against the configured
//! entities.

use crate::adapters::database::create_backend;
use crate::anonymization::masking::resolve_strategy;
use crate::config::load_config;
use crate::config::schema::CustodianConfig;
use crate::core::accessor::FieldAccessorRegistry;
use crate::core::processing::{compile, retention_cutoff};
use crate::domain::{CustodianError, EntityType, ProcessingRegister, Result};
use chrono::Utc;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also check stored registers and anonymizers against the entity configuration
    #[arg(long)]
    pub registers: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let registry = match FieldAccessorRegistry::from_config(&config.entities) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Invalid entity configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_config_summary(&config);

        if !self.registers {
            return Ok(0);
        }

        println!();
        println!("🔍 Checking stored registers");

        let backend = match create_backend(&config).await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to connect to PostgreSQL");
                println!("   Error: {e}");
                return Ok(4);
            }
        };
        let registers = match backend.registers.list_registers().await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load processing registers");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let mut invalid = 0;
        for register in &registers {
            match check_register(register, &registry) {
                Ok(()) => println!("   ✅ #{} {}", register.id, register.name),
                Err(e) => {
                    invalid += 1;
                    println!("   ❌ #{} {}: {e}", register.id, register.name);
                }
            }
        }

        println!();
        if invalid > 0 {
            println!("❌ {invalid} of {} register(s) are invalid", registers.len());
            Ok(2)
        } else {
            println!("✅ {} register(s) checked", registers.len());
            Ok(0)
        }
    }
}

/// Structural checks, anonymizer field resolution, and a compile of each rule
///
/// # Errors
///
/// Returns the first problem found.
pub fn check_register(register: &ProcessingRegister, registry: &FieldAccessorRegistry) -> Result<()> {
    register.validate().map_err(CustodianError::Validation)?;

    if let Some(anonymizer) = &register.anonymizer {
        let targets: Vec<&EntityType> = register.rules.iter().map(|r| &r.entity_type).collect();
        registry.validate_anonymizer_for(anonymizer, targets.iter().copied())?;
        for line in anonymizer
            .lines
            .iter()
            .filter(|l| targets.contains(&&l.entity_type))
        {
            let accessor = registry.accessor(&line.entity_type, &line.field)?;
            if accessor.descriptor().selection.is_none() {
                resolve_strategy(accessor.descriptor(), line.strategy.as_deref())?;
            }
        }
    }

    let cutoff = retention_cutoff(Utc::now().date_naive(), register.retention_period_months)?;
    for rule in &register.rules {
        let descriptor = registry.resolve(&rule.entity_type)?;
        compile(rule, descriptor, cutoff)?;
    }
    Ok(())
}

fn print_config_summary(config: &CustodianConfig) {
    println!("Configuration Summary:");
    println!("  Environment: {:?}", config.environment);
    println!("  Log Level: {}", config.application.log_level);
    println!("  Locale: {}", config.application.locale);
    println!("  Run As: {}", config.application.run_as);
    println!("  Dry Run: {}", config.application.dry_run);
    println!(
        "  PostgreSQL: {}",
        config.postgresql.connection_string.expose_secret().redacted_host()
    );
    println!("  Max Connections: {}", config.postgresql.max_connections);
    println!("  SSL Mode: {}", config.postgresql.ssl_mode);
    println!("  Flush Interval: {}", config.processing.flush_interval);
    if config.processing.register_ids.is_empty() {
        println!("  Registers: all active");
    } else {
        println!("  Registers: {:?}", config.processing.register_ids);
    }
    println!(
        "  Audit Trail: {}",
        if config.processing.audit.enabled {
            config.processing.audit.log_path.display().to_string()
        } else {
            "disabled".to_string()
        }
    );
    println!("  Notifications: {:?}", config.notifications.target);
    println!("  Entities:");
    for entity in &config.entities {
        println!(
            "    {} -> {} ({} field(s))",
            entity.name,
            entity.table_name(),
            entity.fields.len()
        );
    }
    if !config.selections.is_empty() {
        println!("  Selections: {}", config.selections.len());
    }
}
