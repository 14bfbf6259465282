//! Status command implementation
//!
//! Lists processing registers with their most recent processing logs.

use crate::adapters::database::create_backend;
use crate::config::load_config;
use crate::domain::{ProcessingLog, ProcessingRegister, RegisterId};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single register
    #[arg(long)]
    pub register: Option<i64>,

    /// Number of processing logs shown per register
    #[arg(long, default_value_t = 3)]
    pub logs: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking register status");

        println!("📊 Processing Register Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(2);
            }
        };

        let filter = match self.register.map(RegisterId::new).transpose() {
            Ok(f) => f,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let backend = match create_backend(&config).await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {}", e);
                return Ok(4);
            }
        };

        let registers = match backend.registers.list_registers().await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load processing registers");
                println!("   Error: {}", e);
                return Ok(5);
            }
        };
        let registers: Vec<ProcessingRegister> = registers
            .into_iter()
            .filter(|r| filter.map_or(true, |id| r.id == id))
            .collect();

        if registers.is_empty() {
            println!("No processing registers found.");
            return Ok(0);
        }

        let logs = match backend.registers.list_processing_logs(filter).await {
            Ok(l) => l,
            Err(e) => {
                println!("❌ Failed to load processing logs");
                println!("   Error: {}", e);
                return Ok(5);
            }
        };

        println!(
            "{:<6} {:<32} {:<9} {:>9} {:>6}  {}",
            "ID", "Name", "Status", "Retention", "Rules", "Last processed"
        );
        println!("{}", "-".repeat(90));

        for register in &registers {
            let recent = recent_logs(&logs, register.id, self.logs);
            let last = recent
                .first()
                .map(|l| {
                    format!(
                        "{} ({} records)",
                        l.processed_at.format("%Y-%m-%d %H:%M:%S"),
                        l.processed_count
                    )
                })
                .unwrap_or_else(|| "never".to_string());

            println!(
                "{:<6} {:<32} {:<9} {:>8}m {:>6}  {}",
                register.id.value(),
                truncate(&register.name, 32),
                register.status.as_str(),
                register.retention_period_months,
                register.rules.len(),
                last
            );
            for log in recent.iter().skip(1) {
                println!(
                    "{:<66}{} ({} records)",
                    "",
                    log.processed_at.format("%Y-%m-%d %H:%M:%S"),
                    log.processed_count
                );
            }
        }

        println!();
        println!("Total registers: {}", registers.len());

        Ok(0)
    }
}

/// The `limit` most recent logs of `register_id`; `logs` is newest first
fn recent_logs(logs: &[ProcessingLog], register_id: RegisterId, limit: usize) -> Vec<&ProcessingLog> {
    logs.iter()
        .filter(|l| l.register_id == register_id)
        .take(limit)
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn log(register: i64, day: u32, count: u64) -> ProcessingLog {
        ProcessingLog {
            register_id: RegisterId::new(register).unwrap(),
            processed_at: Utc.with_ymd_and_hms(2025, 3, day, 2, 0, 0).unwrap(),
            processed_count: count,
        }
    }

    #[test]
    fn test_recent_logs_filters_and_limits() {
        let logs = vec![log(1, 9, 4), log(2, 8, 1), log(1, 7, 2), log(1, 5, 6)];
        let recent = recent_logs(&logs, RegisterId::new(1).unwrap(), 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].processed_count, 4);
        assert_eq!(recent[1].processed_count, 2);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Contacts", 32), "Contacts");
        assert_eq!(truncate("Customer contact retention", 10), "Custome...");
    }
}
