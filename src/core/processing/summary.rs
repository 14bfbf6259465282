//! Run summary and reporting

use crate::core::processing::state::PassState;
use crate::domain::{ProcessingLog, ProcessingRegister, RegisterId};
use std::time::Duration;

/// Why a requested register was not processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Inactive,
    /// Deleted between selection and reload
    Vanished,
    /// Another run holds the register's lock
    Locked,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Inactive => "inactive",
            SkipReason::Vanished => "vanished",
            SkipReason::Locked => "locked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegister {
    pub register_id: RegisterId,
    pub reason: SkipReason,
}

/// Result of one register pass
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterOutcome {
    pub register: ProcessingRegister,
    pub state: PassState,
    /// Records processed, or that would be processed in a dry run
    pub processed_count: u64,
    pub log: Option<ProcessingLog>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<RegisterOutcome>,
    pub skipped: Vec<SkippedRegister>,
    pub dry_run: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn skip(&mut self, register_id: RegisterId, reason: SkipReason) {
        self.skipped.push(SkippedRegister {
            register_id,
            reason,
        });
    }

    /// Registers that went through a full pass, in processing order
    pub fn processed_registers(&self) -> Vec<ProcessingRegister> {
        self.outcomes.iter().map(|o| o.register.clone()).collect()
    }

    pub fn total_processed(&self) -> u64 {
        self.outcomes.iter().map(|o| o.processed_count).sum()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            registers = self.outcomes.len(),
            skipped = self.skipped.len(),
            records = self.total_processed(),
            dry_run = self.dry_run,
            duration_ms = self.duration.as_millis() as u64,
            "Processing run completed"
        );

        for skipped in &self.skipped {
            tracing::warn!(
                register_id = %skipped.register_id,
                reason = skipped.reason.as_str(),
                "Register skipped"
            );
        }
    }
}
