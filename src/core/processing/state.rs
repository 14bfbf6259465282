//! Per-register pass state machine
//!
//! `Pending -> Running -> Logged | LoggedEmpty`. No retry or resume state.

use crate::domain::{CustodianError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    #[default]
    Pending,
    Running,
    /// Pass processed at least one record and wrote a log row
    Logged,
    /// Pass processed nothing; no log row
    LoggedEmpty,
}

impl PassState {
    pub fn start(self) -> Result<Self> {
        match self {
            PassState::Pending => Ok(PassState::Running),
            other => Err(invalid(other, "start")),
        }
    }

    /// Terminal state for a pass that processed `count` records
    pub fn finish(self, count: u64) -> Result<Self> {
        match self {
            PassState::Running if count > 0 => Ok(PassState::Logged),
            PassState::Running => Ok(PassState::LoggedEmpty),
            other => Err(invalid(other, "finish")),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PassState::Logged | PassState::LoggedEmpty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassState::Pending => "pending",
            PassState::Running => "running",
            PassState::Logged => "logged",
            PassState::LoggedEmpty => "logged_empty",
        }
    }
}

fn invalid(from: PassState, action: &str) -> CustodianError {
    CustodianError::Domain(format!("Cannot {action} a register pass in state '{from}'"))
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
