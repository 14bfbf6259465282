//! Append-only trail of masked fields
//!
//! One line per anonymized record. Original values are stored only as SHA-256
//! digests, never in plaintext.

use crate::config::AuditTrailConfig;
use crate::core::processing::MaskedField;
use crate::domain::{EntityType, RegisterId, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: String,
    register_id: RegisterId,
    entity_type: &'a EntityType,
    record_id: i64,
    fields: Vec<AuditField<'a>>,
}

#[derive(Debug, Serialize)]
struct AuditField<'a> {
    field: &'a str,
    strategy: &'a str,
    /// SHA-256 of the original value
    value_hash: String,
}

pub struct AuditTrail {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditTrail {
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    /// Trail described by `[processing.audit]`; `None` when disabled
    pub fn from_config(config: &AuditTrailConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(config.log_path.clone(), config.json_format, true).map(Some)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Appends the entry for one anonymized record
    pub fn log_record(
        &self,
        at: DateTime<Utc>,
        register_id: RegisterId,
        entity_type: &EntityType,
        record_id: i64,
        masked: &[MaskedField],
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditEntry {
            timestamp: at.to_rfc3339(),
            register_id,
            entity_type,
            record_id,
            fields: masked
                .iter()
                .map(|m| AuditField {
                    field: m.field.as_str(),
                    strategy: &m.strategy,
                    value_hash: hash_value(&m.original.to_string()),
                })
                .collect(),
        };

        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditEntry<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        if self.json_format {
            let json_line = serde_json::to_string(entry)?;
            writeln!(file, "{json_line}")?;
        } else {
            let fields: Vec<String> = entry
                .fields
                .iter()
                .map(|f| format!("{}({})", f.field, f.strategy))
                .collect();
            writeln!(
                file,
                "[{}] Register: {} | {} #{} | Fields: {}",
                entry.timestamp,
                entry.register_id,
                entry.entity_type,
                entry.record_id,
                fields.join(", ")
            )?;
        }

        Ok(())
    }
}

fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}
