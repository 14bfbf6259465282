//! Processing register configuration and its audit log rows

use crate::domain::anonymizer::Anonymizer;
use crate::domain::ids::{EntityType, FieldName, RegisterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a processing register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegisterStatus {
    #[default]
    Active,
    Inactive,
}

impl RegisterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterStatus::Active => "active",
            RegisterStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for RegisterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(RegisterStatus::Active),
            "inactive" => Ok(RegisterStatus::Inactive),
            other => Err(format!("Unknown register status '{other}'")),
        }
    }
}

/// One retention rule: which entity to scan and which date fields decide age
///
/// `age_fields` keeps the text exactly as an administrator typed it, e.g.
/// `"lastActivityDate, createdOn"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRule {
    pub entity_type: EntityType,
    pub age_fields: String,
}

impl ProcessingRule {
    pub fn new(entity_type: EntityType, age_fields: impl Into<String>) -> Self {
        Self {
            entity_type,
            age_fields: age_fields.into(),
        }
    }

    /// Splits the raw field list: all whitespace removed, split on `,`,
    /// empty segments dropped.
    pub fn field_segments(&self) -> Vec<String> {
        let compact: String = self
            .age_fields
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        compact
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parsed and validated field names
    ///
    /// # Errors
    ///
    /// Returns a message when the list is empty or a segment is not an identifier.
    pub fn field_names(&self) -> Result<Vec<FieldName>, String> {
        let segments = self.field_segments();
        if segments.is_empty() {
            return Err(format!(
                "Rule for '{}' has no age-check fields",
                self.entity_type
            ));
        }
        segments.into_iter().map(FieldName::new).collect()
    }
}

/// A retention/anonymization policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRegister {
    pub id: RegisterId,
    pub name: String,
    #[serde(default)]
    pub status: RegisterStatus,
    pub retention_period_months: u32,
    #[serde(default)]
    pub anonymizer: Option<Anonymizer>,
    #[serde(default)]
    pub rules: Vec<ProcessingRule>,
}

impl ProcessingRegister {
    pub fn is_active(&self) -> bool {
        self.status == RegisterStatus::Active
    }

    /// Structural checks that need no entity metadata
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("Register {} has an empty name", self.id));
        }
        for rule in &self.rules {
            rule.field_names()
                .map_err(|e| format!("Register {}: {}", self.id, e))?;
        }
        Ok(())
    }
}

/// Audit row appended after a pass that processed at least one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingLog {
    pub register_id: RegisterId,
    pub processed_at: DateTime<Utc>,
    pub processed_count: u64,
}
