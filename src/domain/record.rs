//! Target records and typed field values
//!
//! A [`TargetRecord`] is one row of a configured entity type, carrying only the
//! fields the accessor registry knows about. A field missing from the value
//! map is null.

use crate::domain::ids::{EntityType, FieldName};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared storage kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
}

impl FieldKind {
    /// True for kinds usable in an age check
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::DateTime)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-null field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Decimal(_) => FieldKind::Decimal,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::DateTime(_) => FieldKind::DateTime,
        }
    }

    /// Calendar date of a temporal value; `None` for other kinds
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parses `raw` as a value of `kind`
    ///
    /// Used to turn selection option values and JSON scalars into typed values.
    pub fn parse_as(kind: FieldKind, raw: &str) -> Result<Self, String> {
        let invalid = || format!("'{raw}' is not a valid {kind} value");
        match kind {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Integer => raw
                .trim()
                .parse()
                .map(FieldValue::Integer)
                .map_err(|_| invalid()),
            FieldKind::Decimal => raw
                .trim()
                .parse()
                .map(FieldValue::Decimal)
                .map_err(|_| invalid()),
            FieldKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(FieldValue::Boolean(true)),
                "false" | "0" => Ok(FieldValue::Boolean(false)),
                _ => Err(invalid()),
            },
            FieldKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| invalid()),
            FieldKind::DateTime => parse_datetime(raw.trim())
                .map(FieldValue::DateTime)
                .ok_or_else(invalid),
        }
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Decimal(d) => write!(f, "{d}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// One row of a target entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: i64,
    pub entity: EntityType,
    /// Nullable archived flag; `None` and `Some(false)` both mean "not archived"
    pub archived: Option<bool>,
    #[serde(default)]
    values: BTreeMap<FieldName, FieldValue>,
}

impl TargetRecord {
    pub fn new(entity: EntityType, id: i64) -> Self {
        Self {
            id,
            entity,
            archived: None,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter used when hydrating records
    pub fn with_value(mut self, field: FieldName, value: FieldValue) -> Self {
        self.values.insert(field, value);
        self
    }

    pub fn with_archived(mut self, archived: Option<bool>) -> Self {
        self.archived = archived;
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived == Some(true)
    }

    pub fn get(&self, field: &FieldName) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Raw write without kind checking; go through the accessor registry instead
    pub(crate) fn put(&mut self, field: FieldName, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn values(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.values.iter()
    }
}
