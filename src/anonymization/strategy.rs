//! Masking strategy identifiers
//!
//! Anonymizer lines name a strategy by id (`fake-name`, `redact`, ...). A line
//! without an id falls back to [`MaskingStrategy::default_for`] the field kind.

use crate::domain::FieldKind;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskingStrategy {
    FakeName,
    FakeFirstName,
    FakeLastName,
    FakeEmail,
    FakePhone,
    FakeStreet,
    FakeCity,
    FakeCompany,
    FakeText,
    /// `[FIELD_LABEL]`
    Redact,
    /// `FIELD_LABEL_NNN_RRRR`
    Token,
    /// Salted SHA-256 digest of the original
    Hash,
    RandomNumber,
    RandomDate,
    RandomBool,
}

const ALL: [MaskingStrategy; 15] = [
    MaskingStrategy::FakeName,
    MaskingStrategy::FakeFirstName,
    MaskingStrategy::FakeLastName,
    MaskingStrategy::FakeEmail,
    MaskingStrategy::FakePhone,
    MaskingStrategy::FakeStreet,
    MaskingStrategy::FakeCity,
    MaskingStrategy::FakeCompany,
    MaskingStrategy::FakeText,
    MaskingStrategy::Redact,
    MaskingStrategy::Token,
    MaskingStrategy::Hash,
    MaskingStrategy::RandomNumber,
    MaskingStrategy::RandomDate,
    MaskingStrategy::RandomBool,
];

impl MaskingStrategy {
    pub fn id(&self) -> &'static str {
        match self {
            MaskingStrategy::FakeName => "fake-name",
            MaskingStrategy::FakeFirstName => "fake-first-name",
            MaskingStrategy::FakeLastName => "fake-last-name",
            MaskingStrategy::FakeEmail => "fake-email",
            MaskingStrategy::FakePhone => "fake-phone",
            MaskingStrategy::FakeStreet => "fake-street",
            MaskingStrategy::FakeCity => "fake-city",
            MaskingStrategy::FakeCompany => "fake-company",
            MaskingStrategy::FakeText => "fake-text",
            MaskingStrategy::Redact => "redact",
            MaskingStrategy::Token => "token",
            MaskingStrategy::Hash => "hash",
            MaskingStrategy::RandomNumber => "random-number",
            MaskingStrategy::RandomDate => "random-date",
            MaskingStrategy::RandomBool => "random-bool",
        }
    }

    /// Strategy used when an anonymizer line names none
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => MaskingStrategy::Hash,
            FieldKind::Integer | FieldKind::Decimal => MaskingStrategy::RandomNumber,
            FieldKind::Date | FieldKind::DateTime => MaskingStrategy::RandomDate,
            FieldKind::Boolean => MaskingStrategy::RandomBool,
        }
    }

    pub fn applies_to(&self, kind: FieldKind) -> bool {
        match self {
            MaskingStrategy::RandomNumber => matches!(
                kind,
                FieldKind::Integer | FieldKind::Decimal | FieldKind::Text
            ),
            MaskingStrategy::RandomDate => kind.is_temporal(),
            MaskingStrategy::RandomBool => kind == FieldKind::Boolean,
            _ => kind == FieldKind::Text,
        }
    }

    /// Every known strategy id, for help output and error messages
    pub fn known_ids() -> impl Iterator<Item = &'static str> {
        ALL.iter().map(|s| s.id())
    }
}

impl fmt::Display for MaskingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for MaskingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ALL.iter()
            .copied()
            .find(|strategy| strategy.id() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown masking strategy '{s}'. Known strategies: {}",
                    Self::known_ids().collect::<Vec<_>>().join(", ")
                )
            })
    }
}
