//! Anonymizer configuration: which fields to mask and how

use crate::domain::ids::{EntityType, FieldName};
use serde::{Deserialize, Serialize};

/// One masking instruction for a field of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizerLine {
    pub entity_type: EntityType,
    pub field: FieldName,
    /// Masking strategy id such as `fake-name`; `None` lets the field kind decide
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Ordered list of masking lines; may be shared by several registers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anonymizer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub lines: Vec<AnonymizerLine>,
}

impl Anonymizer {
    /// Lines targeting `entity`, in configured order
    ///
    /// Duplicate lines for one field are kept; each applies in turn.
    pub fn lines_for<'a>(
        &'a self,
        entity: &'a EntityType,
    ) -> impl Iterator<Item = &'a AnonymizerLine> + 'a {
        self.lines.iter().filter(move |l| &l.entity_type == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(entity: &str, field: &str, strategy: Option<&str>) -> AnonymizerLine {
        AnonymizerLine {
            entity_type: EntityType::new(entity).unwrap(),
            field: FieldName::new(field).unwrap(),
            strategy: strategy.map(str::to_string),
        }
    }

    #[test]
    fn test_lines_for_keeps_order_and_duplicates() {
        let anonymizer = Anonymizer {
            id: 1,
            name: "default".into(),
            lines: vec![
                line("Contact", "fullName", Some("fake-name")),
                line("Partner", "name", None),
                line("Contact", "email", Some("fake-email")),
                line("Contact", "fullName", Some("redact")),
            ],
        };
        let contact = EntityType::new("Contact").unwrap();
        let fields: Vec<_> = anonymizer
            .lines_for(&contact)
            .map(|l| l.field.as_str())
            .collect();
        assert_eq!(fields, vec!["fullName", "email", "fullName"]);
    }
}
