//! Record anonymizer
//!
//! Applies an anonymizer's lines for the record's entity type, in order. A
//! null field is left alone. A selection-bound field takes the selection's
//! first option; every other field goes through the [`MaskingService`].

use crate::anonymization::{MaskingService, MaskingStrategy, SelectionCatalog};
use crate::core::accessor::{FieldAccessorRegistry, FieldDescriptor};
use crate::domain::{
    Anonymizer, AnonymizerLine, CustodianError, FieldName, FieldValue, Result, TargetRecord,
};
use std::sync::Arc;

/// One field overwritten by the anonymizer
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedField {
    pub field: FieldName,
    /// Strategy id actually applied, or `selection:<name>`
    pub strategy: String,
    /// Value before this line ran
    pub original: FieldValue,
}

pub struct RecordAnonymizer {
    registry: Arc<FieldAccessorRegistry>,
    masking: Arc<dyn MaskingService>,
    selections: Arc<dyn SelectionCatalog>,
}

impl RecordAnonymizer {
    pub fn new(
        registry: Arc<FieldAccessorRegistry>,
        masking: Arc<dyn MaskingService>,
        selections: Arc<dyn SelectionCatalog>,
    ) -> Self {
        Self {
            registry,
            masking,
            selections,
        }
    }

    /// Masks the fields of `record` named by `anonymizer`
    ///
    /// Returns one entry per applied line; a field listed twice appears twice.
    /// On error the record may be partially modified and must not be persisted.
    pub fn anonymize(
        &self,
        record: &mut TargetRecord,
        anonymizer: Option<&Anonymizer>,
    ) -> Result<Vec<MaskedField>> {
        let Some(anonymizer) = anonymizer else {
            return Ok(Vec::new());
        };
        let entity = record.entity.clone();
        let descriptor = self.registry.resolve(&entity)?;

        let mut masked = Vec::new();
        for line in anonymizer.lines_for(&entity) {
            let accessor = descriptor.accessor(&line.field)?;
            let Some(current) = accessor.get(record).cloned() else {
                continue;
            };

            let (replacement, strategy) = self.replacement(&current, accessor.descriptor(), line)?;
            accessor.set(record, replacement)?;

            masked.push(MaskedField {
                field: line.field.clone(),
                strategy,
                original: current,
            });
        }

        Ok(masked)
    }

    fn replacement(
        &self,
        current: &FieldValue,
        field: &FieldDescriptor,
        line: &AnonymizerLine,
    ) -> Result<(FieldValue, String)> {
        if let Some(selection) = &field.selection {
            let raw = self.selections.first_value(selection)?;
            let value = FieldValue::parse_as(field.kind, &raw).map_err(|e| {
                CustodianError::Domain(format!(
                    "Selection '{selection}' for field '{}': {e}",
                    field.name
                ))
            })?;
            return Ok((value, format!("selection:{selection}")));
        }

        let value = self
            .masking
            .anonymize_value(current, field, line.strategy.as_deref())?;
        let strategy = line
            .strategy
            .clone()
            .unwrap_or_else(|| MaskingStrategy::default_for(field.kind).id().to_string());
        Ok((value, strategy))
    }
}

/// Distinct fields of `masked`, first occurrence order
pub fn written_fields(masked: &[MaskedField]) -> Vec<FieldName> {
    let mut fields: Vec<FieldName> = Vec::with_capacity(masked.len());
    for m in masked {
        if !fields.contains(&m.field) {
            fields.push(m.field.clone());
        }
    }
    fields
}
