//! Tokenization: replaces a value with a unique random token (`LABEL_NNN_RRRR`)

use super::redaction::field_label;
use crate::domain::FieldName;
use rand::Rng;
use std::collections::HashMap;

/// Per-field token counters
#[derive(Debug, Default)]
pub struct TokenCounters {
    counters: HashMap<FieldName, usize>,
}

impl TokenCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next token for `field`
    pub fn next_token<R: Rng + ?Sized>(&mut self, field: &FieldName, rng: &mut R) -> String {
        let counter = self.counters.entry(field.clone()).or_insert(0);
        *counter += 1;

        let random_suffix: u32 = rng.gen_range(1000..10000);
        format!("{}_{:03}_{}", field_label(field), counter, random_suffix)
    }
}
