//! Selection (enumeration) lookup
//!
//! A field bound to a selection is never faked: it takes the stored value of
//! the selection's first option, so the result stays a legal enum member.

use crate::domain::{CustodianError, Result};
use std::collections::BTreeMap;

pub trait SelectionCatalog: Send + Sync {
    /// Stored option values of `selection`, in declared order
    fn options(&self, selection: &str) -> Option<Vec<String>>;

    /// First option of `selection`
    ///
    /// # Errors
    ///
    /// Returns [`CustodianError::Domain`] when the selection is unknown or has no options.
    fn first_value(&self, selection: &str) -> Result<String> {
        let options = self.options(selection).ok_or_else(|| {
            CustodianError::Domain(format!("Unknown selection '{selection}'"))
        })?;
        options.into_iter().next().ok_or_else(|| {
            CustodianError::Domain(format!("Selection '{selection}' has no options"))
        })
    }
}

/// Catalog backed by the `[selections]` configuration table
#[derive(Debug, Clone, Default)]
pub struct StaticSelectionCatalog {
    selections: BTreeMap<String, Vec<String>>,
}

impl StaticSelectionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(selections: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            selections: selections.clone(),
        }
    }

    pub fn with_selection(mut self, name: impl Into<String>, options: Vec<String>) -> Self {
        self.selections.insert(name.into(), options);
        self
    }
}

impl SelectionCatalog for StaticSelectionCatalog {
    fn options(&self, selection: &str) -> Option<Vec<String>> {
        self.selections.get(selection).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticSelectionCatalog {
        StaticSelectionCatalog::new()
            .with_selection("contact.title", vec!["mr".into(), "mrs".into()])
            .with_selection("contact.empty", vec![])
    }

    #[test]
    fn test_first_value() {
        assert_eq!(catalog().first_value("contact.title").unwrap(), "mr");
    }

    #[test]
    fn test_first_value_unknown_selection() {
        let err = catalog().first_value("contact.gender").unwrap_err();
        assert!(matches!(err, CustodianError::Domain(_)));
    }

    #[test]
    fn test_first_value_empty_selection() {
        let err = catalog().first_value("contact.empty").unwrap_err();
        assert!(err.to_string().contains("no options"));
    }
}
