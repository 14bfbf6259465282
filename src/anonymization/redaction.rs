//! Redaction: replaces a value with a `[FIELD_LABEL]` marker

use crate::domain::FieldName;

/// Upper snake case label for a field name: `fullName` -> `FULL_NAME`
pub fn field_label(field: &FieldName) -> String {
    let mut label = String::with_capacity(field.as_str().len() + 4);
    let mut prev_lower = false;
    for c in field.as_str().chars() {
        if c.is_ascii_uppercase() && prev_lower {
            label.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        label.push(c.to_ascii_uppercase());
    }
    label
}

/// Redacted marker for `field`
pub fn redact(field: &FieldName) -> String {
    format!("[{}]", field_label(field))
}
