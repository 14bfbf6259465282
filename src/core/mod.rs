//! Core processing logic
//!
//! - [`accessor`]: typed field access by entity and field name
//! - [`processing`]: filter compilation, anonymization and the register runner

pub mod accessor;
pub mod processing;
