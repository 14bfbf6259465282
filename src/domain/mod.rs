//! Domain models and types for Custodian.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`RegisterId`], [`EntityType`], [`FieldName`])
//! - **Register configuration** ([`ProcessingRegister`], [`ProcessingRule`], [`Anonymizer`])
//! - **Target records** ([`TargetRecord`], [`FieldValue`])
//! - **Execution context** ([`ExecutionContext`])
//! - **Error types** ([`CustodianError`]) and the [`Result`] alias
//!
//! ```rust
//! use custodian::domain::{EntityType, ProcessingRule};
//!
//! let rule = ProcessingRule::new(EntityType::new("Contact").unwrap(), "lastActivityDate");
//! assert_eq!(rule.field_names().unwrap().len(), 1);
//! ```

pub mod anonymizer;
pub mod context;
pub mod errors;
pub mod ids;
pub mod record;
pub mod register;
pub mod result;

pub use anonymizer::{Anonymizer, AnonymizerLine};
pub use context::{Clock, ExecutionContext, FixedClock, Locale, SystemClock, UserRef};
pub use errors::CustodianError;
pub use ids::{EntityType, FieldName, RegisterId};
pub use record::{FieldKind, FieldValue, TargetRecord};
pub use register::{ProcessingLog, ProcessingRegister, ProcessingRule, RegisterStatus};
pub use result::Result;
