//! Masking services used by the record anonymizer
//!
//! - **Strategies**: strategy ids named by anonymizer lines ([`MaskingStrategy`])
//! - **Masking**: the [`MaskingService`] seam and its `fake`-backed implementation
//! - **Selections**: enumeration lookup for selection-bound fields
//! - **Audit trail**: optional per-record file log with hashed originals

pub mod audit;
pub mod masking;
pub mod redaction;
pub mod selection;
pub mod strategy;
pub mod tokenization;

pub use audit::AuditTrail;
pub use masking::{FakerMaskingService, MaskingService};
pub use selection::{SelectionCatalog, StaticSelectionCatalog};
pub use strategy::MaskingStrategy;
