//! Register processing pipeline
//!
//! - [`filter`]: rule filter compiler
//! - [`anonymize`]: record anonymizer
//! - [`audit`]: processing log writer
//! - [`runner`]: register runner

pub mod anonymize;
pub mod audit;
pub mod filter;
pub mod runner;
pub mod state;
pub mod summary;

pub use anonymize::{MaskedField, RecordAnonymizer};
pub use audit::ProcessingLogger;
pub use filter::{compile, retention_cutoff, RecordFilter};
pub use runner::{RegisterRunner, RunnerConfig};
pub use state::PassState;
pub use summary::{RegisterOutcome, RunSummary, SkipReason, SkippedRegister};
