//! Database abstraction layer
//!
//! Trait-based persistence so the runner works against PostgreSQL in
//! production and the in-memory store in tests.

pub mod factory;
pub mod traits;

pub use factory::{create_backend, create_notifier, Backend};
pub use traits::{RecordStore, RegisterRepository};
