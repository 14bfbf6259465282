//! External system integrations for Custodian.
//!
//! - [`database`] - persistence traits and the backend factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - in-memory implementation
//!
//! ```rust
//! use custodian::adapters::memory::InMemoryStore;
//! use custodian::adapters::database::RegisterRepository;
//!
//! # async fn example() -> custodian::domain::Result<()> {
//! let store = InMemoryStore::new();
//! assert!(store.list_registers().await?.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
