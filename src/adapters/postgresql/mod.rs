//! PostgreSQL backend
//!
//! Reads registers and anonymizers from the Custodian tables, selects and
//! updates target records in the ERP tables described by `[[entities]]`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::{PostgreSQLAdapter, PostgreSQLNotifier};
pub use client::PostgreSQLClient;
