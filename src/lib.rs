// Custodian - GDPR processing register runner
// Copyright (c) 2025 Custodian Contributors
// Licensed under the MIT License

//! # Custodian - GDPR processing register runner
//!
//! Custodian enforces data-retention policies on ERP records. A
//! *processing register* names a retention period, an optional
//! *anonymizer* and a list of *rules*. Each run selects the records whose
//! age fields are all older than the retention cutoff, masks the configured
//! fields, marks them archived, logs the pass and notifies the operator.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Field accessor registry, rule filter compiler, record
//!   anonymizer, processing logger and register runner
//! - [`anonymization`] - Masking strategies, selection catalog, audit trail
//! - [`adapters`] - PostgreSQL and in-memory persistence
//! - [`notification`] - Notification messages and delivery
//! - [`domain`] - Core domain types and the [`domain::CustodianError`] type
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use custodian::adapters::database::RegisterRepository;
//! use custodian::adapters::memory::InMemoryStore;
//! use custodian::anonymization::{FakerMaskingService, StaticSelectionCatalog};
//! use custodian::core::accessor::{EntityDescriptor, FieldAccessorRegistry};
//! use custodian::core::processing::{RegisterRunner, RunnerConfig};
//! use custodian::domain::{EntityType, ExecutionContext, FieldKind, FieldName, Locale, UserRef};
//! use custodian::notification::LogNotifier;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = FieldAccessorRegistry::new().with_entity(
//!     EntityDescriptor::new(EntityType::new("Contact")?, "base_contact")
//!         .with_field(FieldName::new("lastActivityDate")?, FieldKind::Date)
//!         .with_field(FieldName::new("fullName")?, FieldKind::Text),
//! )?;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let runner = RegisterRunner::new(
//!     store.clone(),
//!     store.clone(),
//!     Arc::new(registry),
//!     Arc::new(FakerMaskingService::new()),
//!     Arc::new(StaticSelectionCatalog::new()),
//!     Arc::new(LogNotifier),
//!     RunnerConfig::default(),
//! );
//!
//! let ctx = ExecutionContext::system(UserRef::new("admin"), Locale::En);
//! let registers = store.list_registers().await?;
//! let processed = runner.run(&registers, &ctx).await?;
//! println!("Processed {} registers", processed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`]; the CLI maps failures to exit
//! codes (2 configuration, 4 connection, 5 fatal).

pub mod adapters;
pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod notification;
