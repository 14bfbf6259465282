//! Backend factory
//!
//! Builds the record store, register repository and notifier from
//! configuration, sharing one PostgreSQL pool between them.

use crate::adapters::database::traits::{RecordStore, RegisterRepository};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient, PostgreSQLNotifier};
use crate::config::schema::{CustodianConfig, NotificationTarget};
use crate::domain::Result;
use crate::notification::{LogNotifier, NotificationService};
use std::sync::Arc;

/// Persistence and notification collaborators for a run
pub struct Backend {
    pub records: Arc<dyn RecordStore>,
    pub registers: Arc<dyn RegisterRepository>,
    pub notifier: Arc<dyn NotificationService>,
    pub client: Arc<PostgreSQLClient>,
}

/// Create the PostgreSQL backend described by `config`
///
/// # Errors
///
/// Returns an error if the connection pool cannot be created.
pub async fn create_backend(config: &CustodianConfig) -> Result<Backend> {
    tracing::info!("Creating PostgreSQL client");
    let client = Arc::new(PostgreSQLClient::new(config.postgresql.clone()).await?);
    let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(
        client.clone(),
        config.processing.stale_lock_minutes,
    ));

    Ok(Backend {
        records: adapter.clone() as Arc<dyn RecordStore>,
        registers: adapter as Arc<dyn RegisterRepository>,
        notifier: create_notifier(config.notifications.target, &client),
        client,
    })
}

/// Notifier for the configured target
pub fn create_notifier(
    target: NotificationTarget,
    client: &Arc<PostgreSQLClient>,
) -> Arc<dyn NotificationService> {
    match target {
        NotificationTarget::Log => Arc::new(LogNotifier),
        NotificationTarget::Database => Arc::new(PostgreSQLNotifier::new(client.clone())),
    }
}
