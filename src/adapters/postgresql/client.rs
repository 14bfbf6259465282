//! PostgreSQL client implementation
//!
//! Pooled connections (`deadpool-postgres`) with optional TLS
//! (`postgres-native-tls`) selected by `postgresql.ssl_mode`.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{CustodianError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for Custodian
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid, the TLS
    /// connector cannot be built, or the pool cannot be created.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                CustodianError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
            }
            "require" | "verify-ca" | "verify-full" => {
                pg_config.ssl_mode(SslMode::Require);
            }
            _ => {}
        }

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = build_manager(pg_config, &config.ssl_mode, manager_config)?;

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .build()
            .map_err(|e| CustodianError::Database(format!("Failed to create connection pool: {e}")))?;

        tracing::debug!(
            host = %config.connection_string.expose_secret().redacted_host(),
            ssl_mode = %config.ssl_mode,
            max_connections = config.max_connections,
            "PostgreSQL pool created"
        );

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| CustodianError::Database(format!("Connection test failed: {e}")))?;

        tracing::info!("PostgreSQL connection test successful");
        Ok(())
    }

    /// Creates the register, log and notification tables if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;
        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to get connection from pool: {e}")))
    }

    /// `SET [LOCAL] statement_timeout` statement for the configured timeout
    pub fn statement_timeout_sql(&self, local: bool) -> String {
        format!(
            "SET {}statement_timeout = {}",
            if local { "LOCAL " } else { "" },
            self.config.statement_timeout_seconds * 1000
        )
    }

    /// Execute a query and return rows
    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .batch_execute(&self.statement_timeout_sql(false))
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to set statement timeout: {e}")))?;

        client
            .query(query, params)
            .await
            .map_err(|e| CustodianError::Database(format!("Query failed: {e}")))
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .batch_execute(&self.statement_timeout_sql(false))
            .await
            .map_err(|e| CustodianError::Database(format!("Failed to set statement timeout: {e}")))?;

        client
            .execute(statement, params)
            .await
            .map_err(|e| CustodianError::Database(format!("Statement execution failed: {e}")))
    }

    /// Connection string with credentials removed
    pub fn connection_string_safe(&self) -> String {
        self.config.connection_string.expose_secret().redacted_host()
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn build_manager(
    pg_config: tokio_postgres::Config,
    ssl_mode: &str,
    manager_config: ManagerConfig,
) -> Result<Manager> {
    match ssl_mode {
        "require" | "verify-ca" | "verify-full" => {
            let mut builder = native_tls::TlsConnector::builder();
            match ssl_mode {
                // Encryption only, like libpq's `require`
                "require" => {
                    builder.danger_accept_invalid_certs(true);
                }
                "verify-ca" => {
                    builder.danger_accept_invalid_hostnames(true);
                }
                _ => {}
            }
            let connector = builder
                .build()
                .map_err(|e| CustodianError::Configuration(format!("Failed to build TLS connector: {e}")))?;
            Ok(Manager::from_config(
                pg_config,
                MakeTlsConnector::new(connector),
                manager_config,
            ))
        }
        _ => Ok(Manager::from_config(pg_config, NoTls, manager_config)),
    }
}
