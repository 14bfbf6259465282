//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CustodianConfig, NotificationTarget};
use crate::config::secret_string;
use crate::domain::errors::CustodianError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CustodianConfig
/// 4. Applies environment variable overrides (CUSTODIAN_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, a referenced variable is
/// missing, TOML parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use custodian::config::loader::load_config;
///
/// let config = load_config("custodian.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CustodianConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CustodianError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CustodianError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text; same pipeline as [`load_config`] minus the file read
pub fn parse_config(contents: &str) -> Result<CustodianConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: CustodianConfig = toml::from_str(&contents)
        .map_err(|e| CustodianError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        CustodianError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| CustodianError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(CustodianError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CustodianError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using the CUSTODIAN_* prefix
///
/// Environment variables follow the pattern `CUSTODIAN_<SECTION>_<KEY>`,
/// for example `CUSTODIAN_PROCESSING_FLUSH_INTERVAL`.
fn apply_env_overrides(config: &mut CustodianConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    // Application overrides
    if let Some(val) = var("CUSTODIAN_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = var("CUSTODIAN_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_env("CUSTODIAN_APPLICATION_DRY_RUN", &val)?;
    }
    if let Some(val) = var("CUSTODIAN_APPLICATION_LOCALE") {
        config.application.locale = val;
    }
    if let Some(val) = var("CUSTODIAN_APPLICATION_RUN_AS") {
        config.application.run_as = val;
    }

    // PostgreSQL overrides
    if let Some(val) = var("CUSTODIAN_POSTGRESQL_CONNECTION_STRING") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Some(val) = var("CUSTODIAN_POSTGRESQL_MAX_CONNECTIONS") {
        config.postgresql.max_connections =
            parse_env("CUSTODIAN_POSTGRESQL_MAX_CONNECTIONS", &val)?;
    }
    if let Some(val) = var("CUSTODIAN_POSTGRESQL_SSL_MODE") {
        config.postgresql.ssl_mode = val;
    }

    // Processing overrides
    if let Some(val) = var("CUSTODIAN_PROCESSING_FLUSH_INTERVAL") {
        config.processing.flush_interval =
            parse_env("CUSTODIAN_PROCESSING_FLUSH_INTERVAL", &val)?;
    }
    if let Some(val) = var("CUSTODIAN_PROCESSING_REGISTER_IDS") {
        config.processing.register_ids = val
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_env("CUSTODIAN_PROCESSING_REGISTER_IDS", s))
            .collect::<Result<Vec<i64>>>()?;
    }
    if let Some(val) = var("CUSTODIAN_PROCESSING_MASKING_SEED") {
        config.processing.masking_seed =
            Some(parse_env("CUSTODIAN_PROCESSING_MASKING_SEED", &val)?);
    }
    if let Some(val) = var("CUSTODIAN_PROCESSING_AUDIT_ENABLED") {
        config.processing.audit.enabled = parse_env("CUSTODIAN_PROCESSING_AUDIT_ENABLED", &val)?;
    }
    if let Some(val) = var("CUSTODIAN_PROCESSING_AUDIT_LOG_PATH") {
        config.processing.audit.log_path = PathBuf::from(val);
    }

    // Notification overrides
    if let Some(val) = var("CUSTODIAN_NOTIFICATIONS_TARGET") {
        config.notifications.target = match val.to_lowercase().as_str() {
            "log" => NotificationTarget::Log,
            "database" => NotificationTarget::Database,
            _ => {
                return Err(CustodianError::Configuration(format!(
                    "Invalid CUSTODIAN_NOTIFICATIONS_TARGET '{val}'. Must be one of: log, database"
                )))
            }
        };
    }

    // Logging overrides
    if let Some(val) = var("CUSTODIAN_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("CUSTODIAN_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("CUSTODIAN_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
