//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and an optional
//! JSON rolling file layer.
//!
//! ```no_run
//! use custodian::logging::init_logging;
//! use custodian::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(register_id = 3, "Register pass started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a register pass
///
/// ```no_run
/// use custodian::log_register_start;
///
/// log_register_start!(3, "Contacts", 12);
/// ```
#[macro_export]
macro_rules! log_register_start {
    ($register_id:expr, $name:expr, $retention_months:expr) => {
        tracing::info!(
            register_id = %$register_id,
            register = %$name,
            retention_months = $retention_months,
            "Processing register started"
        );
    };
}

/// Log the completion of a register pass
///
/// ```no_run
/// use custodian::log_register_complete;
/// use std::time::Duration;
///
/// log_register_complete!(3, 42u64, Duration::from_secs(2));
/// ```
#[macro_export]
macro_rules! log_register_complete {
    ($register_id:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            register_id = %$register_id,
            processed = $count,
            duration_ms = $duration.as_millis() as u64,
            "Processing register completed"
        );
    };
}

/// Log an error with context
///
/// ```no_run
/// use custodian::log_error_with_context;
/// use custodian::domain::CustodianError;
///
/// let error = CustodianError::ClassResolution("Ghost".to_string());
/// log_error_with_context!(&error, "Register run failed");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
