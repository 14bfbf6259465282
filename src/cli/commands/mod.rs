//! CLI command implementations
//!
//! Commands return a process exit code: 0 success, 2 configuration error,
//! 4 connection error, 5 fatal error.

pub mod init;
pub mod run;
pub mod status;
pub mod validate;
