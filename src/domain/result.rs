//! Result type alias for Custodian

use super::errors::CustodianError;

/// Result type alias for Custodian operations
///
/// # Examples
///
/// ```
/// use custodian::domain::result::Result;
/// use custodian::domain::errors::CustodianError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CustodianError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CustodianError>;
