/// Simplifies creating validation errors
///
/// # Example
/// ```ignore
/// validation_error!("username", "Username must be at least 3 characters long")
/// ```
#[macro_export]
macro_rules! validation_error {
    ($field:expr, $message:expr) => {
        Err(app_error::AppError::ValidationError(format!(
            "Validation failed for '{}': {}",
            $field, $message
        )))
    };
}

/// Simplifies creating authentication errors
///
/// # Example
/// ```ignore
/// auth_error!("Invalid username or password")
/// ```
#[macro_export]
macro_rules! auth_error {
    ($message:expr) => {
        Err(app_error::AppError::AuthenticationError(
            $message.to_string(),
        ))
    };
}

/// Simplifies creating conflict errors for duplicate identity fields
///
/// # Example
/// ```ignore
/// conflict_error!("Email is already in use")
/// ```
#[macro_export]
macro_rules! conflict_error {
    ($message:expr) => {
        Err(app_error::AppError::ConflictError($message.to_string()))
    };
}
