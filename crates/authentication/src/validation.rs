use app_error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Email validation regex
    // This pattern checks for a valid email format with proper domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^([a-z0-9_+]([a-z0-9_+.]*[a-z0-9_+])?)@([a-z0-9]+([\-\.]{1}[a-z0-9]+)*\.[a-z]{2,6})$"
    ).unwrap();

    // Letters, numbers and underscores, 3-30 characters
    static ref USERNAME_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9_]{3,30}$"
    ).unwrap();
}

/// Validates a username
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Username cannot be empty".to_string(),
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(AppError::ValidationError(
            "Username must be 3-30 characters long and can only contain letters, numbers, and underscores".to_string()
        ));
    }

    Ok(())
}

/// Validates an email address
pub fn validate_email(email: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Email cannot be empty".to_string(),
        ));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(AppError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    Ok(())
}

/// Validates password length against the configured minimum.
pub fn validate_password(password: &str, min_length: usize) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::ValidationError(
            "Password cannot be empty".to_string(),
        ));
    }

    if password.len() < min_length {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters long",
            min_length
        )));
    }

    Ok(())
}

/// Sanitizes a string input by trimming whitespace. Passwords are never
/// sanitized; leading and trailing spaces are significant there.
pub fn sanitize_string(input: &str) -> String {
    input.trim().to_string()
}
