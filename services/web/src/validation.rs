//! Input validation utilities
//!
//! Forms are checked before anything is forwarded to the backend. Messages are
//! collected per field into the fixed-shape error records shared with the
//! backend client, so a form can never report an error for a field it does
//! not have.

use common::models::{
    RegisterFieldErrors, RegisterRequest, ResetPasswordFieldErrors, ResetPasswordRequest,
};
use regex::Regex;
use std::sync::OnceLock;

/// Summary shown above a form with field errors
pub const CHECK_INPUT_MESSAGE: &str = "Please check your input";

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Please enter your name".to_string());
    }

    if name.chars().count() > 50 {
        return Err("Name must be at most 50 characters long".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Please enter your email address".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Please enter a valid email address".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Please enter a password".to_string());
    }

    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

/// Validate password confirmation
pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if confirmation.is_empty() {
        return Err("Please confirm your password".to_string());
    }

    if confirmation != password {
        return Err("Passwords do not match".to_string());
    }

    Ok(())
}

fn messages(result: Result<(), String>) -> Option<Vec<String>> {
    result.err().map(|message| vec![message])
}

/// Check every field of the registration form
pub fn validate_registration(form: &RegisterRequest) -> RegisterFieldErrors {
    RegisterFieldErrors {
        name: messages(validate_name(&form.name)),
        email: messages(validate_email(&form.email)),
        password: messages(validate_password(&form.password)),
        password_confirmation: messages(validate_password_confirmation(
            &form.password,
            &form.password_confirmation,
        )),
    }
}

/// Check the new password of a reset form
pub fn validate_password_reset(form: &ResetPasswordRequest) -> ResetPasswordFieldErrors {
    ResetPasswordFieldErrors {
        password: messages(validate_password(&form.password)),
        password_confirmation: messages(validate_password_confirmation(
            &form.password,
            &form.password_confirmation,
        )),
    }
}
