//! Form checks run by the auth screens before any network call.
//!
//! Failures carry the exact message shown to the user and never touch
//! state. Emails and display names are trimmed on success; passwords are
//! passed through untouched.

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter your email and password.")]
    MissingCredentials,
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("Please enter your email address.")]
    MissingEmail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// Login screen.
///
/// # Errors
///
/// [`ValidationError::MissingCredentials`] when either field is empty.
pub fn validate_login(email: &str, password: &str) -> Result<Credentials, ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(Credentials { email: email.trim().to_owned(), password: password.to_owned() })
}

/// Sign-up screen. Checks run in order: empty fields, mismatch, length.
///
/// # Errors
///
/// The first failing check.
pub fn validate_sign_up(
    display_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<SignUpForm, ValidationError> {
    if display_name.is_empty() || email.is_empty() || password.is_empty() || confirm_password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(SignUpForm {
        display_name: display_name.trim().to_owned(),
        email: email.trim().to_owned(),
        password: password.to_owned(),
    })
}

/// Forgot-password screen. Returns the trimmed email.
///
/// # Errors
///
/// [`ValidationError::MissingEmail`] when the field is empty.
pub fn validate_reset(email: &str) -> Result<String, ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    Ok(email.trim().to_owned())
}
