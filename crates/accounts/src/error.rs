//! Error types for account operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} is already taken")]
    Conflict(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Failure creating a user: either refused or the database broke
#[derive(Error, Debug)]
pub enum CreateUserError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AccountError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AccountError::Validation {
            field,
            message: message.into(),
        }
    }
}
