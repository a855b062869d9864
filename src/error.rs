// Bootstrap error types
use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::CredentialsError;

/// Errors raised while talking to the identity backend or the profile store.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Provider error codes that mean the caller presented bad credentials.
const AUTHENTICATION_CODES: &[&str] = &[
    "INVALID_PASSWORD",
    "EMAIL_NOT_FOUND",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
    "TOO_MANY_ATTEMPTS_TRY_LATER",
    "MISSING_PASSWORD",
];

impl BootstrapError {
    /// Classify an error body returned by the identity provider.
    ///
    /// Provider messages look like `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`; the part
    /// before ` : ` is the machine code.
    pub fn from_provider(status: u16, message: impl Into<String>, subject: &str) -> Self {
        let message = message.into();
        let code = provider_code(&message);

        match code {
            "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => BootstrapError::UserAlreadyExists(subject.to_string()),
            "USER_NOT_FOUND" => BootstrapError::UserNotFound(subject.to_string()),
            c if AUTHENTICATION_CODES.contains(&c) => BootstrapError::AuthenticationFailure(message),
            _ => BootstrapError::Backend { status, message },
        }
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        BootstrapError::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        BootstrapError::InvalidToken(message.into())
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, BootstrapError::UserAlreadyExists(_))
    }
}

/// Machine-readable prefix of a provider error message.
pub fn provider_code(message: &str) -> &str {
    message.split(" : ").next().unwrap_or(message).trim()
}
