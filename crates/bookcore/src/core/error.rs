use thiserror::Error;

use crate::payments::webhook::SignatureError;

/// Centralized error types for the application
///
/// Collaborator failures (database, Stripe, Telegram) are all converted to this
/// enum so that the conversation engine can treat them uniformly: log, tell the
/// user something short, keep the state for a retry.
///
/// # Example
///
/// ```no_run
/// use bookcore::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(String),

    /// Telegram API errors
    #[cfg(feature = "telegram")]
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP transport errors (Stripe API)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-success status
    #[error("Stripe error ({status}): {message}")]
    Stripe { status: u16, message: String },

    /// Webhook signature could not be verified
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Malformed payloads (webhook JSON, Stripe responses)
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the error comes from bad input rather than a broken collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Signature(_) | AppError::Payload(_)
        )
    }
}
