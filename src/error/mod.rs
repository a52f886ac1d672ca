//! Error types and handling for the UniRisk scoring engine.
//!
//! Errors carry a category so callers can decide between surfacing, alerting,
//! and retrying without matching on individual variants.

use thiserror::Error;

/// Result type alias for UniRisk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Database and storage errors
    Storage,
    /// Configuration and setup errors
    Configuration,
    /// User input validation errors
    Validation,
    /// External intelligence collaborator errors
    Intelligence,
    /// Internal system errors
    Internal,
}

impl ErrorCategory {
    /// Get the recommended retry strategy for this category
    pub fn retry_strategy(&self) -> RetryStrategy {
        match self {
            Self::Storage => RetryStrategy::ExponentialBackoff { max_retries: 2 },
            Self::Intelligence => RetryStrategy::LinearBackoff { max_retries: 3 },
            Self::Validation | Self::Configuration => RetryStrategy::NoRetry,
            Self::Internal => RetryStrategy::NoRetry,
        }
    }
}

/// Retry strategies for error recovery
#[derive(Debug, Clone, Copy)]
pub enum RetryStrategy {
    NoRetry,
    LinearBackoff { max_retries: u32 },
    ExponentialBackoff { max_retries: u32 },
}

/// UniRisk error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Invalid weight configuration: {0}")]
    InvalidWeightConfiguration(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Intelligence provider error: {0}")]
    Intelligence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl Error {
    /// Get the error category for monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage(_) | Self::Sqlite(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::InvalidWeightConfiguration(_) | Self::Config(_) => ErrorCategory::Configuration,
            Self::EntityNotFound(_) | Self::Validation(_) => ErrorCategory::Validation,
            Self::Intelligence(_) => ErrorCategory::Intelligence,
            Self::Serialization(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Get the recommended retry strategy
    pub fn retry_strategy(&self) -> RetryStrategy {
        self.category().retry_strategy()
    }

    /// Check if this error is retryable.
    ///
    /// A storage failure during the atomic commit is retryable because
    /// extraction and aggregation are pure functions of their inputs; a missing
    /// entity or a bad weight table is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.retry_strategy(), RetryStrategy::NoRetry)
    }

    /// Create a storage error from a backend-specific message
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }
}
