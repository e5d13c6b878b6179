//! Error handling for the Daily Jam worker
//!
//! This module provides a unified error type hierarchy using thiserror
//! for background job processing. Errors carry enough information to decide
//! whether a failure is confined to one user or fatal to the whole run.

use thiserror::Error;

use dailyjam_shared_config::ConfigError;

/// Main worker error type
#[derive(Error, Debug)]
pub enum WorkerError {
    // ========== Job Processing Errors ==========
    /// A row read from the store violates a domain invariant
    #[error("malformed {entity} {id}: {reason}")]
    InvalidRecord {
        entity: &'static str,
        id: i64,
        reason: String,
    },

    /// Another run of the same job holds the run lock
    #[error("job '{0}' is already running")]
    AlreadyRunning(&'static str),

    // ========== Database Errors ==========
    /// Database query failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database transaction could not be started, committed or rolled back
    #[error("database transaction failed: {0}")]
    Transaction(String),

    // ========== Configuration Errors ==========
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    // ========== Internal Errors ==========
    /// Internal worker error (catch-all for unexpected errors)
    #[error("internal worker error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Transaction(_) | Self::AlreadyRunning(_)
        )
    }

    /// Get a severity level for logging
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Critical errors that should alert operators
            Self::Configuration(_) => ErrorSeverity::Critical,

            // Errors that indicate service issues
            Self::Database(_) | Self::Transaction(_) | Self::Internal(_) => ErrorSeverity::Error,

            // Warnings for expected failures
            Self::InvalidRecord { .. } => ErrorSeverity::Warning,

            // Info level for normal processing issues
            Self::AlreadyRunning(_) => ErrorSeverity::Info,
        }
    }

    /// Log the error with appropriate severity
    pub fn log(&self, context: &str) {
        match self.severity() {
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Critical worker error"
                );
            }
            ErrorSeverity::Error => {
                tracing::error!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Worker error"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Worker warning"
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error = %self,
                    context = context,
                    retryable = self.is_retryable(),
                    "Worker info"
                );
            }
        }
    }

    /// Create a malformed record error
    pub fn invalid_record(entity: &'static str, id: i64, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            entity,
            id,
            reason: reason.into(),
        }
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that should trigger alerts
    Critical,
    /// Standard errors
    Error,
    /// Warnings for expected failures
    Warning,
    /// Informational messages
    Info,
}

/// Result type alias for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

// ========== Conversion Implementations ==========

impl From<ConfigError> for WorkerError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
