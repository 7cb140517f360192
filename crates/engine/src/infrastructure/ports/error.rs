//! Error types for port operations.

use gachadiff_domain::DomainError;

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Outcome of a wallet change applied inside a storage transaction.
///
/// `Rejected` means the wallet rules refused the change and nothing was written.
#[derive(Debug, thiserror::Error)]
pub enum WalletUpdateError {
    #[error(transparent)]
    Rejected(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Failures talking to the image backend.
///
/// Non-2xx HTTP answers are not errors; they come back as a `BackendResponse`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ImageGenError {
    #[error("Backend request failed: {0}")]
    RequestFailed(String),
    #[error("Backend timed out: {0}")]
    Timeout(String),
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Failures delivering a rendered result back to Discord.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PostError {
    #[error("Post request failed: {0}")]
    RequestFailed(String),
    #[error("Post rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_error_names_operation() {
        let err = RepoError::database("claim_daily", "disk I/O error");
        assert_eq!(
            err.to_string(),
            "Database error in claim_daily: disk I/O error"
        );
    }

    #[test]
    fn rejected_wallet_update_shows_the_rule() {
        let err = WalletUpdateError::from(DomainError::insufficient_credits(10, 50));
        assert_eq!(err.to_string(), DomainError::insufficient_credits(10, 50).to_string());
    }
}
