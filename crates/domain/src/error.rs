//! Unified error types for the domain layer
//!
//! Provides a common error type that can be used across all domain operations,
//! enabling consistent error handling without forcing adapters to use String or anyhow.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Job type tag did not match any known job kind
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    /// Wallet cannot cover a purchase
    #[error("Not enough credits: have {have}, need {need}")]
    InsufficientCredits { have: i64, need: i64 },

    /// Daily reward was already taken for the current reset window
    #[error("Daily reward already claimed, next reset at {next_reset}")]
    DailyAlreadyClaimed { next_reset: DateTime<Utc> },
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// # Example
    /// ```ignore
    /// if prompt.trim().is_empty() {
    ///     return Err(DomainError::validation("Prompt cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create an insufficient credits error
    pub fn insufficient_credits(have: i64, need: i64) -> Self {
        Self::InsufficientCredits { have, need }
    }
}
