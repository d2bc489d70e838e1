//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including path validation failures and invalid state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid device path format or content
    #[error("Invalid device path: {0}")]
    InvalidPath(String),

    /// Invalid content digest format (expected 64 lowercase hex chars)
    #[error("Invalid digest format: {0}")]
    InvalidDigest(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
