//! Unified error system for Ghostline
//!
//! A single error type shared by every crate in the workspace. Variants map
//! one-to-one onto the externally observable failure classes; anything more
//! detailed stays in server-side logs and never rides on an error value
//! across the API boundary.

use serde::{Deserialize, Serialize};

/// Unified error type for all Ghostline operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum GhostError {
    /// Identifier or fingerprint failed grammar validation
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the malformed input
        message: String,
    },

    /// Identifier collision on creation
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the colliding resource
        message: String,
    },

    /// Per-origin action ceiling exceeded
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Generic rate-limit message (never includes remaining counts)
        message: String,
    },

    /// Operation targets an absent or expired record
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found
        message: String,
    },

    /// Transport or network failure reaching the backing store or server
    #[error("Unreachable: {message}")]
    Unreachable {
        /// Description of the transport failure
        message: String,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal failure
        message: String,
    },
}

impl GhostError {
    /// Create an invalid format error
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type alias for Ghostline operations
pub type Result<T> = std::result::Result<T, GhostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_class_and_message() {
        let err = GhostError::conflict("session already exists");
        assert_eq!(err.to_string(), "Conflict: session already exists");
    }

    #[test]
    fn errors_round_trip_through_serde() {
        let err = GhostError::rate_limited("too many requests");
        let json = serde_json::to_string(&err).unwrap();
        let back: GhostError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, GhostError::RateLimited { .. }));
    }
}
