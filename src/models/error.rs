//! Error types for matchfetch.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (bad input, malformed payloads)
//! - I^B materialized: Infrastructure failures (network, status, disk)
//! - K_i violated: Internal invariant violations (bugs)

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for matchfetch.
#[derive(Debug, Error)]
pub enum MatchFetchError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Rate limited by {endpoint}: retry after {retry_after_secs}s")]
    RateLimited {
        endpoint: String,
        retry_after_secs: f64,
    },

    #[error("Checkpoint persistence failed while {context}")]
    Persistence {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Export failed while {context}: {message}")]
    Export { context: String, message: String },

    #[error("Run cancelled")]
    Cancelled,

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatchFetchError {
    /// Create a persistence error with context.
    pub fn persistence(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Persistence {
            context: context.into(),
            source,
        }
    }

    /// Create a decode error for an endpoint.
    pub fn decode(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Create an export error with context.
    pub fn export(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Export {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether the failing step could not record its progress.
    ///
    /// Remote failures leave the checkpoint untouched; these do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Persistence { .. } | Self::Config(_) | Self::InvalidInput(_) | Self::Internal(_)
        )
    }

    /// Get retry delay hint in seconds, if applicable.
    pub fn retry_after(&self) -> Option<f64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

/// Result type alias for matchfetch.
pub type Result<T> = std::result::Result<T, MatchFetchError>;
