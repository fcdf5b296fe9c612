//! # Sync Error Types
//!
//! Error types for reconciliation operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Remote        │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RateLimited ↻  │  │  MalformedResponse      │ │
//! │  │  MissingCred... │  │  TransientSrv ↻ │  │                         │ │
//! │  │  ConfigLoad...  │  │  Unauthorized   │  │                         │ │
//! │  │                 │  │  NotFound       │  │                         │ │
//! │  │                 │  │  RemoteRejected │  │                         │ │
//! │  │                 │  │  Transport      │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   Persistence   │  │    Internal     │      ↻ = retried by          │
//! │  │                 │  │                 │          RetryPolicy         │
//! │  │  Store          │  │  Internal       │                              │
//! │  │  (state/log/map)│  │  (task failure) │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;
use thiserror::Error;

use stocklink_store::StoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// A required credential or identifier is not set.
    #[error("Missing required setting: {0}")]
    MissingCredential(&'static str),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// HTTP 429.
    #[error("Rate limited by {service}")]
    RateLimited {
        service: &'static str,
        retry_after: Option<Duration>,
    },

    /// HTTP 500.
    #[error("{service} returned a server error")]
    TransientServer {
        service: &'static str,
        retry_after: Option<Duration>,
    },

    /// HTTP 401/403.
    #[error("{service} rejected the credentials (status {status})")]
    Unauthorized { service: &'static str, status: u16 },

    /// HTTP 404.
    #[error("{service} resource not found: {resource}")]
    NotFound {
        service: &'static str,
        resource: String,
    },

    /// Any other non-success status.
    #[error("{service} rejected the request (status {status}): {body}")]
    RemoteRejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Network-level failure (DNS, TLS, connection reset, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Response is missing required pagination or data fields.
    #[error("Malformed response from {service}: {reason}")]
    MalformedResponse {
        service: &'static str,
        reason: String,
    },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// State file, event log or mapping file failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::MalformedResponse {
                service: "remote",
                reason: err.to_string(),
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Creates a MalformedResponse error.
    pub fn malformed(service: &'static str, reason: impl Into<String>) -> Self {
        SyncError::MalformedResponse {
            service,
            reason: reason.into(),
        }
    }

    /// Returns true if the retry wrapper should try again.
    ///
    /// Only rate limiting (429) and server errors (500) qualify. Everything
    /// else is permanent for the purposes of one call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RateLimited { .. } | SyncError::TransientServer { .. }
        )
    }

    /// Server-supplied delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::RateLimited { retry_after, .. }
            | SyncError::TransientServer { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::RateLimited {
            service: "webflow",
            retry_after: None
        }
        .is_retryable());
        assert!(SyncError::TransientServer {
            service: "marianatek",
            retry_after: None
        }
        .is_retryable());

        assert!(!SyncError::Unauthorized {
            service: "webflow",
            status: 401
        }
        .is_retryable());
        assert!(!SyncError::malformed("webflow", "no pagination").is_retryable());
        assert!(!SyncError::Transport("reset".into()).is_retryable());
    }

    #[test]
    fn test_retry_after_extraction() {
        let err = SyncError::RateLimited {
            service: "webflow",
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(SyncError::Transport("reset".into()).retry_after(), None);
    }
}
