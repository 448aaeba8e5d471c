//! # Sync Error Types
//!
//! Error types for relay and remote-store operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  InvalidMessage         │ │
//! │  │  InvalidUrl     │  │  Disconnected   │  │  SerializationFailed    │ │
//! │  └─────────────────┘  │  Timeout        │  └─────────────────────────┘ │
//! │                       └─────────────────┘                              │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐ │
//! │  │     Ledger      │  │            Remote Store                     │ │
//! │  │                 │  │                                             │ │
//! │  │  Core(..)       │  │  HttpError / StoreRejected (call level)     │ │
//! │  │  (precondition  │  │  RemoteSyncFailure (manager level: the      │ │
//! │  │   failures)     │  │   optimistic mutation was rolled back)      │ │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Precondition failures (`Core`) are returned before any mutation; a
//! `RemoteSyncFailure` is returned only after the local ledger has been
//! restored to its pre-operation snapshot.

use thiserror::Error;

use kava_core::CoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering relay, transport and remote-store failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Ledger Errors
    // =========================================================================
    /// A ledger precondition failed - always before mutation.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid relay or store URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to establish WebSocket connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket disconnected unexpectedly.
    #[error("Disconnected from relay")]
    Disconnected,

    /// Connection timeout.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Invalid message received over the relay channel.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Failed to serialize or deserialize a message.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Remote Store Errors
    // =========================================================================
    /// No store URL configured for this tier.
    ///
    /// Not a failure in itself - it disables the reconciliation path and the
    /// manager operates purely on local state. Surfaced only when a caller
    /// explicitly demands remote state.
    #[error("Remote ledger store not configured")]
    RemoteUnconfigured,

    /// Transport-level HTTP failure talking to the store.
    #[error("Store request failed: {0}")]
    HttpError(String),

    /// The store answered, but with `success: false` or no data.
    ///
    /// Treated as a failed call regardless of HTTP status.
    #[error("Store rejected the operation: {0}")]
    StoreRejected(String),

    /// The authoritative store call failed after a local optimistic mutation.
    ///
    /// The local ledger has already been rolled back to its pre-operation
    /// snapshot when this is returned.
    #[error("Remote sync failed during {op}: {message}")]
    RemoteSyncFailure { op: String, message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::HttpError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed => SyncError::Disconnected,
            WsError::AlreadyClosed => SyncError::Disconnected,
            WsError::Protocol(p) => SyncError::WebSocketError(p.to_string()),
            WsError::Io(io) => SyncError::ConnectionFailed(io.to_string()),
            WsError::Tls(tls) => SyncError::TlsError(tls.to_string()),
            other => SyncError::WebSocketError(other.to_string()),
        }
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

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if this error is recoverable and the operation can be retried.
    ///
    /// ## Retryable Errors
    /// - Connection failures (network issues)
    /// - Timeouts
    /// - Temporary disconnections
    /// - Remote sync failures (the rollback already happened; a retry starts
    ///   a fresh optimistic cycle)
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Ledger precondition failures (retrying the same request cannot help)
    /// - Store rejections (the store itself refused the operation)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed(_)
                | SyncError::Disconnected
                | SyncError::Timeout(_)
                | SyncError::WebSocketError(_)
                | SyncError::HttpError(_)
                | SyncError::RemoteSyncFailure { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::RemoteUnconfigured
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("network error".into()).is_retryable());
        assert!(SyncError::Disconnected.is_retryable());
        assert!(SyncError::Timeout(30).is_retryable());
        assert!(SyncError::RemoteSyncFailure {
            op: "consume".into(),
            message: "503".into()
        }
        .is_retryable());

        assert!(!SyncError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!SyncError::Core(CoreError::InsufficientResources).is_retryable());
        assert!(!SyncError::StoreRejected("not enough water".into()).is_retryable());
    }

    #[test]
    fn test_core_error_passes_through() {
        let err: SyncError = CoreError::InsufficientResources.into();
        assert_eq!(err.to_string(), "Insufficient resources to prepare the drink");
    }
}
