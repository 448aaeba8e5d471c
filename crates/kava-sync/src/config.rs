//! # Sync Configuration
//!
//! Configuration for the relay, the transport and the two remote stores.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KAVA_RELAY_URL=ws://relay.local:3001/ws                            │
//! │     KAVA_MACHINE_STORE_URL=https://script.google.com/...               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kava/kava.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.kava.machine/kava.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     No relay URL, no store URLs - pure local operation                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An absent store URL is not an error: it disables the reconciliation path
//! for that tier and the manager operates purely on local state.
//!
//! ## Configuration File Format
//! ```toml
//! # kava.toml
//! [relay]
//! url = "ws://relay.local:3001/ws"
//! port = 3001
//! bind_addr = "0.0.0.0"
//!
//! [machine_store]
//! url = "https://script.google.com/macros/s/AAA/exec"
//! request_timeout_secs = 10
//!
//! [warehouse_store]
//! url = "https://script.google.com/macros/s/BBB/exec"
//!
//! [transport]
//! connect_timeout_secs = 10
//! initial_backoff_ms = 500
//! max_backoff_secs = 60
//! max_retries = 0  # infinite
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::relay::{RelayConfig, DEFAULT_RELAY_PORT};
use crate::store::HttpLedgerStore;
use crate::transport::TransportConfig;

// =============================================================================
// Relay Settings
// =============================================================================

/// Relay connection and hosting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// WebSocket URL of the relay, from a party's point of view.
    /// Absent means the party runs without real-time updates.
    #[serde(default)]
    pub url: Option<String>,

    /// Port for a locally hosted relay server.
    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// Bind address for a locally hosted relay server.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_relay_port() -> u16 {
    DEFAULT_RELAY_PORT
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            url: None,
            port: default_relay_port(),
            bind_addr: default_bind_addr(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Settings for one tier's remote ledger store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// HTTP endpoint of the spreadsheet-backed store.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl StoreSettings {
    /// Builds the HTTP client for this tier, or `None` when unconfigured.
    pub fn client(&self) -> SyncResult<Option<HttpLedgerStore>> {
        match &self.url {
            Some(url) => Ok(Some(HttpLedgerStore::new(
                url,
                Duration::from_secs(self.request_timeout_secs),
            )?)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Transport Settings
// =============================================================================

/// Reconnection behavior of the relay client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Initial backoff duration (milliseconds) for reconnection.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds) for reconnection.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Maximum reconnection attempts before giving up.
    /// Set to 0 for infinite retries.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Keepalive ping interval (seconds).
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    0 // Infinite
}
fn default_ping_interval() -> u64 {
    30
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            connect_timeout_secs: default_connect_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_retries: default_max_retries(),
            ping_interval_secs: default_ping_interval(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KavaConfig {
    /// Relay settings (URL for parties, port/bind for the server).
    #[serde(default)]
    pub relay: RelaySettings,

    /// Client-machine tier store.
    #[serde(default)]
    pub machine_store: StoreSettings,

    /// Warehouse tier store.
    #[serde(default)]
    pub warehouse_store: StoreSettings,

    /// Relay client reconnection behavior.
    #[serde(default)]
    pub transport: TransportSettings,
}

impl KavaConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kava.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        // Try to load from config file
        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        // Override with environment variables
        config.apply_env_overrides();

        // Validate the configuration
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(ref url) = self.relay.url {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(SyncError::InvalidUrl(format!(
                    "Relay URL must start with ws:// or wss://, got: {}",
                    url
                )));
            }
        }

        for (name, store) in [
            ("machine_store", &self.machine_store),
            ("warehouse_store", &self.warehouse_store),
        ] {
            if let Some(ref url) = store.url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(SyncError::InvalidUrl(format!(
                        "{} URL must start with http:// or https://, got: {}",
                        name, url
                    )));
                }
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("KAVA_RELAY_URL") {
            debug!(url = %url, "Overriding relay URL from environment");
            self.relay.url = Some(url);
        }

        if let Ok(port) = std::env::var("KAVA_RELAY_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding relay port from environment");
                self.relay.port = p;
            }
        }

        if let Ok(url) = std::env::var("KAVA_MACHINE_STORE_URL") {
            self.machine_store.url = Some(url);
        }

        if let Ok(url) = std::env::var("KAVA_WAREHOUSE_STORE_URL") {
            self.warehouse_store.url = Some(url);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kava", "machine").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("kava.toml")
        })
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Transport configuration for a party connecting to the relay.
    ///
    /// Fails with `InvalidConfig` when no relay URL is set.
    pub fn transport_config(&self) -> SyncResult<TransportConfig> {
        let url = self
            .relay
            .url
            .clone()
            .ok_or_else(|| SyncError::InvalidConfig("No relay URL configured".into()))?;
        Ok(TransportConfig {
            url,
            connect_timeout: Duration::from_secs(self.transport.connect_timeout_secs),
            initial_backoff: Duration::from_millis(self.transport.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.transport.max_backoff_secs),
            max_retries: self.transport.max_retries,
            ping_interval: Duration::from_secs(self.transport.ping_interval_secs),
        })
    }

    /// Server configuration for hosting the relay locally.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            port: self.relay.port,
            bind_addr: self.relay.bind_addr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_fully_local() {
        let config = KavaConfig::default();
        assert!(config.relay.url.is_none());
        assert!(config.machine_store.url.is_none());
        assert!(config.warehouse_store.url.is_none());
        assert!(config.validate().is_ok());
        assert!(config.machine_store.client().unwrap().is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = KavaConfig::default();

        // Invalid relay scheme should fail
        config.relay.url = Some("http://relay.local".to_string());
        assert!(config.validate().is_err());

        // Valid WebSocket URL should pass
        config.relay.url = Some("ws://relay.local:3001/ws".to_string());
        assert!(config.validate().is_ok());

        // Store URLs must be http(s)
        config.machine_store.url = Some("ws://bad".to_string());
        assert!(config.validate().is_err());
        config.machine_store.url = Some("https://script.google.com/macros/s/AAA/exec".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transport_config_requires_relay_url() {
        let mut config = KavaConfig::default();
        assert!(config.transport_config().is_err());

        config.relay.url = Some("ws://relay.local:3001/ws".to_string());
        let transport = config.transport_config().unwrap();
        assert_eq!(transport.url, "ws://relay.local:3001/ws");
        assert_eq!(transport.initial_backoff, Duration::from_millis(500));
        assert_eq!(transport.max_backoff, Duration::from_secs(60));
        assert_eq!(transport.max_retries, 0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = KavaConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[relay]"));
        assert!(toml_str.contains("[transport]"));

        let parsed: KavaConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.relay.port, DEFAULT_RELAY_PORT);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: KavaConfig = toml::from_str(
            r#"
            [machine_store]
            url = "https://script.google.com/macros/s/AAA/exec"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.machine_store.request_timeout_secs, 10);
        assert!(parsed.relay.url.is_none());
        assert!(parsed.machine_store.client().unwrap().is_some());
    }
}
