//! # Sync Configuration
//!
//! Configuration management for the reconciliation service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. CLI flags (highest priority, applied by the daemon)                │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     MARIANATEK_API_TOKEN=...   WEBFLOW_API_TOKEN=...                   │
//! │     WEBFLOW_COLLECTION_ID=...  MARIANATEK_DEFAULT_LOCATION_ID=...      │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/stocklink/stocklink.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stocklink.stocklink/... (macOS)  │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [marianatek]
//! base_url = "https://acme.marianatek.com"
//! api_token = "..."
//! default_location_id = "48"
//!
//! [webflow]
//! api_token = "..."
//! collection_id = "64f0c0ffee"
//!
//! [sync]
//! interval_secs = 300
//! throttle_secs = 60
//! max_retries = 3
//!
//! [paths]
//! mapping_file = "mapping.json"
//! state_file = "sync-state.json"
//! event_log_file = "sync-events.jsonl"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::retry::RetryPolicy;

// =============================================================================
// Secrets
// =============================================================================

/// A credential that never appears in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "Secret(<unset>)")
        } else {
            write!(f, "Secret(***)")
        }
    }
}

// =============================================================================
// Mariana Tek Settings
// =============================================================================

/// Connection settings for Mariana Tek (side A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarianaTekSettings {
    /// Tenant base URL, e.g. `https://acme.marianatek.com`.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_token: Secret,

    /// Location adjusted by the sale pass when a mapping pins none.
    #[serde(default)]
    pub default_location_id: String,

    #[serde(default = "default_marianatek_page_size")]
    pub page_size: u32,
}

fn default_marianatek_page_size() -> u32 {
    50
}

impl Default for MarianaTekSettings {
    fn default() -> Self {
        MarianaTekSettings {
            base_url: String::new(),
            api_token: Secret::default(),
            default_location_id: String::new(),
            page_size: default_marianatek_page_size(),
        }
    }
}

// =============================================================================
// Webflow Settings
// =============================================================================

/// Connection settings for Webflow (side B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebflowSettings {
    #[serde(default = "default_webflow_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_token: Secret,

    /// CMS collection holding the product SKUs.
    #[serde(default)]
    pub collection_id: String,

    #[serde(default = "default_webflow_page_size")]
    pub page_size: u32,
}

fn default_webflow_base_url() -> String {
    "https://api.webflow.com/v2".to_string()
}

fn default_webflow_page_size() -> u32 {
    100
}

impl Default for WebflowSettings {
    fn default() -> Self {
        WebflowSettings {
            base_url: default_webflow_base_url(),
            api_token: Secret::default(),
            collection_id: String::new(),
            page_size: default_webflow_page_size(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Cycle timing, pacing and retry behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between cycle starts (seconds). Cycles never overlap.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Minimum time between two attempts on the same pair (seconds).
    #[serde(default = "default_throttle")]
    pub throttle_secs: u64,

    /// Pause after each processed entity (milliseconds).
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Pause between paginated page fetches (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Retries after the first attempt for 429/500 responses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay used when the server sends no Retry-After (milliseconds).
    #[serde(default = "default_retry_delay")]
    pub default_retry_delay_ms: u64,

    /// HTTP request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Advisory ceiling on concurrent remote calls. Entities are always
    /// processed one at a time; values above 1 are accepted but unused.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Compute and record decisions without calling mutating endpoints.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_interval() -> u64 {
    300
}
fn default_throttle() -> u64 {
    60
}
fn default_request_delay() -> u64 {
    250
}
fn default_page_delay() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_concurrency() -> usize {
    1
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_interval(),
            throttle_secs: default_throttle(),
            request_delay_ms: default_request_delay(),
            page_delay_ms: default_page_delay(),
            max_retries: default_max_retries(),
            default_retry_delay_ms: default_retry_delay(),
            request_timeout_secs: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
            dry_run: false,
        }
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Files read and written by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_mapping_file")]
    pub mapping_file: PathBuf,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_event_log_file")]
    pub event_log_file: PathBuf,
}

fn default_mapping_file() -> PathBuf {
    PathBuf::from("mapping.json")
}
fn default_state_file() -> PathBuf {
    PathBuf::from("sync-state.json")
}
fn default_event_log_file() -> PathBuf {
    PathBuf::from("sync-events.jsonl")
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            mapping_file: default_mapping_file(),
            state_file: default_state_file(),
            event_log_file: default_event_log_file(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub marianatek: MarianaTekSettings,

    #[serde(default)]
    pub webflow: WebflowSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub paths: PathSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stocklink.toml)
    /// 3. Environment variables
    ///
    /// Validation runs last, so a missing credential fails here, before any
    /// client is built.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        let explicit = config_path.is_some();
        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else if explicit {
                return Err(SyncError::ConfigLoadFailed(format!(
                    "config file not found: {}",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.marianatek.api_token.is_empty() {
            return Err(SyncError::MissingCredential("marianatek.api_token"));
        }
        if self.webflow.api_token.is_empty() {
            return Err(SyncError::MissingCredential("webflow.api_token"));
        }
        if self.webflow.collection_id.trim().is_empty() {
            return Err(SyncError::MissingCredential("webflow.collection_id"));
        }
        if self.marianatek.default_location_id.trim().is_empty() {
            return Err(SyncError::MissingCredential("marianatek.default_location_id"));
        }
        if self.marianatek.base_url.trim().is_empty() {
            return Err(SyncError::MissingCredential("marianatek.base_url"));
        }

        for url in [&self.marianatek.base_url, &self.webflow.base_url] {
            let parsed = url::Url::parse(url)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SyncError::InvalidUrl(format!(
                    "URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.marianatek.page_size == 0 || self.webflow.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }
        if self.sync.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }
        if self.sync.max_concurrency > 1 {
            warn!(
                max_concurrency = self.sync.max_concurrency,
                "max_concurrency is advisory; entities are processed sequentially"
            );
        }

        Ok(())
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MARIANATEK_BASE_URL") {
            debug!(url = %url, "Overriding Mariana Tek URL from environment");
            self.marianatek.base_url = url;
        }
        if let Some(token) = lookup("MARIANATEK_API_TOKEN") {
            self.marianatek.api_token = Secret::new(token);
        }
        if let Some(location) = lookup("MARIANATEK_DEFAULT_LOCATION_ID") {
            self.marianatek.default_location_id = location;
        }

        if let Some(url) = lookup("WEBFLOW_BASE_URL") {
            debug!(url = %url, "Overriding Webflow URL from environment");
            self.webflow.base_url = url;
        }
        if let Some(token) = lookup("WEBFLOW_API_TOKEN") {
            self.webflow.api_token = Secret::new(token);
        }
        if let Some(collection) = lookup("WEBFLOW_COLLECTION_ID") {
            self.webflow.collection_id = collection;
        }

        if let Some(secs) = lookup("STOCKLINK_INTERVAL_SECS") {
            match secs.parse() {
                Ok(v) => self.sync.interval_secs = v,
                Err(_) => warn!(value = %secs, "Ignoring invalid STOCKLINK_INTERVAL_SECS"),
            }
        }
        if let Some(secs) = lookup("STOCKLINK_THROTTLE_SECS") {
            match secs.parse() {
                Ok(v) => self.sync.throttle_secs = v,
                Err(_) => warn!(value = %secs, "Ignoring invalid STOCKLINK_THROTTLE_SECS"),
            }
        }
        if let Some(flag) = lookup("STOCKLINK_DRY_RUN") {
            self.sync.dry_run = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(path) = lookup("STOCKLINK_MAPPING_FILE") {
            self.paths.mapping_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("STOCKLINK_STATE_FILE") {
            self.paths.state_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("STOCKLINK_EVENT_LOG") {
            self.paths.event_log_file = PathBuf::from(path);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stocklink", "stocklink")
            .map(|dirs| dirs.config_dir().join("stocklink.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.sync.throttle_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.sync.request_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.sync.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.sync.max_retries,
            Duration::from_millis(self.sync.default_retry_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete_config() -> SyncConfig {
        let mut config = SyncConfig::default();
        config.marianatek.base_url = "https://acme.marianatek.com".into();
        config.marianatek.api_token = Secret::new("mt-token");
        config.marianatek.default_location_id = "48".into();
        config.webflow.api_token = Secret::new("wf-token");
        config.webflow.collection_id = "col-1".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.default_retry_delay_ms, 1000);
        assert_eq!(config.webflow.base_url, "https://api.webflow.com/v2");
        assert!(!config.sync.dry_run);
    }

    #[test]
    fn test_missing_credentials_fail_validation() {
        assert!(complete_config().validate().is_ok());

        let mut config = complete_config();
        config.marianatek.api_token = Secret::default();
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingCredential("marianatek.api_token"))
        ));

        let mut config = complete_config();
        config.webflow.api_token = Secret::new("   ");
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingCredential("webflow.api_token"))
        ));

        let mut config = complete_config();
        config.webflow.collection_id.clear();
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingCredential("webflow.collection_id"))
        ));

        let mut config = complete_config();
        config.marianatek.default_location_id.clear();
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingCredential("marianatek.default_location_id"))
        ));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut config = complete_config();
        config.marianatek.base_url = "ftp://acme".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        let mut config = complete_config();
        config.webflow.page_size = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("MARIANATEK_API_TOKEN", "from-env"),
            ("WEBFLOW_COLLECTION_ID", "col-env"),
            ("STOCKLINK_THROTTLE_SECS", "5"),
            ("STOCKLINK_INTERVAL_SECS", "not-a-number"),
            ("STOCKLINK_DRY_RUN", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.marianatek.api_token.expose(), "from-env");
        assert_eq!(config.webflow.collection_id, "col-env");
        assert_eq!(config.throttle_window(), Duration::from_secs(5));
        assert_eq!(config.sync.interval_secs, 300);
        assert!(config.sync.dry_run);
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = complete_config();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("mt-token"));
        assert!(!debug.contains("wf-token"));
    }

    #[test]
    fn test_toml_parsing() {
        let config: SyncConfig = toml::from_str(
            r#"
            [marianatek]
            base_url = "https://acme.marianatek.com"
            api_token = "abc"
            default_location_id = "48"

            [webflow]
            api_token = "def"
            collection_id = "col"

            [sync]
            throttle_secs = 120
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.sync.throttle_secs, 120);
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.paths.state_file, PathBuf::from("sync-state.json"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocklink.toml");
        std::fs::write(
            &path,
            r#"
            [marianatek]
            base_url = "https://acme.marianatek.com"
            api_token = "abc"
            default_location_id = "48"

            [webflow]
            api_token = "def"
            collection_id = "col"
            "#,
        )
        .unwrap();

        let config = SyncConfig::load(Some(path)).unwrap();
        assert!(!config.webflow.collection_id.is_empty());

        let missing = SyncConfig::load(Some(dir.path().join("absent.toml")));
        assert!(matches!(missing, Err(SyncError::ConfigLoadFailed(_))));
    }
}
