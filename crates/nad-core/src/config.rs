use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use super::client::ClientOptions;
use super::discovery::ScanOptions;
use super::platform;
use super::types::{Endpoint, VolumeLimits, DEFAULT_PORT, MAX_VOLUME_DB, MIN_VOLUME_DB};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Receiver address. When unset, the first discovered device is used.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Safety limits. The ceiling differs per model; +10 dB is conservative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_min_db")]
    pub min_db: f64,
    #[serde(default = "default_max_db")]
    pub max_db: f64,
    #[serde(default = "default_step_db")]
    pub step_db: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

/// Credentials for the Spotify Web API. Either an access token, or a refresh
/// token together with the client id and secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_auto_refresh_secs")]
    pub auto_refresh_secs: u64,
    #[serde(default = "default_volume_commit_ms")]
    pub volume_commit_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min_db: default_min_db(),
            max_db: default_max_db(),
            step_db: default_step_db(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_discovery_timeout_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_concurrent_probes: default_max_concurrent_probes(),
            cache_ttl_secs: default_cache_ttl_secs(),
            use_cache: default_use_cache(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            auto_refresh_secs: default_auto_refresh_secs(),
            volume_commit_ms: default_volume_commit_ms(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_read_timeout_ms() -> u64 {
    2000
}

fn default_min_db() -> f64 {
    MIN_VOLUME_DB
}

fn default_max_db() -> f64 {
    MAX_VOLUME_DB
}

fn default_step_db() -> f64 {
    1.0
}

fn default_discovery_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_max_concurrent_probes() -> usize {
    256
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_use_cache() -> bool {
    true
}

fn default_auto_refresh_secs() -> u64 {
    10
}

fn default_volume_commit_ms() -> u64 {
    2000
}

impl Config {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Reject values that would break volume arithmetic later on.
    pub fn validate(&self) -> anyhow::Result<()> {
        let volume = &self.volume;
        if !volume.min_db.is_finite() || !volume.max_db.is_finite() {
            anyhow::bail!(
                "[volume] min_db and max_db must be finite (got {} and {})",
                volume.min_db,
                volume.max_db
            );
        }
        if volume.min_db > volume.max_db {
            anyhow::bail!(
                "[volume] min_db {} is above max_db {}",
                volume.min_db,
                volume.max_db
            );
        }
        if !volume.step_db.is_finite() || volume.step_db <= 0.0 {
            anyhow::bail!("[volume] step_db must be positive (got {})", volume.step_db);
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_file()
    }

    /// Apply `NAD_IP`, `NAD_PORT` and `NAD_DEBUG` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ip) = lookup("NAD_IP").filter(|v| !v.trim().is_empty()) {
            self.device.address = Some(ip.trim().to_string());
        }
        if let Some(port) = lookup("NAD_PORT") {
            match port.trim().parse() {
                Ok(p) => self.device.port = p,
                Err(_) => warn!("Ignoring invalid NAD_PORT {:?}", port),
            }
        }
        if let Some(debug) = lookup("NAD_DEBUG") {
            self.logging.debug = matches!(
                debug.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// The configured receiver, if an address is set.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.device
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| Endpoint::new(a, self.device.port))
    }

    pub fn volume_limits(&self) -> VolumeLimits {
        VolumeLimits {
            min_db: self.volume.min_db,
            max_db: self.volume.max_db,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_millis(self.device.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.device.read_timeout_ms),
            volume_limits: self.volume_limits(),
            volume_step: self.volume.step_db,
        }
    }

    /// Scan of the local subnets on the configured port.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            port: self.device.port,
            probe_timeout: Duration::from_millis(self.discovery.probe_timeout_ms),
            max_concurrent: self.discovery.max_concurrent_probes,
            deadline: Duration::from_secs(self.discovery.timeout_secs),
            ..ScanOptions::default()
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.discovery.cache_ttl_secs)
    }
}
