//! On-disk discovery cache.
//!
//! One JSON document, replaced as a whole on every save.  Two shapes are
//! accepted on read (with and without the `discovery` wrapper); only the
//! wrapped shape is written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::discovery::DiscoveredDevice;
use crate::error::{NadError, Result};
use crate::platform;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub devices: Vec<DiscoveredDevice>,
    pub timestamp: DateTime<Utc>,
    /// Time-to-live in nanoseconds.
    pub ttl: u64,
}

impl CacheRecord {
    pub fn new(devices: Vec<DiscoveredDevice>, captured_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            devices,
            timestamp: captured_at,
            ttl: u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_nanos(self.ttl)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// Fresh when non-empty and no older than its own ttl.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.devices.is_empty() && self.age(now) <= self.ttl()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CacheFile {
    Wrapped { discovery: CacheRecord },
    Legacy(CacheRecord),
}

impl CacheFile {
    fn into_record(self) -> CacheRecord {
        match self {
            CacheFile::Wrapped { discovery } => discovery,
            CacheFile::Legacy(record) => record,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryCache {
    path: PathBuf,
}

impl DiscoveryCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache at `~/.nadctl_cache.json`.
    pub fn at_default_location() -> Self {
        Self::new(platform::cache_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw record, or `None` when the file is absent or unreadable JSON.
    pub fn read_record(&self) -> Result<Option<CacheRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(NadError::CacheIo(format!(
                    "read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        match serde_json::from_str::<CacheFile>(&content) {
            Ok(file) => Ok(Some(file.into_record())),
            Err(e) => {
                warn!("Ignoring malformed cache {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    /// Cached devices plus a freshness flag. A stale record yields no devices.
    pub fn load(&self) -> Result<(Vec<DiscoveredDevice>, bool)> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<(Vec<DiscoveredDevice>, bool)> {
        match self.read_record()? {
            Some(record) if record.is_fresh(now) => {
                debug!(
                    "Cache hit: {} device(s), age {:?}",
                    record.devices.len(),
                    record.age(now)
                );
                Ok((record.devices, true))
            }
            Some(_) => {
                debug!("Cache at {} is stale", self.path.display());
                Ok((Vec::new(), false))
            }
            None => Ok((Vec::new(), false)),
        }
    }

    pub fn save(&self, devices: &[DiscoveredDevice], ttl: Duration) -> Result<()> {
        self.save_at(devices, ttl, Utc::now())
    }

    pub fn save_at(
        &self,
        devices: &[DiscoveredDevice],
        ttl: Duration,
        captured_at: DateTime<Utc>,
    ) -> Result<()> {
        let file = CacheFile::Wrapped {
            discovery: CacheRecord::new(devices.to_vec(), captured_at, ttl),
        };
        let content = serde_json::to_string_pretty(&file)?;
        let io_err = |e: std::io::Error| {
            NadError::CacheIo(format!("write {}: {}", self.path.display(), e))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("Saved {} device(s) to {}", devices.len(), self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NadError::CacheIo(format!(
                "remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.read_record(), Ok(Some(record)) if record.is_fresh(Utc::now()))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
