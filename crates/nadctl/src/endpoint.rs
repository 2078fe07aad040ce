//! Picks the receiver a one-shot command talks to.

use nad_core::{discover, Config, DiscoveryCache, Endpoint, NadClient, NadError, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Everything a command needs to find and dial the receiver.
#[derive(Debug, Clone)]
pub struct Context {
    /// File, then environment, then flags already applied.
    pub config: Config,
    pub cache: DiscoveryCache,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: DiscoveryCache::at_default_location(),
        }
    }

    pub fn with_cache(config: Config, cache: DiscoveryCache) -> Self {
        Self { config, cache }
    }

    /// The configured address if there is one, otherwise the first device
    /// found by cache-aware discovery.
    pub async fn resolve(&self) -> Result<Endpoint> {
        if let Some(endpoint) = self.config.endpoint() {
            debug!("Using configured receiver {}", endpoint);
            return Ok(endpoint);
        }
        let outcome = discover(
            &self.cache,
            &self.config.scan_options(),
            self.config.discovery.use_cache,
            self.config.cache_ttl(),
            &CancellationToken::new(),
        )
        .await?;
        match outcome.devices.into_iter().next() {
            Some(device) => {
                info!(
                    "Using discovered {} at {} (cached: {})",
                    device.model, device.address, outcome.from_cache
                );
                Ok(device.endpoint())
            }
            None => Err(NadError::NotConnected),
        }
    }

    /// Resolve and dial.
    pub async fn connect(&self) -> Result<NadClient> {
        let endpoint = self.resolve().await?;
        NadClient::connect(endpoint, self.config.client_options()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nad_core::DiscoveredDevice;
    use std::time::Duration;

    #[tokio::test]
    async fn configured_address_wins_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiscoveryCache::new(dir.path().join("cache.json"));
        cache
            .save(
                &[DiscoveredDevice::new("192.168.1.40", 30001, "NAD C 658")],
                Duration::from_secs(300),
            )
            .unwrap();

        let mut config = Config::default();
        config.device.address = Some("10.0.0.5".into());
        let ctx = Context::with_cache(config, cache);
        assert_eq!(ctx.resolve().await.unwrap(), Endpoint::new("10.0.0.5", 30001));
    }

    #[tokio::test]
    async fn falls_back_to_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiscoveryCache::new(dir.path().join("cache.json"));
        cache
            .save(
                &[DiscoveredDevice::new("192.168.1.40", 30001, "NAD C 658")],
                Duration::from_secs(300),
            )
            .unwrap();

        let ctx = Context::with_cache(Config::default(), cache);
        assert_eq!(
            ctx.resolve().await.unwrap(),
            Endpoint::new("192.168.1.40", 30001)
        );
    }
}
