//! LAN discovery: probe every host of every local IPv4 subnet for a NAD
//! control port, plus the cache-aware `discover` entry point.

use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::DiscoveryCache;
use crate::error::{NadError, Result};
use crate::protocol::{split_response, Attribute, Command};
use crate::types::{Endpoint, DEFAULT_PORT};

/// Model prefixes reported by NAD receivers that omit the brand.
const KNOWN_MODEL_PREFIXES: &[&str] = &[
    "T 7", "T 5", "C 3", "C 5", "C 6", "C 7", "D 3", "D 7", "M10", "M12", "M17", "M33", "M66",
];

// ── Discovered device ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    #[serde(rename = "IP")]
    pub address: String,
    #[serde(rename = "Port", with = "port_as_string")]
    pub port: u16,
    #[serde(rename = "Model")]
    pub model: String,
}

impl DiscoveredDevice {
    pub fn new(address: impl Into<String>, port: u16, model: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            model: model.into(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone(), self.port)
    }
}

/// The cache file stores the port as a string; older files may carry a number.
mod port_as_string {
    use super::*;

    pub fn serialize<S: Serializer>(port: &u16, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&port.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u16, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u16),
        }
        match Raw::deserialize(d)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

pub fn is_nad_model(model: &str) -> bool {
    let model = model.trim();
    model.to_ascii_uppercase().contains("NAD")
        || KNOWN_MODEL_PREFIXES.iter().any(|p| model.starts_with(p))
}

// ── Scan targets ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ScanTargets {
    /// Every host of every non-loopback IPv4 subnet.
    LocalSubnets,
    /// An explicit host list.
    Hosts(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub targets: ScanTargets,
    pub port: u16,
    pub probe_timeout: Duration,
    pub max_concurrent: usize,
    /// Overall deadline; probes still running when it elapses are dropped.
    pub deadline: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            targets: ScanTargets::LocalSubnets,
            port: DEFAULT_PORT,
            probe_timeout: Duration::from_secs(2),
            max_concurrent: 256,
            deadline: Duration::from_secs(10),
        }
    }
}

/// Host addresses of an IPv4 subnet, excluding network and broadcast.
///
/// Subnets wider than /16 are narrowed to the /24 holding `ip`.
pub fn subnet_hosts(ip: Ipv4Addr, netmask: Ipv4Addr) -> Vec<Ipv4Addr> {
    let mut prefix = u32::from(netmask).leading_ones();
    if prefix < 16 {
        warn!(
            "Subnet {}/{} too large to scan, narrowing to {}/24",
            ip, prefix, ip
        );
        prefix = 24;
    }
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let network = u32::from(ip) & mask;
    let broadcast = network | !mask;

    match prefix {
        32 => vec![ip],
        31 => vec![Ipv4Addr::from(network), Ipv4Addr::from(broadcast)],
        _ => ((network + 1)..broadcast).map(Ipv4Addr::from).collect(),
    }
}

/// Candidates from every interface that is up, not loopback, and has an
/// IPv4 address.
pub fn local_subnet_hosts() -> Result<Vec<Ipv4Addr>> {
    let mut hosts = BTreeSet::new();
    for iface in if_addrs::get_if_addrs()? {
        let v4 = match &iface.addr {
            if_addrs::IfAddr::V4(v4) => Some((v4.ip, v4.netmask)),
            _ => None,
        };
        hosts.extend(interface_hosts(&iface.name, iface.is_loopback(), iface.is_oper_up(), v4));
    }
    Ok(hosts.into_iter().collect())
}

/// A down interface keeps its address on Linux, so link state is checked
/// separately from the address.
fn interface_hosts(
    name: &str,
    loopback: bool,
    up: bool,
    v4: Option<(Ipv4Addr, Ipv4Addr)>,
) -> Vec<Ipv4Addr> {
    if loopback {
        return Vec::new();
    }
    let Some((ip, netmask)) = v4 else {
        return Vec::new();
    };
    if !up {
        debug!("Skipping {} ({}/{}): interface is down", name, ip, netmask);
        return Vec::new();
    }
    debug!("Scanning {} ({}/{})", name, ip, netmask);
    subnet_hosts(ip, netmask)
}

// ── Probe ─────────────────────────────────────────────────────────────────────

/// Connect, ask for the model, accept a NAD answer.
pub async fn probe(host: String, port: u16, probe_timeout: Duration) -> Option<DiscoveredDevice> {
    let attempt = async {
        let stream = TcpStream::connect((host.as_str(), port)).await.ok()?;
        let (read_half, mut write_half) = stream.into_split();
        write_half
            .write_all(Command::query(Attribute::Model).to_wire().as_bytes())
            .await
            .ok()?;
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        Some(line)
    };
    let line = timeout(probe_timeout, attempt).await.ok()??;

    let (key, model) = split_response(line.trim_start_matches(['\r', '\n'])).ok()?;
    if Attribute::from_key(key.trim()) != Some(Attribute::Model) {
        return None;
    }
    let model = model.trim();
    if !is_nad_model(model) {
        debug!("{}:{} answered with non-NAD model {:?}", host, port, model);
        return None;
    }
    info!("Found {} at {}:{}", model, host, port);
    Some(DiscoveredDevice::new(host, port, model))
}

// ── Scan ──────────────────────────────────────────────────────────────────────

/// Probe all targets with bounded fan-out. Returns whatever was found when
/// the deadline elapses; cancellation yields `Cancelled`.
pub async fn scan(options: &ScanOptions, cancel: &CancellationToken) -> Result<Vec<DiscoveredDevice>> {
    let hosts: Vec<String> = match &options.targets {
        ScanTargets::LocalSubnets => local_subnet_hosts()?
            .into_iter()
            .map(|ip| ip.to_string())
            .collect(),
        ScanTargets::Hosts(hosts) => hosts.clone(),
    };
    info!(
        "Scanning {} host(s) on port {} (deadline {:?})",
        hosts.len(),
        options.port,
        options.deadline
    );

    let started = Instant::now();
    let port = options.port;
    let probe_timeout = options.probe_timeout;
    let mut probes = stream::iter(hosts)
        .map(|host| probe(host, port, probe_timeout))
        .buffer_unordered(options.max_concurrent.max(1));

    let mut found: HashMap<String, DiscoveredDevice> = HashMap::new();
    let deadline = tokio::time::sleep(options.deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(NadError::Cancelled(started.elapsed()));
            }
            _ = &mut deadline => {
                warn!("Discovery deadline reached, returning {} partial result(s)", found.len());
                break;
            }
            next = probes.next() => match next {
                Some(Some(device)) => {
                    found.entry(device.address.clone()).or_insert(device);
                }
                Some(None) => {}
                None => break,
            },
        }
    }

    info!(
        "Discovery finished in {:?}: {} device(s)",
        started.elapsed(),
        found.len()
    );
    Ok(found.into_values().collect())
}

// ── Cache-aware discovery ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    pub devices: Vec<DiscoveredDevice>,
    pub from_cache: bool,
}

/// Serve a fresh cache when allowed, otherwise scan and persist non-empty
/// results. Cache failures are logged and never fail the call.
pub async fn discover(
    cache: &DiscoveryCache,
    options: &ScanOptions,
    use_cache: bool,
    ttl: Duration,
    cancel: &CancellationToken,
) -> Result<DiscoveryOutcome> {
    if use_cache {
        match cache.load() {
            Ok((devices, true)) => {
                info!("Using {} cached device(s)", devices.len());
                return Ok(DiscoveryOutcome {
                    devices,
                    from_cache: true,
                });
            }
            Ok(_) => debug!("No fresh cache, scanning"),
            Err(e) => warn!("Discovery cache unreadable: {}", e),
        }
    }

    let devices = scan(options, cancel).await?;
    if !devices.is_empty() {
        if let Err(e) = cache.save(&devices, ttl) {
            warn!("Failed to save discovery cache: {}", e);
        }
    }
    Ok(DiscoveryOutcome {
        devices,
        from_cache: false,
    })
}
