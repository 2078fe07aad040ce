//! Control library for NAD network receivers.
//!
//! The line protocol codec, a single-socket device client, LAN discovery with
//! an on-disk cache, and a protocol simulator for development and tests.

pub mod cache;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod platform;
pub mod protocol;
pub mod simulator;
pub mod types;

pub use cache::{CacheRecord, DiscoveryCache, DEFAULT_CACHE_TTL};
pub use client::{ClientOptions, ConnState, NadClient};
pub use config::Config;
pub use discovery::{discover, scan, DiscoveredDevice, DiscoveryOutcome, ScanOptions, ScanTargets};
pub use error::{NadError, Result};
pub use simulator::Simulator;
pub use types::{DeviceState, Direction, Endpoint, Mute, Power, Source, VolumeLimits};
