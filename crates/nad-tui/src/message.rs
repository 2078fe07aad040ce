//! Messages flowing between the UI reducer, the device worker, and the
//! Spotify tasks.

use std::fmt;
use std::time::Instant;

use nad_core::{DeviceState, DiscoveredDevice, Direction, Endpoint, Source};
use nad_spotify::{Device, Playback};

// ── Device operations ─────────────────────────────────────────────────────────

/// One unit of work for the device worker.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOp {
    /// Dial the given endpoint, or the configured one when `None`.
    Connect(Option<Endpoint>),
    /// Cache-aware discovery; `refresh` skips the cache.
    Discover { refresh: bool },
    Refresh,
    PowerToggle,
    PowerOn,
    PowerOff,
    VolumeSet(f64),
    VolumeStep(Direction),
    SourceStep(Direction),
    SourceSet(Source),
    MuteToggle,
    BrightnessSet(u8),
    BrightnessStep(Direction),
}

impl DeviceOp {
    /// Volume operations coalesce with each other in the queue.
    pub fn is_volume(&self) -> bool {
        matches!(self, Self::VolumeSet(_) | Self::VolumeStep(_))
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self, Self::Refresh)
    }
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(Some(ep)) => write!(f, "connect {ep}"),
            Self::Connect(None) => write!(f, "connect"),
            Self::Discover { refresh: true } => write!(f, "discover (rescan)"),
            Self::Discover { refresh: false } => write!(f, "discover"),
            Self::Refresh => write!(f, "refresh"),
            Self::PowerToggle => write!(f, "power toggle"),
            Self::PowerOn => write!(f, "power on"),
            Self::PowerOff => write!(f, "power off"),
            Self::VolumeSet(db) => write!(f, "volume {}", nad_core::types::format_volume(*db)),
            Self::VolumeStep(d) => write!(f, "volume {}", d.symbol()),
            Self::SourceStep(d) => write!(f, "source {}", d.symbol()),
            Self::SourceSet(s) => write!(f, "source {s}"),
            Self::MuteToggle => write!(f, "mute toggle"),
            Self::BrightnessSet(level) => write!(f, "brightness {level}"),
            Self::BrightnessStep(d) => write!(f, "brightness {}", d.symbol()),
        }
    }
}

/// A queued operation with its sequence number.
#[derive(Debug, Clone)]
pub struct QueuedOp {
    pub id: u64,
    pub op: DeviceOp,
    pub enqueued_at: Instant,
}

// ── Spotify commands ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SpotifyCommand {
    RefreshDevices,
    RefreshPlayback,
    PlayPause,
    Next,
    Previous,
    Transfer(String),
}

// ── Worker → UI ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    Connected { endpoint: Endpoint, model: String },
    ConnectFailed(String),
    Disconnected(String),
    Status(DeviceState),
    Note { severity: Severity, text: String },
    Tick,
    PendingVolumeTimeout,
    Discovered { devices: Vec<DiscoveredDevice>, from_cache: bool },
    SpotifyDevices(Vec<Device>),
    SpotifyPlayback(Option<Playback>),
}

impl UiMessage {
    pub fn note(severity: Severity, text: impl Into<String>) -> Self {
        Self::Note {
            severity,
            text: text.into(),
        }
    }
}

// ── Reducer output ────────────────────────────────────────────────────────────

/// Side effects requested by the reducer; the app loop performs them.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Enqueue(DeviceOp),
    Spotify(SpotifyCommand),
    Quit,
}
