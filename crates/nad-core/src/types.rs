//! Domain types: device state snapshot, sources, endpoints, volume limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NadError, Result};

/// TCP port every NAD network module listens on.
pub const DEFAULT_PORT: u16 = 30001;

pub const MIN_VOLUME_DB: f64 = -80.0;
pub const MAX_VOLUME_DB: f64 = 10.0;
pub const MAX_BRIGHTNESS: u8 = 3;

// ── Endpoint ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Endpoint on the default NAD port.
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ── Power / Mute ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Power {
    On,
    Off,
    #[default]
    Unknown,
}

impl Power {
    pub fn toggled(self) -> Power {
        match self {
            Power::On => Power::Off,
            // Unknown is treated as off: toggling a device we could not read turns it on.
            Power::Off | Power::Unknown => Power::On,
        }
    }

    pub fn is_on(self) -> bool {
        self == Power::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mute {
    On,
    Off,
    #[default]
    Unknown,
}

impl Mute {
    pub fn toggled(self) -> Mute {
        match self {
            Mute::On => Mute::Off,
            Mute::Off | Mute::Unknown => Mute::On,
        }
    }

    pub fn is_on(self) -> bool {
        self == Mute::On
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("on") {
        Some(true)
    } else if value.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}

impl FromStr for Power {
    type Err = NadError;

    fn from_str(s: &str) -> Result<Self> {
        match parse_on_off(s.trim()) {
            Some(true) => Ok(Power::On),
            Some(false) => Ok(Power::Off),
            None => Err(NadError::invalid(format!("power must be On or Off, got {s:?}"))),
        }
    }
}

impl FromStr for Mute {
    type Err = NadError;

    fn from_str(s: &str) -> Result<Self> {
        match parse_on_off(s.trim()) {
            Some(true) => Ok(Mute::On),
            Some(false) => Ok(Mute::Off),
            None => Err(NadError::invalid(format!("mute must be On or Off, got {s:?}"))),
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Power::On => "On",
            Power::Off => "Off",
            Power::Unknown => "Unknown",
        })
    }
}

impl fmt::Display for Mute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mute::On => "On",
            Mute::Off => "Off",
            Mute::Unknown => "Unknown",
        })
    }
}

// ── Source ────────────────────────────────────────────────────────────────────

/// Input channel, in the order the front panel cycles through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Source {
    #[default]
    Stream,
    Wireless,
    #[serde(rename = "TV")]
    Tv,
    Phono,
    Coax1,
    Coax2,
    Opt1,
    Opt2,
}

impl Source {
    pub const ALL: [Source; 8] = [
        Source::Stream,
        Source::Wireless,
        Source::Tv,
        Source::Phono,
        Source::Coax1,
        Source::Coax2,
        Source::Opt1,
        Source::Opt2,
    ];

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        match self {
            Source::Stream => "Stream",
            Source::Wireless => "Wireless",
            Source::Tv => "TV",
            Source::Phono => "Phono",
            Source::Coax1 => "Coax1",
            Source::Coax2 => "Coax2",
            Source::Opt1 => "Opt1",
            Source::Opt2 => "Opt2",
        }
    }

    pub fn index(self) -> usize {
        Source::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Case-insensitive lookup of a canonical name.
    pub fn from_name(name: &str) -> Option<Source> {
        let name = name.trim();
        Source::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Step through the ordered list, wrapping at both ends.
    pub fn step(self, direction: Direction) -> Source {
        let len = Source::ALL.len();
        let idx = match direction {
            Direction::Up => (self.index() + 1) % len,
            Direction::Down => (self.index() + len - 1) % len,
        };
        Source::ALL[idx]
    }

    pub fn names() -> Vec<&'static str> {
        Source::ALL.iter().map(|s| s.name()).collect()
    }
}

impl FromStr for Source {
    type Err = NadError;

    fn from_str(s: &str) -> Result<Self> {
        Source::from_name(s).ok_or_else(|| {
            NadError::invalid(format!(
                "unknown source {:?} (expected one of {})",
                s,
                Source::names().join(", ")
            ))
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Direction ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn symbol(self) -> char {
        match self {
            Direction::Up => '+',
            Direction::Down => '-',
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

// ── Brightness ────────────────────────────────────────────────────────────────

pub fn validate_brightness(level: i64) -> Result<u8> {
    if (0..=MAX_BRIGHTNESS as i64).contains(&level) {
        Ok(level as u8)
    } else {
        Err(NadError::out_of_range("Brightness", level))
    }
}

/// Step the front-panel dimmer, wrapping over 0..=3.
pub fn step_brightness(level: u8, direction: Direction) -> u8 {
    let span = MAX_BRIGHTNESS + 1;
    let level = level.min(MAX_BRIGHTNESS);
    match direction {
        Direction::Up => (level + 1) % span,
        Direction::Down => (level + span - 1) % span,
    }
}

// ── Volume ────────────────────────────────────────────────────────────────────

/// Safety limits applied before a volume is transmitted. The ceiling differs
/// between NAD models, so it is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeLimits {
    pub min_db: f64,
    pub max_db: f64,
}

impl Default for VolumeLimits {
    fn default() -> Self {
        Self {
            min_db: MIN_VOLUME_DB,
            max_db: MAX_VOLUME_DB,
        }
    }
}

impl VolumeLimits {
    /// Never panics; with inverted bounds the ceiling wins.
    pub fn clamp(&self, db: f64) -> f64 {
        round_volume(db.max(self.min_db).min(self.max_db))
    }

    pub fn contains(&self, db: f64) -> bool {
        db >= self.min_db && db <= self.max_db
    }
}

/// Round to the single fractional digit the protocol carries.
pub fn round_volume(db: f64) -> f64 {
    (db * 10.0).round() / 10.0
}

pub fn format_volume(db: f64) -> String {
    let v = round_volume(db);
    // Avoid "-0.0" on the wire.
    if v == 0.0 {
        "0.0".to_string()
    } else {
        format!("{v:.1}")
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Full state of a receiver as read by one refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub power: Power,
    pub volume: f64,
    pub source: Source,
    pub mute: Mute,
    pub brightness: u8,
    pub model: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: Power::Unknown,
            volume: MIN_VOLUME_DB,
            source: Source::Stream,
            mute: Mute::Unknown,
            brightness: 0,
            model: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_lookup_is_case_insensitive() {
        assert_eq!(Source::from_name("tv"), Some(Source::Tv));
        assert_eq!(Source::from_name(" COAX2 "), Some(Source::Coax2));
        assert_eq!(Source::from_name("hdmi"), None);
        assert_eq!("opt1".parse::<Source>().unwrap().name(), "Opt1");
        assert!("aux".parse::<Source>().is_err());
    }

    #[test]
    fn source_step_wraps_both_ways() {
        assert_eq!(Source::Opt2.step(Direction::Up), Source::Stream);
        assert_eq!(Source::Stream.step(Direction::Down), Source::Opt2);

        let mut s = Source::Phono;
        for _ in 0..Source::ALL.len() {
            s = s.step(Direction::Up);
        }
        assert_eq!(s, Source::Phono);
        for _ in 0..Source::ALL.len() {
            s = s.step(Direction::Down);
        }
        assert_eq!(s, Source::Phono);
    }

    #[test]
    fn brightness_wraps() {
        assert_eq!(step_brightness(3, Direction::Up), 0);
        assert_eq!(step_brightness(0, Direction::Down), 3);
        assert_eq!(step_brightness(1, Direction::Up), 2);
        assert_eq!(validate_brightness(4).unwrap_err().tag(), "OutOfRange");
        assert!(validate_brightness(-1).is_err());
        assert_eq!(validate_brightness(3).unwrap(), 3);
    }

    #[test]
    fn volume_limits_clamp_and_round() {
        let limits = VolumeLimits::default();
        assert_eq!(limits.clamp(50.0), 10.0);
        assert_eq!(limits.clamp(-200.0), -80.0);
        assert_eq!(limits.clamp(-25.04), -25.0);
        assert_eq!(format_volume(-25.0), "-25.0");
        assert_eq!(format_volume(-0.01), "0.0");
        assert_eq!(format_volume(7.25), "7.3");
    }

    #[test]
    fn inverted_limits_do_not_panic() {
        let limits = VolumeLimits {
            min_db: 10.0,
            max_db: -80.0,
        };
        assert_eq!(limits.clamp(-20.0), -80.0);
    }

    #[test]
    fn power_and_mute_parse_and_toggle() {
        assert_eq!("on".parse::<Power>().unwrap(), Power::On);
        assert_eq!("OFF".parse::<Mute>().unwrap(), Mute::Off);
        assert!("standby".parse::<Power>().is_err());
        assert_eq!(Power::Unknown.toggled(), Power::On);
        assert_eq!(Mute::On.toggled(), Mute::Off);
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(Endpoint::with_default_port("10.0.0.2").to_string(), "10.0.0.2:30001");
        assert_eq!(Endpoint::new("::1", 9).to_string(), "[::1]:9");
    }
}
