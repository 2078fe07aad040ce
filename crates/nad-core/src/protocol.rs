//! NAD line protocol codec.
//!
//! Commands and responses are single ASCII lines of the form
//!
//! ```text
//!   Main.Volume=-25.0     set (and every response)
//!   Main.Volume?          query
//!   Main.Volume+          step up     (Main.Volume- steps down)
//! ```
//!
//! Commands are written with a `\r\n` terminator.  Responses may end in CR,
//! LF, or CRLF; exactly one terminator is stripped before decoding.

use std::fmt;

use crate::error::{NadError, Result};
use crate::types::{
    format_volume, Direction, Mute, Power, Source, VolumeLimits, MAX_BRIGHTNESS,
};

/// Prefix shared by every attribute of the main zone.
pub const ZONE_PREFIX: &str = "Main.";

/// Line terminator appended to every outgoing command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

// ── Attribute ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Power,
    Volume,
    Source,
    Mute,
    Brightness,
    Model,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Power,
        Attribute::Volume,
        Attribute::Source,
        Attribute::Mute,
        Attribute::Brightness,
        Attribute::Model,
    ];

    /// Case-sensitive wire name without the zone prefix.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Power => "Power",
            Attribute::Volume => "Volume",
            Attribute::Source => "Source",
            Attribute::Mute => "Mute",
            Attribute::Brightness => "Brightness",
            Attribute::Model => "Model",
        }
    }

    /// Resolve a full key such as `Main.Volume`.
    pub fn from_key(key: &str) -> Option<Attribute> {
        let name = key.strip_prefix(ZONE_PREFIX)?;
        Attribute::ALL.iter().copied().find(|a| a.name() == name)
    }

    pub fn key(self) -> String {
        format!("{}{}", ZONE_PREFIX, self.name())
    }

    pub fn is_writable(self) -> bool {
        self != Attribute::Model
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Command ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Query,
    /// Payload already in wire form.
    Set(String),
    Step(Direction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub attribute: Attribute,
    pub operation: Operation,
}

impl Command {
    pub fn query(attribute: Attribute) -> Self {
        Self {
            attribute,
            operation: Operation::Query,
        }
    }

    pub fn step(attribute: Attribute, direction: Direction) -> Self {
        Self {
            attribute,
            operation: Operation::Step(direction),
        }
    }

    pub fn set_power(power: Power) -> Result<Self> {
        match power {
            Power::Unknown => Err(NadError::invalid("cannot set power to Unknown")),
            p => Ok(Self::set_raw(Attribute::Power, p.to_string())),
        }
    }

    pub fn set_mute(mute: Mute) -> Result<Self> {
        match mute {
            Mute::Unknown => Err(NadError::invalid("cannot set mute to Unknown")),
            m => Ok(Self::set_raw(Attribute::Mute, m.to_string())),
        }
    }

    /// Volume is clamped into `limits` before it is encoded.
    pub fn set_volume(db: f64, limits: &VolumeLimits) -> Result<Self> {
        if !db.is_finite() {
            return Err(NadError::invalid(format!("volume must be a number, got {db}")));
        }
        Ok(Self::set_raw(Attribute::Volume, format_volume(limits.clamp(db))))
    }

    pub fn set_source(source: Source) -> Self {
        Self::set_raw(Attribute::Source, source.name().to_string())
    }

    pub fn set_brightness(level: u8) -> Result<Self> {
        if level > MAX_BRIGHTNESS {
            return Err(NadError::out_of_range("Brightness", level));
        }
        Ok(Self::set_raw(Attribute::Brightness, level.to_string()))
    }

    fn set_raw(attribute: Attribute, payload: String) -> Self {
        Self {
            attribute,
            operation: Operation::Set(payload),
        }
    }

    /// Single-line form without terminator, e.g. `Main.Source=TV`.
    pub fn encode(&self) -> String {
        let key = self.attribute.key();
        match &self.operation {
            Operation::Query => format!("{key}?"),
            Operation::Set(value) => format!("{key}={value}"),
            Operation::Step(dir) => format!("{key}{}", dir.symbol()),
        }
    }

    /// Bytes as written to the socket.
    pub fn to_wire(&self) -> String {
        let mut line = self.encode();
        line.push_str(COMMAND_TERMINATOR);
        line
    }

    /// Classify one received token (already split from its terminator).
    /// Used by the simulator to interpret client input.
    pub fn parse(token: &str) -> Result<Command> {
        let token = token.trim();
        if let Some((key, value)) = token.split_once('=') {
            let attribute = Attribute::from_key(key)
                .ok_or_else(|| NadError::UnknownAttribute(key.to_string()))?;
            return Ok(Self::set_raw(attribute, value.trim().to_string()));
        }
        let (key, operation) = if let Some(key) = token.strip_suffix('?') {
            (key, Operation::Query)
        } else if let Some(key) = token.strip_suffix('+') {
            (key, Operation::Step(Direction::Up))
        } else if let Some(key) = token.strip_suffix('-') {
            (key, Operation::Step(Direction::Down))
        } else {
            return Err(NadError::MalformedResponse(token.to_string()));
        };
        let attribute =
            Attribute::from_key(key).ok_or_else(|| NadError::UnknownAttribute(key.to_string()))?;
        Ok(Self {
            attribute,
            operation,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A decoded `Main.<Attr>=<value>` line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Power(Power),
    Volume(f64),
    Source(Source),
    Mute(Mute),
    Brightness(u8),
    Model(String),
}

impl Reply {
    pub fn attribute(&self) -> Attribute {
        match self {
            Reply::Power(_) => Attribute::Power,
            Reply::Volume(_) => Attribute::Volume,
            Reply::Source(_) => Attribute::Source,
            Reply::Mute(_) => Attribute::Mute,
            Reply::Brightness(_) => Attribute::Brightness,
            Reply::Model(_) => Attribute::Model,
        }
    }

    /// Canonical response line without terminator.
    pub fn encode(&self) -> String {
        let value = match self {
            Reply::Power(p) => p.to_string(),
            Reply::Volume(v) => format_volume(*v),
            Reply::Source(s) => s.name().to_string(),
            Reply::Mute(m) => m.to_string(),
            Reply::Brightness(b) => b.to_string(),
            Reply::Model(m) => m.clone(),
        };
        format!("{}={}", self.attribute().key(), value)
    }
}

/// Strip one trailing CRLF, LF, or CR.
pub fn strip_terminator(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line)
}

/// Split a response line on its first `=` into (key, payload).
pub fn split_response(line: &str) -> Result<(&str, &str)> {
    let line = strip_terminator(line);
    line.split_once('=')
        .ok_or_else(|| NadError::MalformedResponse(line.to_string()))
}

/// Decode a response line using the default volume domain.
pub fn decode_response(line: &str) -> Result<Reply> {
    decode_response_within(line, &VolumeLimits::default())
}

/// Decode a response line; volumes outside `limits` are `OutOfRange`.
pub fn decode_response_within(line: &str, limits: &VolumeLimits) -> Result<Reply> {
    let (key, payload) = split_response(line)?;
    let attribute =
        Attribute::from_key(key.trim()).ok_or_else(|| NadError::UnknownAttribute(key.to_string()))?;
    decode_payload(attribute, payload, limits)
}

fn decode_payload(attribute: Attribute, payload: &str, limits: &VolumeLimits) -> Result<Reply> {
    let malformed = || NadError::MalformedResponse(format!("{}={}", attribute.key(), payload));
    let value = payload.trim();
    match attribute {
        Attribute::Power => value.parse().map(Reply::Power).map_err(|_| malformed()),
        Attribute::Mute => value.parse().map(Reply::Mute).map_err(|_| malformed()),
        Attribute::Source => Source::from_name(value).map(Reply::Source).ok_or_else(malformed),
        Attribute::Volume => {
            let db: f64 = value.parse().map_err(|_| malformed())?;
            if !db.is_finite() || !limits.contains(db) {
                return Err(NadError::out_of_range("Volume", value));
            }
            Ok(Reply::Volume(db))
        }
        Attribute::Brightness => {
            let level: i64 = value.parse().map_err(|_| malformed())?;
            if !(0..=MAX_BRIGHTNESS as i64).contains(&level) {
                return Err(NadError::out_of_range("Brightness", value));
            }
            Ok(Reply::Brightness(level as u8))
        }
        Attribute::Model => Ok(Reply::Model(value.to_string())),
    }
}
