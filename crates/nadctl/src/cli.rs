//! Command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use nad_core::types::{validate_brightness, DEFAULT_PORT};
use nad_core::{Config, Direction, NadError, Source};

/// Control NAD network receivers.
#[derive(Debug, Parser)]
#[command(name = "nadctl", version, about)]
pub struct Cli {
    /// Config file (default: <config dir>/nadctl/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging (same as NAD_DEBUG=1).
    #[arg(long, global = true)]
    pub debug: bool,

    /// Ignore the discovery cache.
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Delete the discovery cache before running the command.
    #[arg(long, global = true)]
    pub clear_cache: bool,

    /// Receiver address; overrides NAD_IP and the config file.
    #[arg(long, global = true, value_name = "ADDR")]
    pub ip: Option<String>,

    /// Receiver port; overrides NAD_PORT and the config file.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Defaults to the TUI.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Overlay the global flags on a loaded config. Runs after
    /// [`Config::apply_env`], so flags win over the environment.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ip) = self.ip.as_deref().map(str::trim).filter(|ip| !ip.is_empty()) {
            config.device.address = Some(ip.to_string());
        }
        if let Some(port) = self.port {
            config.device.port = port;
        }
        if self.debug {
            config.logging.debug = true;
        }
        if self.no_cache {
            config.discovery.use_cache = false;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Power on, standby, toggle (default) or show.
    Power {
        #[arg(value_enum)]
        action: Option<SwitchAction>,
    },
    /// Show, step, or set the volume in dB.
    Volume {
        /// LEVEL, up, down, or set LEVEL.
        #[arg(allow_negative_numbers = true, num_args = 0..=2)]
        args: Vec<String>,
    },
    /// Show or change the input.
    Source {
        /// NAME, next, prev, or list.
        target: Option<String>,
    },
    /// Mute on, off, toggle (default) or show.
    Mute {
        #[arg(value_enum)]
        action: Option<SwitchAction>,
    },
    /// Show or change front display brightness (0-3).
    Dim {
        /// LEVEL, up, down, or list.
        target: Option<String>,
    },
    /// Show every attribute of the receiver.
    Status,
    /// Find receivers on the local network.
    Discover {
        /// Scan even if the cache is fresh.
        #[arg(long)]
        refresh: bool,
        /// Print the cache file contents and exit.
        #[arg(long)]
        show_cache: bool,
        /// Overall scan deadline (500ms, 5s, 2m, or bare seconds).
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },
    /// Run a protocol simulator until interrupted.
    Simulator {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Control Spotify Connect playback.
    Spotify {
        #[command(subcommand)]
        action: Option<SpotifyAction>,
    },
    /// Interactive terminal UI.
    Tui,
    /// Serve MCP over stdio.
    Mcp,
    /// Print the version.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwitchAction {
    On,
    Off,
    Toggle,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum SpotifyAction {
    Status,
    Play,
    Pause,
    Next,
    Prev,
    Devices,
    /// Move playback to a device id (see `spotify devices`).
    Transfer { id: String },
}

// ── Argument interpretation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeAction {
    Show,
    Step(Direction),
    Set(f64),
}

impl VolumeAction {
    pub fn parse(args: &[String]) -> Result<Self, NadError> {
        match args {
            [] => Ok(Self::Show),
            [one] if one.eq_ignore_ascii_case("up") => Ok(Self::Step(Direction::Up)),
            [one] if one.eq_ignore_ascii_case("down") => Ok(Self::Step(Direction::Down)),
            [set, level] if set.eq_ignore_ascii_case("set") => parse_level(level).map(Self::Set),
            [level] => parse_level(level).map(Self::Set),
            _ => Err(NadError::invalid(format!(
                "unexpected volume arguments: {}",
                args.join(" ")
            ))),
        }
    }
}

fn parse_level(text: &str) -> Result<f64, NadError> {
    let db: f64 = text
        .trim()
        .parse()
        .map_err(|_| NadError::invalid(format!("volume {text:?} is not a number")))?;
    if !db.is_finite() {
        return Err(NadError::invalid(format!("volume {text:?} is not a number")));
    }
    Ok(db)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceAction {
    Show,
    Step(Direction),
    List,
    Set(Source),
}

impl SourceAction {
    pub fn parse(target: Option<&str>) -> Result<Self, NadError> {
        match target.map(str::trim) {
            None => Ok(Self::Show),
            Some(t) if t.eq_ignore_ascii_case("next") => Ok(Self::Step(Direction::Up)),
            Some(t) if t.eq_ignore_ascii_case("prev") => Ok(Self::Step(Direction::Down)),
            Some(t) if t.eq_ignore_ascii_case("list") => Ok(Self::List),
            Some(name) => name.parse().map(Self::Set),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DimAction {
    Show,
    Step(Direction),
    List,
    Set(u8),
}

impl DimAction {
    pub fn parse(target: Option<&str>) -> Result<Self, NadError> {
        match target.map(str::trim) {
            None => Ok(Self::Show),
            Some(t) if t.eq_ignore_ascii_case("up") => Ok(Self::Step(Direction::Up)),
            Some(t) if t.eq_ignore_ascii_case("down") => Ok(Self::Step(Direction::Down)),
            Some(t) if t.eq_ignore_ascii_case("list") => Ok(Self::List),
            Some(level) => {
                let n: i64 = level
                    .parse()
                    .map_err(|_| NadError::invalid(format!("brightness {level:?} is not a number")))?;
                validate_brightness(n).map(Self::Set)
            }
        }
    }
}

/// Parse `500ms`, `5s`, `2m`, or bare seconds.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let (number, unit) = match text.find(|c: char| !(c.is_ascii_digit() || c == '.')) {
        Some(idx) => text.split_at(idx),
        None => (text, "s"),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration {text:?}"))?;
    let secs = match unit.trim() {
        "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        other => return Err(format!("unknown duration unit {other:?} (use ms, s, or m)")),
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("duration must be positive: {text:?}"));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("3"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("1.5"), Ok(Duration::from_millis(1500)));
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn volume_arguments() {
        assert_eq!(VolumeAction::parse(&[]).unwrap(), VolumeAction::Show);
        assert_eq!(
            VolumeAction::parse(&strings(&["up"])).unwrap(),
            VolumeAction::Step(Direction::Up)
        );
        assert_eq!(
            VolumeAction::parse(&strings(&["-25.5"])).unwrap(),
            VolumeAction::Set(-25.5)
        );
        assert_eq!(
            VolumeAction::parse(&strings(&["set", "-10"])).unwrap(),
            VolumeAction::Set(-10.0)
        );
        assert!(VolumeAction::parse(&strings(&["loud"])).is_err());
        assert!(VolumeAction::parse(&strings(&["up", "3"])).is_err());
    }

    #[test]
    fn source_and_dim_arguments() {
        assert_eq!(SourceAction::parse(Some("tv")).unwrap(), SourceAction::Set(Source::Tv));
        assert_eq!(
            SourceAction::parse(Some("prev")).unwrap(),
            SourceAction::Step(Direction::Down)
        );
        assert_eq!(
            SourceAction::parse(Some("bogus")).unwrap_err().tag(),
            "InvalidArgument"
        );
        assert_eq!(DimAction::parse(Some("2")).unwrap(), DimAction::Set(2));
        assert_eq!(DimAction::parse(Some("4")).unwrap_err().tag(), "OutOfRange");
        assert_eq!(DimAction::parse(None).unwrap(), DimAction::Show);
    }

    #[test]
    fn negative_volume_is_not_a_flag() {
        let cli = Cli::try_parse_from(["nadctl", "volume", "-20"]).unwrap();
        match cli.command {
            Some(Command::Volume { args }) => assert_eq!(args, vec!["-20"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn flags_after_a_negative_volume() {
        let cli = Cli::try_parse_from(["nadctl", "volume", "set", "-12.5", "--ip", "10.0.0.7"]).unwrap();
        assert_eq!(cli.ip.as_deref(), Some("10.0.0.7"));
        match cli.command {
            Some(Command::Volume { args }) => assert_eq!(args, vec!["set", "-12.5"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["nadctl", "power", "on", "--ip", "10.0.0.7", "--port", "4000"])
                .unwrap();
        assert_eq!(cli.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(cli.port, Some(4000));
        assert!(matches!(
            cli.command,
            Some(Command::Power {
                action: Some(SwitchAction::On)
            })
        ));
    }

    #[test]
    fn flags_override_environment() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "NAD_IP" => Some("192.168.1.20".into()),
            "NAD_PORT" => Some("31000".into()),
            _ => None,
        });
        let cli = Cli::try_parse_from(["nadctl", "--ip", "10.0.0.9", "--no-cache", "status"]).unwrap();
        cli.apply_to(&mut config);
        assert_eq!(config.device.address.as_deref(), Some("10.0.0.9"));
        assert_eq!(config.device.port, 31000);
        assert!(!config.discovery.use_cache);
    }

    #[test]
    fn usage_errors_are_rejected() {
        assert!(Cli::try_parse_from(["nadctl", "power", "sideways"]).is_err());
        assert!(Cli::try_parse_from(["nadctl", "discover", "--timeout", "forever"]).is_err());
    }
}
