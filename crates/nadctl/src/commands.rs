//! One-shot command dispatch.

use chrono::{DateTime, Local, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nad_core::types::{format_volume, MAX_BRIGHTNESS};
use nad_core::{
    discover, CacheRecord, Config, DeviceState, DiscoveredDevice, Mute, NadClient, Simulator,
    Source,
};
use nad_spotify::{Credentials, Playback, SpotifyClient};
use nad_tui::LogBuffer;

use crate::cli::{Cli, Command, DimAction, SourceAction, SpotifyAction, SwitchAction, VolumeAction};
use crate::endpoint::Context;
use crate::logging::{self, LogTarget};
use crate::mcp;

/// Load configuration, install logging, and run the selected command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    cli.apply_to(&mut config);

    let command = match cli.command {
        Some(command) => command,
        // A bare `--clear-cache` is a command of its own.
        None if cli.clear_cache => {
            logging::init(LogTarget::Stderr, config.logging.debug)?;
            let ctx = Context::new(config);
            ctx.cache.clear()?;
            println!("Discovery cache cleared ({})", ctx.cache.path().display());
            return Ok(());
        }
        None => Command::Tui,
    };

    let logs = LogBuffer::new();
    let target = match command {
        Command::Tui => LogTarget::File {
            name: "tui",
            buffer: Some(logs.clone()),
        },
        Command::Mcp => LogTarget::File {
            name: "mcp",
            buffer: None,
        },
        _ => LogTarget::Stderr,
    };
    if let Some(path) = logging::init(target, config.logging.debug)? {
        info!("Log file: {:?}", path);
    }
    debug!("Config: {:?}", config);

    let ctx = Context::new(config);
    if cli.clear_cache {
        ctx.cache.clear()?;
        info!("Discovery cache cleared");
    }

    match command {
        Command::Power { action } => power(&ctx, action.unwrap_or(SwitchAction::Toggle)).await,
        Command::Volume { args } => volume(&ctx, VolumeAction::parse(&args)?).await,
        Command::Source { target } => source(&ctx, SourceAction::parse(target.as_deref())?).await,
        Command::Mute { action } => mute(&ctx, action.unwrap_or(SwitchAction::Toggle)).await,
        Command::Dim { target } => dim(&ctx, DimAction::parse(target.as_deref())?).await,
        Command::Status => {
            let mut client = ctx.connect().await?;
            let state = client.refresh().await?;
            print!("{}", render_status(&client, &state));
            Ok(())
        }
        Command::Discover {
            refresh,
            show_cache,
            timeout,
        } => {
            if show_cache {
                return show_cache_file(&ctx);
            }
            let mut options = ctx.config.scan_options();
            if let Some(deadline) = timeout {
                options.deadline = deadline;
            }
            let outcome = discover(
                &ctx.cache,
                &options,
                ctx.config.discovery.use_cache && !refresh,
                ctx.config.cache_ttl(),
                &CancellationToken::new(),
            )
            .await?;
            print!("{}", render_devices(&outcome.devices, outcome.from_cache));
            Ok(())
        }
        Command::Simulator { port, bind } => simulator(&bind, port).await,
        Command::Spotify { action } => spotify(&ctx.config, action.unwrap_or(SpotifyAction::Status)).await,
        Command::Tui => nad_tui::run(ctx.config, logs).await,
        Command::Mcp => mcp::serve_stdio(ctx).await,
        Command::Version => {
            println!("nadctl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

// ── Device commands ───────────────────────────────────────────────────────────

async fn power(ctx: &Context, action: SwitchAction) -> anyhow::Result<()> {
    let mut client = ctx.connect().await?;
    let power = match action {
        SwitchAction::On => client.power_on().await?,
        SwitchAction::Off => client.power_off().await?,
        SwitchAction::Toggle => client.power_toggle().await?,
        SwitchAction::Status => client.power().await?,
    };
    println!("Power: {power}");
    Ok(())
}

async fn volume(ctx: &Context, action: VolumeAction) -> anyhow::Result<()> {
    let mut client = ctx.connect().await?;
    let db = match action {
        VolumeAction::Show => client.volume().await?,
        VolumeAction::Step(direction) => client.step_volume(direction).await?,
        VolumeAction::Set(db) => client.set_volume(db).await?,
    };
    println!("Volume: {} dB", format_volume(db));
    Ok(())
}

async fn source(ctx: &Context, action: SourceAction) -> anyhow::Result<()> {
    if action == SourceAction::List {
        print!("{}", render_sources(None));
        return Ok(());
    }
    let mut client = ctx.connect().await?;
    let source = match action {
        SourceAction::Show | SourceAction::List => client.source().await?,
        SourceAction::Step(direction) => client.step_source(direction).await?,
        SourceAction::Set(source) => client.set_source(source).await?,
    };
    println!("Source: {source}");
    Ok(())
}

async fn mute(ctx: &Context, action: SwitchAction) -> anyhow::Result<()> {
    let mut client = ctx.connect().await?;
    let mute = match action {
        SwitchAction::On => client.set_mute(Mute::On).await?,
        SwitchAction::Off => client.set_mute(Mute::Off).await?,
        SwitchAction::Toggle => client.toggle_mute().await?,
        SwitchAction::Status => client.mute().await?,
    };
    println!("Mute: {mute}");
    Ok(())
}

async fn dim(ctx: &Context, action: DimAction) -> anyhow::Result<()> {
    if action == DimAction::List {
        for level in 0..=MAX_BRIGHTNESS {
            println!("{level}");
        }
        return Ok(());
    }
    let mut client = ctx.connect().await?;
    let level = match action {
        DimAction::Show | DimAction::List => client.brightness().await?,
        DimAction::Step(direction) => client.step_brightness(direction).await?,
        DimAction::Set(level) => client.set_brightness(i64::from(level)).await?,
    };
    println!("Brightness: {level}");
    Ok(())
}

fn show_cache_file(ctx: &Context) -> anyhow::Result<()> {
    match ctx.cache.read_record()? {
        Some(record) => print!("{}", render_cache(ctx, &record, Utc::now())),
        None => println!("No discovery cache at {}", ctx.cache.path().display()),
    }
    Ok(())
}

async fn simulator(bind: &str, port: u16) -> anyhow::Result<()> {
    let sim = Simulator::bind(&format!("{bind}:{port}")).await?;
    println!("Simulator listening on {} (Ctrl-C to stop)", sim.local_addr());
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sim.stopped() => {}
    }
    sim.shutdown();
    Ok(())
}

// ── Spotify ───────────────────────────────────────────────────────────────────

pub fn spotify_credentials(config: &Config) -> Credentials {
    Credentials {
        client_id: config.spotify.client_id.clone(),
        client_secret: config.spotify.client_secret.clone(),
        refresh_token: config.spotify.refresh_token.clone(),
        access_token: config.spotify.access_token.clone(),
    }
}

async fn spotify(config: &Config, action: SpotifyAction) -> anyhow::Result<()> {
    let client = SpotifyClient::new(spotify_credentials(config));
    match action {
        SpotifyAction::Status => print!("{}", render_playback(client.playback().await?.as_ref())),
        SpotifyAction::Play => {
            client.play().await?;
            println!("Playing");
        }
        SpotifyAction::Pause => {
            client.pause().await?;
            println!("Paused");
        }
        SpotifyAction::Next => {
            client.next().await?;
            println!("Skipped to next track");
        }
        SpotifyAction::Prev => {
            client.previous().await?;
            println!("Back to previous track");
        }
        SpotifyAction::Devices => {
            let devices = client.devices().await?;
            if devices.is_empty() {
                println!("No Spotify Connect devices");
            }
            for device in devices {
                println!(
                    "{} {:<24} {:<12} {}",
                    if device.is_active { "*" } else { " " },
                    device.name,
                    device.device_type,
                    device.id.as_deref().unwrap_or("-")
                );
            }
        }
        SpotifyAction::Transfer { id } => {
            client.transfer(&id, true).await?;
            println!("Playback transferred to {id}");
        }
    }
    Ok(())
}

// ── Rendering ─────────────────────────────────────────────────────────────────

pub fn render_status(client: &NadClient, state: &DeviceState) -> String {
    format!(
        "Model:      {}\nEndpoint:   {}\nPower:      {}\nVolume:     {} dB\nSource:     {}\nMute:       {}\nBrightness: {}\n",
        state.model,
        client.endpoint(),
        state.power,
        format_volume(state.volume),
        state.source,
        state.mute,
        state.brightness
    )
}

pub fn render_sources(current: Option<Source>) -> String {
    Source::ALL
        .iter()
        .map(|s| {
            let marker = if Some(*s) == current { "*" } else { " " };
            format!("{marker} {s}\n")
        })
        .collect()
}

pub fn render_devices(devices: &[DiscoveredDevice], from_cache: bool) -> String {
    if devices.is_empty() {
        return "No NAD receivers found\n".to_string();
    }
    let mut out = String::new();
    for device in devices {
        out.push_str(&format!("{:<22} {}\n", device.endpoint().to_string(), device.model));
    }
    if from_cache {
        out.push_str("(from cache; use --refresh to rescan)\n");
    }
    out
}

fn render_cache(ctx: &Context, record: &CacheRecord, now: DateTime<Utc>) -> String {
    let captured: DateTime<Local> = record.timestamp.into();
    let mut out = format!(
        "Cache:    {}\nCaptured: {} ({}s ago)\nTTL:      {}s ({})\n",
        ctx.cache.path().display(),
        captured.format("%Y-%m-%d %H:%M:%S"),
        record.age(now).as_secs(),
        record.ttl().as_secs(),
        if record.is_fresh(now) { "fresh" } else { "stale" }
    );
    out.push_str(&render_devices(&record.devices, false));
    out
}

pub fn render_playback(playback: Option<&Playback>) -> String {
    let Some(playback) = playback else {
        return "Nothing playing\n".to_string();
    };
    let state = if playback.is_playing { "Playing" } else { "Paused" };
    let mut out = match &playback.item {
        Some(track) if track.artists.is_empty() => format!("{state}: {}\n", track.name),
        Some(track) => format!("{state}: {} by {}\n", track.name, track.artist_line()),
        None => format!("{state}\n"),
    };
    if let Some(device) = &playback.device {
        out.push_str(&format!("Device: {} ({})\n", device.name, device.device_type));
    }
    out
}
