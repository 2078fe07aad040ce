//! Tracing setup per front-end.

use std::path::PathBuf;

use nad_core::platform;
use nad_tui::LogBuffer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where log output goes.
pub enum LogTarget {
    /// One-shot commands: stderr, quiet unless `--debug`.
    Stderr,
    /// Long-running front-ends that own stdout or the terminal. The optional
    /// buffer feeds the TUI's Logs view.
    File { name: &'static str, buffer: Option<LogBuffer> },
}

fn default_filter(debug: bool, to_file: bool) -> &'static str {
    match (debug, to_file) {
        (true, _) => "debug,hyper=info,reqwest=info",
        (false, true) => "info",
        (false, false) => "warn",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default level.
/// Returns the log file path when logging to a file.
pub fn init(target: LogTarget, debug: bool) -> anyhow::Result<Option<PathBuf>> {
    let to_file = matches!(target, LogTarget::File { .. });
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug, to_file)));

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .with(filter)
                .try_init()?;
            Ok(None)
        }
        LogTarget::File { name, buffer } => {
            let data_dir = platform::data_dir();
            std::fs::create_dir_all(&data_dir)?;
            let log_path = data_dir.join(format!("{name}.log"));
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?;

            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .with(buffer.map(|b| b.layer()))
                .with(filter)
                .try_init()?;
            Ok(Some(log_path))
        }
    }
}
