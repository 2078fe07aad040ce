//! `nadctl`: command-line, TUI launcher and MCP front-ends for NAD receivers.

pub mod cli;
pub mod commands;
pub mod endpoint;
pub mod logging;
pub mod mcp;

pub use cli::Cli;
pub use endpoint::Context;
pub use mcp::McpServer;

/// Taxonomy tag for an error that reached `main`, if it came from a library.
pub fn error_tag(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<nad_core::NadError>() {
        return Some(e.tag());
    }
    err.downcast_ref::<nad_spotify::SpotifyError>().map(|e| e.tag())
}
