//! Terminal UI for NAD receivers.
//!
//! Key presses and device results go through a pure reducer ([`state`]); the
//! device itself is driven by a single worker task fed from a coalescing
//! queue, so a held volume key never floods the receiver.

pub mod app;
pub mod log_buffer;
pub mod message;
pub mod queue;
pub mod spotify;
pub mod state;
pub mod theme;
pub mod views;
pub mod widgets;
pub mod worker;

pub use app::{run, App};
pub use log_buffer::{LogBuffer, LogBufferLayer, LogEntry, LOG_CAPACITY};
pub use message::{DeviceOp, Effect, Severity, SpotifyCommand, UiMessage};
pub use queue::CommandQueue;
pub use state::{UiEvent, UiSettings, UiState, View};
pub use worker::{Worker, WorkerSettings};
