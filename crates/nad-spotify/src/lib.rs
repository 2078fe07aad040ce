//! Minimal Spotify Web API client: list devices, read playback, and drive
//! the player. Enough to steer a Spotify Connect stream into the receiver.

mod client;
mod error;
mod model;

pub use client::{Credentials, SpotifyClient, ACCOUNTS_BASE_URL, API_BASE_URL};
pub use error::{Result, SpotifyError};
pub use model::{Device, Playback, Track};
