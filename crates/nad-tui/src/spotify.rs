//! Runs Spotify commands off the UI loop and turns the results into messages.

use nad_spotify::SpotifyClient;
use tracing::warn;

use crate::message::{Severity, SpotifyCommand, UiMessage};

pub async fn execute(client: &SpotifyClient, cmd: SpotifyCommand) -> Vec<UiMessage> {
    match run(client, &cmd).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!("Spotify {:?} failed: {}", cmd, e);
            vec![UiMessage::note(Severity::Error, e.to_string())]
        }
    }
}

async fn run(client: &SpotifyClient, cmd: &SpotifyCommand) -> nad_spotify::Result<Vec<UiMessage>> {
    let mut out = Vec::new();
    match cmd {
        SpotifyCommand::RefreshDevices => {
            out.push(UiMessage::SpotifyDevices(client.devices().await?));
        }
        SpotifyCommand::RefreshPlayback => {
            out.push(UiMessage::SpotifyPlayback(client.playback().await?));
        }
        SpotifyCommand::PlayPause => {
            let playing = client.toggle_playback().await?;
            out.push(UiMessage::note(
                Severity::Info,
                if playing { "Spotify playing" } else { "Spotify paused" },
            ));
            out.push(UiMessage::SpotifyPlayback(client.playback().await?));
        }
        SpotifyCommand::Next => {
            client.next().await?;
            out.push(UiMessage::SpotifyPlayback(client.playback().await?));
        }
        SpotifyCommand::Previous => {
            client.previous().await?;
            out.push(UiMessage::SpotifyPlayback(client.playback().await?));
        }
        SpotifyCommand::Transfer(id) => {
            client.transfer(id, true).await?;
            out.push(UiMessage::note(Severity::Success, "Spotify playback transferred"));
            out.push(UiMessage::SpotifyDevices(client.devices().await?));
        }
    }
    Ok(out)
}
