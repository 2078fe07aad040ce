use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Restricted devices may report no id.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceList {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
}

/// Currently playing item. Podcast episodes carry no artists or album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    pub fn artist_line(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub device: Option<Device>,
    #[serde(default)]
    pub item: Option<Track>,
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_playback_with_episode_item() {
        let json = r#"{
            "is_playing": true,
            "progress_ms": 1200,
            "device": {"id": "abc", "name": "Living Room", "type": "AVR", "is_active": true, "volume_percent": 40},
            "item": {"name": "Episode 12", "duration_ms": 3600000}
        }"#;
        let playback: Playback = serde_json::from_str(json).unwrap();
        assert!(playback.is_playing);
        let item = playback.item.unwrap();
        assert_eq!(item.name, "Episode 12");
        assert_eq!(item.artist_line(), "");
        assert_eq!(playback.device.unwrap().device_type, "AVR");
    }

    #[test]
    fn joins_artists() {
        let track = Track {
            name: "Song".into(),
            artists: vec![Artist { name: "A".into() }, Artist { name: "B".into() }],
            album: None,
            duration_ms: 0,
        };
        assert_eq!(track.artist_line(), "A, B");
    }
}
