#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("Spotify is not configured (set an access token or a refresh token with client id and secret)")]
    NotConfigured,

    #[error("Spotify request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the Web API.
    #[error("Spotify API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Spotify authorization failed: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, SpotifyError>;

impl SpotifyError {
    /// Taxonomy name printed by the CLI next to the message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotConfigured => "SpotifyNotConfigured",
            Self::Http(_) => "SpotifyHttp",
            Self::Api { .. } => "SpotifyApi",
            Self::Auth(_) => "SpotifyAuth",
        }
    }
}
