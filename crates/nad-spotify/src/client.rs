use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SpotifyError};
use crate::model::{ApiErrorBody, Device, DeviceList, Playback, TokenResponse};

pub const API_BASE_URL: &str = "https://api.spotify.com";
pub const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Tokens are refreshed this long before Spotify says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

impl Credentials {
    fn can_refresh(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() || self.can_refresh()
    }
}

struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    accounts_base: String,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_urls(credentials, API_BASE_URL, ACCOUNTS_BASE_URL)
    }

    pub fn with_base_urls(
        credentials: Credentials,
        api_base: impl Into<String>,
        accounts_base: impl Into<String>,
    ) -> Self {
        // A static access token never expires from our point of view; a
        // refresh token takes over once the API rejects it.
        let token = credentials.access_token.clone().map(|value| CachedToken {
            value,
            expires_at: None,
        });
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            accounts_base: accounts_base.into().trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(token),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    pub async fn devices(&self) -> Result<Vec<Device>> {
        let resp = self.send(Method::GET, "/v1/me/player/devices", None).await?;
        let list: DeviceList = resp.json().await?;
        Ok(list.devices)
    }

    /// `None` when nothing is playing on any device.
    pub async fn playback(&self) -> Result<Option<Playback>> {
        let resp = self.send(Method::GET, "/v1/me/player", None).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body).map(Some).map_err(|e| SpotifyError::Api {
            status: 200,
            message: format!("unreadable playback state: {e}"),
        })
    }

    pub async fn play(&self) -> Result<()> {
        self.send(Method::PUT, "/v1/me/player/play", None).await?;
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Method::PUT, "/v1/me/player/pause", None).await?;
        Ok(())
    }

    pub async fn next(&self) -> Result<()> {
        self.send(Method::POST, "/v1/me/player/next", None).await?;
        Ok(())
    }

    pub async fn previous(&self) -> Result<()> {
        self.send(Method::POST, "/v1/me/player/previous", None).await?;
        Ok(())
    }

    /// Pause when playing, resume otherwise. Returns the new playing flag.
    pub async fn toggle_playback(&self) -> Result<bool> {
        let playing = self.playback().await?.map_or(false, |p| p.is_playing);
        if playing {
            self.pause().await?;
        } else {
            self.play().await?;
        }
        Ok(!playing)
    }

    /// Move playback to `device_id`, optionally starting it.
    pub async fn transfer(&self, device_id: &str, play: bool) -> Result<()> {
        let body = json!({ "device_ids": [device_id], "play": play });
        self.send(Method::PUT, "/v1/me/player", Some(body)).await?;
        info!("Transferred Spotify playback to {}", device_id);
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let token = self.access_token().await?;
        let resp = self.request(method.clone(), path, body.clone(), &token).await?;

        if resp.status() == StatusCode::UNAUTHORIZED && self.credentials.can_refresh() {
            debug!("Spotify token rejected, refreshing");
            *self.token.lock().await = None;
            let token = self.access_token().await?;
            let resp = self.request(method, path, body, &token).await?;
            return check_status(resp).await;
        }
        check_status(resp).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_base, path);
        debug!("Spotify {} {}", method, url);
        let mut req = self.http.request(method, &url).bearer_auth(token);
        req = match body {
            Some(body) => req.json(&body),
            // PUT/POST without a body still need a length for Spotify's frontend.
            None => req.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        Ok(req.send().await?)
    }

    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.value.clone());
        }
        if !self.credentials.can_refresh() {
            return match &self.credentials.access_token {
                Some(token) => Ok(token.clone()),
                None => Err(SpotifyError::NotConfigured),
            };
        }
        let fresh = self.refresh_access_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn refresh_access_token(&self) -> Result<CachedToken> {
        let (Some(id), Some(secret), Some(refresh)) = (
            &self.credentials.client_id,
            &self.credentials.client_secret,
            &self.credentials.refresh_token,
        ) else {
            return Err(SpotifyError::NotConfigured);
        };

        let url = format!("{}/api/token", self.accounts_base);
        let resp = self
            .http
            .post(&url)
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth(format!("{status}: {}", text.trim())));
        }
        let token: TokenResponse = resp.json().await?;
        debug!("Spotify token refreshed, valid for {}s", token.expires_in);
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Some(Instant::now() + lifetime),
        })
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(SpotifyError::Api {
        status: status.as_u16(),
        message,
    })
}
