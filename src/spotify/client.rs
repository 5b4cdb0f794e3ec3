use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::SpotifyConfig;
use crate::error::{AppError, Result};
use crate::spotify::auth::TokenManager;
use crate::spotify::models::{CurrentlyPlaying, NowPlaying, RecentTrack, RecentlyPlayed};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SpotifyClient {
    http_client: Client,
    tokens: TokenManager,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http_client(http_client, config.clone()))
    }

    pub fn with_http_client(http_client: Client, config: SpotifyConfig) -> Self {
        let api_url = config.api_url.clone();
        Self {
            tokens: TokenManager::new(http_client.clone(), config),
            http_client,
            api_url,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Bearer-authenticated GET against the Web API. `Ok(None)` means the API
    /// answered 204, which it uses for "nothing to report".
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let access_token = self.tokens.access_token().await?;

        let response = self
            .http_client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("Spotify returned no content for {}", path);
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamApi {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(response.json().await?))
    }

    pub async fn now_playing(&self) -> Result<NowPlaying> {
        let data = self
            .get::<CurrentlyPlaying>("/me/player/currently-playing")
            .await?;
        let snapshot = NowPlaying::from_api(data);

        if snapshot.is_playing {
            info!(
                "Now playing: {} - {}",
                snapshot.track.as_deref().unwrap_or_default(),
                snapshot.artist.as_deref().unwrap_or_default()
            );
        }

        Ok(snapshot)
    }

    pub async fn recently_played(&self, limit: u32) -> Result<Vec<RecentTrack>> {
        let page = self
            .get::<RecentlyPlayed>(&format!("/me/player/recently-played?limit={}", limit))
            .await?;
        let tracks = RecentTrack::from_page(page);

        debug!("Fetched {} recently played tracks", tracks.len());
        Ok(tracks)
    }
}
