use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::config::SpotifyConfig;
use crate::error::{AppError, Result};
use crate::spotify::models::TokenResponse;

pub const SCOPES: [&str; 2] = ["user-read-currently-playing", "user-read-recently-played"];

/// How access tokens are reused between authorized calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// Every authorized call performs its own refresh.
    #[default]
    RefreshEveryCall,
    /// Reuse the last token until `expires_in - margin` has elapsed.
    CacheUntilExpiry { margin: Duration },
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    valid_until: Instant,
}

pub struct TokenManager {
    http_client: Client,
    config: SpotifyConfig,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(http_client: Client, config: SpotifyConfig) -> Self {
        Self {
            http_client,
            config,
            cache: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Start of the authorization-code grant.
    pub fn authorize_url(&self) -> Result<Url> {
        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            &format!("{}/authorize", self.config.accounts_url),
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("show_dialog", "false"),
            ],
        )
        .map_err(|e| AppError::Config(format!("Invalid accounts URL: {}", e)))
    }

    /// One-time exchange of the code handed to the callback.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        info!("Exchanging authorization code for tokens");
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    pub async fn refresh(&self) -> Result<TokenResponse> {
        if self.config.refresh_token.is_empty() {
            return Err(AppError::MissingConfig("SPOTIFY_REFRESH_TOKEN".into()));
        }

        debug!("Refreshing Spotify access token");
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", self.config.refresh_token.as_str()),
        ])
        .await
    }

    /// Access token for one authorized call, according to the configured policy.
    pub async fn access_token(&self) -> Result<String> {
        let margin = match self.config.token_policy {
            TokenPolicy::RefreshEveryCall => return Ok(self.refresh().await?.access_token),
            TokenPolicy::CacheUntilExpiry { margin } => margin,
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.valid_until {
                debug!("Using cached Spotify access token");
                return Ok(cached.access_token.clone());
            }
            debug!("Cached Spotify access token expired. Evicting.");
        }

        let token = self.refresh().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(margin);
        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            valid_until: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        if self.config.client_id.is_empty() {
            return Err(AppError::MissingConfig("SPOTIFY_CLIENT_ID".into()));
        }
        if self.config.client_secret.is_empty() {
            return Err(AppError::MissingConfig("SPOTIFY_CLIENT_SECRET".into()));
        }

        let response = self
            .http_client
            .post(format!("{}/api/token", self.config.accounts_url))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamAuth { status, body });
        }

        Ok(response.json().await?)
    }
}
