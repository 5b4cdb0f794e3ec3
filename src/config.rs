use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::spotify::TokenPolicy;

pub const DEFAULT_POST_AUTH_REDIRECT: &str = "/now";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CONTACT_RELAY_URL: &str = "https://formspree.io/f/xleqwdpy";

const TOKEN_CACHE_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub post_auth_redirect: String,
    /// Issued once by the first authorization; empty until copied into the environment.
    pub refresh_token: String,
    pub accounts_url: String,
    pub api_url: String,
    pub token_policy: TokenPolicy,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify: SpotifyConfig,
    pub bind_addr: SocketAddr,
    pub contact_relay_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Required keys are checked
    /// here so a misconfigured process never starts serving.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::MissingConfig(key.to_string()))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let token_policy = match lookup("SPOTIFY_TOKEN_CACHE").as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") | Some("off") => {
                TokenPolicy::RefreshEveryCall
            }
            Some("1") | Some("true") | Some("on") => TokenPolicy::CacheUntilExpiry {
                margin: TOKEN_CACHE_MARGIN,
            },
            Some(other) => {
                return Err(AppError::Config(format!(
                    "SPOTIFY_TOKEN_CACHE must be true or false, got {:?}",
                    other
                )));
            }
        };

        let spotify = SpotifyConfig {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            post_auth_redirect: optional("SPOTIFY_POST_AUTH_REDIRECT", DEFAULT_POST_AUTH_REDIRECT),
            refresh_token: lookup("SPOTIFY_REFRESH_TOKEN").unwrap_or_default(),
            accounts_url: trim_base(optional("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL)),
            api_url: trim_base(optional("SPOTIFY_API_URL", DEFAULT_API_URL)),
            token_policy,
        };

        let bind_addr = optional("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is not a socket address: {}", e)))?;

        Ok(Self {
            spotify,
            bind_addr,
            contact_relay_url: optional("CONTACT_RELAY_URL", DEFAULT_CONTACT_RELAY_URL),
        })
    }

    /// Settings that are allowed to be absent at startup but that some
    /// endpoints still need.
    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify.refresh_token.is_empty() {
            missing.push("SPOTIFY_REFRESH_TOKEN".to_string());
        }

        missing
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
