pub mod auth;
pub mod client;
pub mod models;

pub use auth::{SCOPES, TokenManager, TokenPolicy};
pub use client::SpotifyClient;
pub use models::{NowPlaying, RECENT_PAGE_SIZE, RecentTrack, TokenResponse};
