pub mod config;
pub mod contact;
pub mod content;
pub mod error;
pub mod live;
pub mod server;
pub mod spotify;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{AppError, Result};
pub use live::{HttpLiveSource, LivePoller};
pub use spotify::{SpotifyClient, TokenManager};
