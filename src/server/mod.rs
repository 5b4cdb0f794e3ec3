pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::contact::ContactRelay;
use crate::error::Result;
use crate::spotify::SpotifyClient;

/// Shared, read-only state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub spotify: Arc<SpotifyClient>,
    pub contact: Arc<ContactRelay>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let spotify = SpotifyClient::new(&config.spotify)?;
        let relay_client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            spotify: Arc::new(spotify),
            contact: Arc::new(ContactRelay::new(relay_client, &config.contact_relay_url)),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/spotify/login", get(routes::spotify_login))
        .route("/api/spotify/callback", get(routes::spotify_callback))
        .route("/api/spotify/now-playing", get(routes::now_playing))
        .route("/api/spotify/recent", get(routes::recent))
        .route("/api/projects", get(routes::list_projects))
        .route("/api/projects/featured", get(routes::featured_projects))
        .route("/api/projects/:slug", get(routes::project_detail))
        .route("/api/contact", post(routes::contact))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config) -> Result<()> {
    for key in config.get_missing_config() {
        warn!(
            "{} is not set; Spotify endpoints will fail until it is. Visit /api/spotify/login to obtain one.",
            key
        );
    }

    let app = create_app(AppState::from_config(config)?);
    let listener = TcpListener::bind(config.bind_addr).await?;

    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
