use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use portfolio_site::content::projects::{self, ProjectStatus, ProjectTag};
use portfolio_site::live::{self, HttpLiveSource, LivePoller};
use portfolio_site::{Config, TokenManager, server};

#[derive(Parser)]
#[command(name = "portfolio-site")]
#[command(about = "Portfolio site backend with live Spotify status")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// Follow the live Spotify status of a running site
    Watch {
        /// Base URL of the site (or set SITE_URL env var)
        #[arg(long, env = "SITE_URL", default_value = "http://127.0.0.1:3000")]
        site_url: String,

        /// Seconds between polls
        #[arg(long, default_value_t = live::TICK_INTERVAL.as_secs())]
        interval: u64,
    },

    /// List projects from the catalogue
    Projects {
        /// Only projects with this status (e.g. "in progress")
        #[arg(long)]
        status: Option<String>,

        /// Only projects carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Show the landing-page selection instead
        #[arg(long, conflicts_with_all = ["status", "tag"])]
        featured: bool,
    },

    /// Print the Spotify authorization URL
    LoginUrl,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = Config::from_env().context("Failed to load configuration")?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            server::serve(&config).await.context("Server failed")?;
        }
        Commands::Watch { site_url, interval } => {
            watch(&site_url, Duration::from_secs(interval.max(1))).await?;
        }
        Commands::Projects {
            status,
            tag,
            featured,
        } => {
            list_projects(status.as_deref(), tag.as_deref(), featured)?;
        }
        Commands::LoginUrl => {
            let config = Config::from_env().context("Failed to load configuration")?;
            let tokens = TokenManager::new(reqwest::Client::new(), config.spotify);
            println!("{}", tokens.authorize_url()?);
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn watch(site_url: &str, interval: Duration) -> Result<()> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let poller = LivePoller::mount(HttpLiveSource::new(http_client, site_url), interval);
    let mut updates = poller.subscribe();

    println!("{}", format!("Watching {}", site_url).cyan().bold());
    println!("{}", "=".repeat(50));

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.phase == live::Phase::Loading {
                    continue;
                }
                println!("\n{}", live::render(&state, Utc::now()));
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    poller.unmount();
    Ok(())
}

fn list_projects(status: Option<&str>, tag: Option<&str>, featured: bool) -> Result<()> {
    let catalogue = projects::all();
    let selected = if featured {
        println!("{}", "Featured projects".cyan().bold());
        projects::featured(catalogue)
    } else {
        let status = status.map(str::parse::<ProjectStatus>).transpose()?;
        let tag = tag.map(str::parse::<ProjectTag>).transpose()?;
        println!("{}", "Projects".cyan().bold());
        projects::filter(catalogue, status, tag)
    };
    println!("{}", "=".repeat(50));

    if selected.is_empty() {
        println!("{}", "No projects found".yellow());
        return Ok(());
    }

    for (i, project) in selected.iter().enumerate() {
        let tags: Vec<String> = project.tags.iter().map(ToString::to_string).collect();
        println!(
            "{:2}. {} [{}] {}",
            i + 1,
            project.title.green(),
            project.status,
            tags.join(", ").dimmed()
        );
        println!("     {}", project.summary);
        println!("     /projects/{}", project.slug.cyan());
    }

    println!("\n{}", format!("Total: {} projects", selected.len()).cyan());
    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Portfolio Site Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify App".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://127.0.0.1:3000/api/spotify/callback' as a redirect URI");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://127.0.0.1:3000/api/spotify/callback");
    println!("   - Optional:");
    println!("     SPOTIFY_POST_AUTH_REDIRECT=/now");
    println!("     SPOTIFY_TOKEN_CACHE=false");
    println!("     BIND_ADDR=127.0.0.1:3000");
    println!("     CONTACT_RELAY_URL=https://formspree.io/f/<form id>");

    println!("\n{}", "3. Refresh Token".yellow());
    println!("   - portfolio-site serve");
    println!("   - Open http://127.0.0.1:3000/api/spotify/login and approve access");
    println!("   - Copy the refresh token shown into .env as SPOTIFY_REFRESH_TOKEN");
    println!("   - Restart the server");

    println!("\n{}", "4. Usage".yellow());
    println!("   - portfolio-site serve                  (run the site backend)");
    println!("   - portfolio-site watch                  (follow the live Spotify status)");
    println!("   - portfolio-site projects --featured    (landing-page projects)");
    println!("   - portfolio-site login-url              (print the authorization URL)");

    println!("\n{}", "Ready to go!".green());
}
