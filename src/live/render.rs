use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::live::poller::{LiveState, Phase};

/// How many history entries make it onto the screen.
pub const RECENT_DISPLAY_LIMIT: usize = 8;

/// "just now", "5m ago", "3h ago", "2d ago"; empty when the timestamp is unreadable.
pub fn time_ago(played_at: &str, now: DateTime<Utc>) -> String {
    let Ok(played) = DateTime::parse_from_rfc3339(played_at) else {
        return String::new();
    };

    let mins = (now - played.with_timezone(&Utc)).num_minutes();
    if mins < 1 {
        return "just now".to_string();
    }
    if mins < 60 {
        return format!("{}m ago", mins);
    }

    let hrs = mins / 60;
    if hrs < 24 {
        return format!("{}h ago", hrs);
    }

    format!("{}d ago", hrs / 24)
}

pub fn render(state: &LiveState, now: DateTime<Utc>) -> String {
    if !state.has_data() {
        if let Some(error) = &state.error {
            return format!("Spotify isn't available right now. ({})", error)
                .yellow()
                .to_string();
        }
        if state.phase != Phase::Degraded {
            return "Loading Spotify...".dimmed().to_string();
        }
    }

    let mut lines = Vec::new();

    lines.push(format!("{}  {}", "Now playing".bold(), "Live".green()));
    match &state.now_playing {
        Some(np) if np.is_playing && np.track.is_some() => {
            let track = np.track.as_deref().unwrap_or_default();
            match &np.song_url {
                Some(url) => lines.push(format!("  {} {}", track.cyan(), url.dimmed())),
                None => lines.push(format!("  {}", track.cyan())),
            }
            if let Some(artist) = np.artist.as_deref().filter(|a| !a.is_empty()) {
                lines.push(format!("  {}", artist));
            }
        }
        _ => {
            lines.push("  Nothing playing right now.".to_string());
            lines.push(
                "  (Pro tip: press play and my site becomes a billboard.)"
                    .dimmed()
                    .to_string(),
            );
        }
    }

    lines.push(String::new());
    lines.push("Recent rotation".bold().to_string());
    match state.recent.as_deref() {
        Some(recent) if !recent.is_empty() => {
            for entry in recent.iter().take(RECENT_DISPLAY_LIMIT) {
                lines.push(format!(
                    "  {} - {}  {}",
                    entry.track.cyan(),
                    entry.artist,
                    time_ago(&entry.played_at, now).dimmed()
                ));
            }
        }
        _ => lines.push("  Nothing in the recent list yet.".to_string()),
    }

    lines.push(String::new());
    if let Some(error) = &state.error {
        lines.push(
            format!("Showing the last update; latest refresh failed ({})", error)
                .yellow()
                .to_string(),
        );
    }
    lines.push("Updated about every 15 seconds.".dimmed().to_string());

    lines.join("\n")
}
