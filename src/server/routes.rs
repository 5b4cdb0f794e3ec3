use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::contact::{ContactForm, SubmitOutcome};
use crate::content::projects::{self, Project, ProjectStatus, ProjectTag};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::spotify::{NowPlaying, RECENT_PAGE_SIZE, RecentTrack};

pub async fn health() -> &'static str {
    "OK"
}

pub async fn spotify_login(State(state): State<AppState>) -> Result<Redirect> {
    let url = state.spotify.tokens().authorize_url()?;
    Ok(Redirect::temporary(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

pub async fn spotify_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(error) = params.error {
        return Err(AppError::BadRequest(error));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing code".into()))?;

    let tokens = state.spotify.tokens();
    let token = tokens.exchange_code(&code).await?;
    let post_auth_redirect = &tokens.config().post_auth_redirect;

    // A refresh token is only issued on the first authorization; later runs
    // go straight back to the site.
    match token.refresh_token {
        Some(refresh_token) => {
            info!("Spotify authorized; showing the new refresh token once");
            Ok(Html(refresh_token_page(&refresh_token, post_auth_redirect)).into_response())
        }
        None => {
            info!("Spotify re-authorized without a new refresh token");
            Ok(Redirect::temporary(post_auth_redirect).into_response())
        }
    }
}

pub async fn now_playing(State(state): State<AppState>) -> Result<Json<NowPlaying>> {
    Ok(Json(state.spotify.now_playing().await?))
}

pub async fn recent(State(state): State<AppState>) -> Result<Json<Vec<RecentTrack>>> {
    Ok(Json(state.spotify.recently_played(RECENT_PAGE_SIZE).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    status: Option<String>,
    tag: Option<String>,
}

pub async fn list_projects(Query(query): Query<ProjectQuery>) -> Result<Json<Vec<&'static Project>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .transpose()?;
    let tag = query.tag.as_deref().map(str::parse::<ProjectTag>).transpose()?;

    Ok(Json(projects::filter(projects::all(), status, tag)))
}

pub async fn featured_projects() -> Json<Vec<&'static Project>> {
    Json(projects::featured(projects::all()))
}

pub async fn project_detail(Path(slug): Path<String>) -> Result<Json<&'static Project>> {
    projects::by_slug(&slug)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("project {}", slug)))
}

pub async fn contact(
    State(state): State<AppState>,
    body: std::result::Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(form) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let outcome = state.contact.submit(&form).await?;
    // Bots get the same answer as people.
    if outcome == SubmitOutcome::Suppressed {
        info!("Contact form answered without relaying");
    }
    Ok(Json(json!({ "ok": true })))
}

fn refresh_token_page(refresh_token: &str, post_auth_redirect: &str) -> String {
    let token = escape_html(refresh_token);
    let back = escape_html(post_auth_redirect);
    format!(
        r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>Spotify Connected</title></head>
  <body style="font-family: system-ui; padding: 24px;">
    <h1>Spotify connected.</h1>
    <p>Copy this refresh token into <code>.env</code> as <code>SPOTIFY_REFRESH_TOKEN</code>, then restart the server.</p>
    <pre style="padding: 12px; background: #111; color: #0f0; overflow:auto;">{token}</pre>
    <p>After you paste it, go back to <a href="{back}">{back}</a>.</p>
  </body>
</html>"#
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
