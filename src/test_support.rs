//! In-process stand-ins for the Spotify services and the contact relay,
//! served by axum on ephemeral ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::config::SpotifyConfig;
use crate::spotify::TokenPolicy;

/// base64("id:secret")
const EXPECTED_BASIC: &str = "Basic aWQ6c2VjcmV0";
const EXPECTED_BEARER: &str = "Bearer access-1";

/// Serves `router` on 127.0.0.1 and returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn spotify_config(accounts_url: &str, api_url: &str) -> SpotifyConfig {
    SpotifyConfig {
        client_id: "id".into(),
        client_secret: "secret".into(),
        redirect_uri: "http://127.0.0.1:3000/api/spotify/callback".into(),
        post_auth_redirect: "/now".into(),
        refresh_token: "refresh-stored".into(),
        accounts_url: accounts_url.into(),
        api_url: api_url.into(),
        token_policy: TokenPolicy::RefreshEveryCall,
    }
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: Option<Value>,
}

impl IntoResponse for Canned {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

struct FakeState {
    token_calls: AtomicUsize,
    api_calls: AtomicUsize,
    last_token_form: Mutex<HashMap<String, String>>,
    recent_limit: Mutex<Option<String>>,
    now_playing: Mutex<Canned>,
    recent: Mutex<Canned>,
}

/// Accounts service plus the two player endpoints of the Web API.
pub struct FakeSpotify {
    base_url: String,
    state: Arc<FakeState>,
}

impl FakeSpotify {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState {
            token_calls: AtomicUsize::new(0),
            api_calls: AtomicUsize::new(0),
            last_token_form: Mutex::new(HashMap::new()),
            recent_limit: Mutex::new(None),
            now_playing: Mutex::new(Canned {
                status: StatusCode::NO_CONTENT,
                body: None,
            }),
            recent: Mutex::new(Canned {
                status: StatusCode::OK,
                body: Some(json!({ "items": [] })),
            }),
        });

        let router = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me/player/currently-playing", get(currently_playing))
            .route("/v1/me/player/recently-played", get(recently_played))
            .with_state(state.clone());

        Self {
            base_url: spawn(router).await,
            state,
        }
    }

    pub fn config(&self) -> SpotifyConfig {
        spotify_config(&self.base_url, &format!("{}/v1", self.base_url))
    }

    pub fn set_now_playing(&self, status: StatusCode, body: Option<Value>) {
        *self.state.now_playing.lock().unwrap() = Canned { status, body };
    }

    pub fn set_recent(&self, status: StatusCode, body: Option<Value>) {
        *self.state.recent.lock().unwrap() = Canned { status, body };
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.state.api_calls.load(Ordering::SeqCst)
    }

    pub fn last_token_form(&self) -> HashMap<String, String> {
        self.state.last_token_form.lock().unwrap().clone()
    }

    pub fn recent_limit(&self) -> Option<String> {
        self.state.recent_limit.lock().unwrap().clone()
    }
}

async fn token(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_token_form.lock().unwrap() = form.clone();

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if authorization != Some(EXPECTED_BASIC) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    let mut body = json!({
        "access_token": "access-1",
        "token_type": "Bearer",
        "scope": "user-read-currently-playing user-read-recently-played",
        "expires_in": 3600
    });

    // The accounts service only issues a refresh token on first authorization.
    let first_authorization = form.get("grant_type").map(String::as_str)
        == Some("authorization_code")
        && form.get("code").map(String::as_str) != Some("repeat-code");
    if first_authorization {
        body["refresh_token"] = json!("refresh-new");
    }

    Json(body).into_response()
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(EXPECTED_BEARER)
}

async fn currently_playing(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let canned = state.now_playing.lock().unwrap().clone();
    canned.into_response()
}

async fn recently_played(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    *state.recent_limit.lock().unwrap() = query.get("limit").cloned();
    let canned = state.recent.lock().unwrap().clone();
    canned.into_response()
}

/// Form relay that records every submission.
pub struct FakeRelay {
    pub url: String,
    submissions: Arc<Mutex<Vec<Value>>>,
}

impl FakeRelay {
    pub async fn start(status: StatusCode) -> Self {
        let submissions = Arc::new(Mutex::new(Vec::new()));
        let recorded = submissions.clone();

        let router = Router::new().route(
            "/f/test-form",
            post(move |Json(body): Json<Value>| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(body);
                    (status, Json(json!({ "ok": status.is_success() })))
                }
            }),
        );

        let base = spawn(router).await;
        Self {
            url: format!("{}/f/test-form", base),
            submissions,
        }
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.submissions.lock().unwrap().clone()
    }
}
