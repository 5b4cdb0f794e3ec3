use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::spotify::{NowPlaying, RecentTrack};

/// One tick every 15 seconds, whatever happened on the previous one.
pub const TICK_INTERVAL: Duration = Duration::from_secs(15);

/// Where the poller gets its two views from.
#[async_trait]
pub trait LiveSource: Send + Sync {
    async fn now_playing(&self) -> Result<NowPlaying>;
    async fn recent(&self) -> Result<Vec<RecentTrack>>;
}

/// Reads the site's own `/api/spotify/*` endpoints.
pub struct HttpLiveSource {
    http_client: Client,
    base_url: String,
}

impl HttpLiveSource {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, name: &'static str) -> Result<T> {
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("{} answered {}", path, response.status());
            return Err(AppError::EndpointUnavailable(name));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LiveSource for HttpLiveSource {
    async fn now_playing(&self) -> Result<NowPlaying> {
        self.fetch("/api/spotify/now-playing", "now-playing").await
    }

    async fn recent(&self) -> Result<Vec<RecentTrack>> {
        self.fetch("/api/spotify/recent", "recent").await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Degraded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    pub phase: Phase,
    pub now_playing: Option<NowPlaying>,
    pub recent: Option<Vec<RecentTrack>>,
    pub error: Option<String>,
}

impl LiveState {
    pub fn has_data(&self) -> bool {
        self.now_playing.is_some() || self.recent.is_some()
    }

    fn begin_tick(&mut self) {
        self.phase = Phase::Loading;
        self.error = None;
    }

    /// A tick lands both views or neither; on failure the previous ones stay.
    fn apply(&mut self, outcome: Result<(NowPlaying, Vec<RecentTrack>)>) {
        match outcome {
            Ok((now_playing, recent)) => {
                self.phase = Phase::Ready;
                self.now_playing = Some(now_playing);
                self.recent = Some(recent);
                self.error = None;
            }
            Err(e) => {
                warn!("Live status tick failed: {}", e);
                self.phase = Phase::Degraded;
                self.error = Some(e.to_string());
            }
        }
    }
}

/// Mounted flag. Teardown and state writes take the same lock, so once
/// [`Liveness::kill`] returns no write can land.
#[derive(Debug)]
pub(crate) struct Liveness(Mutex<bool>);

impl Liveness {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(true))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_alive(&self) -> bool {
        *self.lock()
    }

    pub(crate) fn kill(&self) {
        *self.lock() = false;
    }

    /// Runs `f` under the lock if still mounted.
    pub(crate) fn while_alive(&self, f: impl FnOnce()) -> bool {
        let alive = self.lock();
        if *alive {
            f();
        }
        *alive
    }
}

/// Background poller. Dropping it (or calling [`LivePoller::unmount`]) tears
/// it down; responses still in flight at that point are thrown away.
pub struct LivePoller {
    state: watch::Receiver<LiveState>,
    alive: Arc<Liveness>,
    task: JoinHandle<()>,
}

impl LivePoller {
    /// Starts polling right away, then once per `interval`.
    pub fn mount<S: LiveSource + 'static>(source: S, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(LiveState::default());
        let alive = Arc::new(Liveness::new());
        let task = tokio::spawn(run(Arc::new(source), tx, alive.clone(), interval));

        Self {
            state: rx,
            alive,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> LiveState {
        self.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.alive.is_alive()
    }

    pub fn unmount(self) {}
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.alive.kill();
        self.task.abort();
    }
}

async fn run<S: LiveSource>(
    source: Arc<S>,
    state: watch::Sender<LiveState>,
    alive: Arc<Liveness>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while alive.is_alive() {
        ticker.tick().await;
        tick(source.as_ref(), &state, &alive).await;
    }
}

/// One poll cycle. Both endpoints are requested concurrently.
pub(crate) async fn tick<S: LiveSource + ?Sized>(
    source: &S,
    state: &watch::Sender<LiveState>,
    alive: &Liveness,
) {
    if !alive.while_alive(|| state.send_modify(LiveState::begin_tick)) {
        return;
    }

    let (now_playing, recent) = tokio::join!(source.now_playing(), source.recent());

    let outcome = now_playing.and_then(|n| recent.map(|r| (n, r)));
    if !alive.while_alive(|| state.send_modify(|s| s.apply(outcome))) {
        debug!("Poller torn down mid-tick, dropping responses");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::{Barrier, Notify};

    fn playing(track: &str) -> NowPlaying {
        NowPlaying {
            is_playing: true,
            track: Some(track.to_string()),
            artist: Some("Artist".to_string()),
            ..Default::default()
        }
    }

    fn recent_track(track: &str) -> RecentTrack {
        RecentTrack {
            track: track.to_string(),
            artist: "Artist".to_string(),
            song_url: None,
            album_art_url: None,
            played_at: "2024-05-01T12:00:00.000Z".to_string(),
        }
    }

    #[derive(Default)]
    struct ScriptedSource {
        now_playing: Mutex<VecDeque<Result<NowPlaying>>>,
        recent: Mutex<VecDeque<Result<Vec<RecentTrack>>>>,
    }

    impl ScriptedSource {
        fn push(&self, now_playing: Result<NowPlaying>, recent: Result<Vec<RecentTrack>>) {
            self.now_playing.lock().unwrap().push_back(now_playing);
            self.recent.lock().unwrap().push_back(recent);
        }
    }

    #[async_trait]
    impl LiveSource for ScriptedSource {
        async fn now_playing(&self) -> Result<NowPlaying> {
            self.now_playing
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AppError::EndpointUnavailable("now-playing")))
        }

        async fn recent(&self) -> Result<Vec<RecentTrack>> {
            self.recent
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AppError::EndpointUnavailable("recent")))
        }
    }

    /// Holds `now_playing` open until the test releases it.
    struct GatedSource {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl LiveSource for GatedSource {
        async fn now_playing(&self) -> Result<NowPlaying> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(playing("Too Late"))
        }

        async fn recent(&self) -> Result<Vec<RecentTrack>> {
            Ok(vec![recent_track("Too Late")])
        }
    }

    #[tokio::test]
    async fn test_http_source_reads_site_endpoints() {
        use crate::contact::ContactRelay;
        use crate::server::{AppState, create_app};
        use crate::spotify::SpotifyClient;
        use crate::test_support::{self, FakeSpotify};
        use axum::http::StatusCode;

        let fake = FakeSpotify::start().await;
        let state = AppState {
            spotify: Arc::new(SpotifyClient::new(&fake.config()).unwrap()),
            contact: Arc::new(ContactRelay::new(Client::new(), "http://127.0.0.1:9")),
        };
        let site = test_support::spawn(create_app(state)).await;
        let source = HttpLiveSource::new(Client::new(), &format!("{}/", site));

        assert_eq!(source.now_playing().await.unwrap(), NowPlaying::inactive());
        assert!(source.recent().await.unwrap().is_empty());

        fake.set_now_playing(StatusCode::BAD_GATEWAY, None);
        match source.now_playing().await {
            Err(AppError::EndpointUnavailable(name)) => assert_eq!(name, "now-playing"),
            other => panic!("expected EndpointUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_successful_tick_is_ready() {
        let source = ScriptedSource::default();
        source.push(Ok(playing("Open Eye Signal")), Ok(vec![recent_track("Abandon Window")]));
        let (tx, rx) = watch::channel(LiveState::default());
        let alive = Liveness::new();

        tick(&source, &tx, &alive).await;

        let state = rx.borrow().clone();
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.now_playing, Some(playing("Open Eye Signal")));
        assert_eq!(state.recent.as_ref().map(Vec::len), Some(1));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_previous_data() {
        let source = ScriptedSource::default();
        source.push(Ok(playing("First")), Ok(vec![recent_track("First")]));
        source.push(
            Err(AppError::EndpointUnavailable("now-playing")),
            Ok(vec![recent_track("Second")]),
        );
        let (tx, rx) = watch::channel(LiveState::default());
        let alive = Liveness::new();

        tick(&source, &tx, &alive).await;
        tick(&source, &tx, &alive).await;

        let state = rx.borrow().clone();
        assert_eq!(state.phase, Phase::Degraded);
        assert_eq!(state.error.as_deref(), Some("now-playing endpoint not ready"));
        assert!(state.has_data());
        assert_eq!(state.now_playing, Some(playing("First")));
        assert_eq!(state.recent.unwrap()[0].track, "First");
    }

    #[tokio::test]
    async fn test_recent_failure_reported_when_now_playing_succeeds() {
        let source = ScriptedSource::default();
        source.push(Ok(playing("Only")), Err(AppError::EndpointUnavailable("recent")));
        let (tx, rx) = watch::channel(LiveState::default());
        let alive = Liveness::new();

        tick(&source, &tx, &alive).await;

        let state = rx.borrow().clone();
        assert_eq!(state.phase, Phase::Degraded);
        assert_eq!(state.error.as_deref(), Some("recent endpoint not ready"));
        assert!(!state.has_data());
    }

    #[tokio::test]
    async fn test_next_tick_recovers() {
        let source = ScriptedSource::default();
        source.push(Err(AppError::EndpointUnavailable("now-playing")), Ok(vec![]));
        source.push(Ok(NowPlaying::inactive()), Ok(vec![]));
        let (tx, rx) = watch::channel(LiveState::default());
        let alive = Liveness::new();

        tick(&source, &tx, &alive).await;
        assert_eq!(rx.borrow().phase, Phase::Degraded);

        tick(&source, &tx, &alive).await;
        let state = rx.borrow().clone();
        assert_eq!(state.phase, Phase::Ready);
        assert!(state.error.is_none());
        assert_eq!(state.now_playing, Some(NowPlaying::inactive()));
    }

    #[tokio::test]
    async fn test_both_requests_run_concurrently() {
        struct Rendezvous(Barrier);

        #[async_trait]
        impl LiveSource for Rendezvous {
            async fn now_playing(&self) -> Result<NowPlaying> {
                self.0.wait().await;
                Ok(NowPlaying::inactive())
            }

            async fn recent(&self) -> Result<Vec<RecentTrack>> {
                self.0.wait().await;
                Ok(Vec::new())
            }
        }

        let source = Rendezvous(Barrier::new(2));
        let (tx, rx) = watch::channel(LiveState::default());
        let alive = Liveness::new();

        tokio::time::timeout(Duration::from_secs(5), tick(&source, &tx, &alive))
            .await
            .expect("requests were issued one after the other");
        assert_eq!(rx.borrow().phase, Phase::Ready);
    }

    #[tokio::test]
    async fn test_teardown_mid_tick_discards_response() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let source = Arc::new(GatedSource {
            entered: entered.clone(),
            release: release.clone(),
        });
        let (tx, mut rx) = watch::channel(LiveState::default());
        let tx = Arc::new(tx);
        let alive = Arc::new(Liveness::new());

        let handle = {
            let (source, tx, alive) = (source.clone(), tx.clone(), alive.clone());
            tokio::spawn(async move { tick(source.as_ref(), &tx, &alive).await })
        };

        entered.notified().await;
        assert_eq!(rx.borrow_and_update().phase, Phase::Loading);

        alive.kill();
        release.notify_one();
        handle.await.unwrap();

        assert!(!rx.has_changed().unwrap(), "state mutated after teardown");
        assert!(rx.borrow().now_playing.is_none());
    }

    #[test]
    fn test_kill_waits_for_write_in_progress() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let alive = Arc::new(Liveness::new());
        let killed = Arc::new(AtomicBool::new(false));
        let mut killer = None;

        let ran = alive.while_alive(|| {
            let (alive, killed_flag) = (alive.clone(), killed.clone());
            killer = Some(std::thread::spawn(move || {
                alive.kill();
                killed_flag.store(true, Ordering::SeqCst);
            }));
            std::thread::sleep(Duration::from_millis(50));
            assert!(!killed.load(Ordering::SeqCst), "kill returned during a write");
        });
        assert!(ran);

        killer.unwrap().join().unwrap();
        assert!(killed.load(Ordering::SeqCst));
        assert!(!alive.is_alive());
        assert!(!alive.while_alive(|| panic!("write after kill")));
    }

    #[tokio::test]
    async fn test_mount_polls_immediately() {
        let source = ScriptedSource::default();
        source.push(Ok(playing("On Mount")), Ok(vec![]));
        let poller = LivePoller::mount(source, Duration::from_secs(3600));
        let mut rx = poller.subscribe();

        let state = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.phase == Phase::Ready),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert_eq!(state.now_playing, Some(playing("On Mount")));
        assert!(poller.is_mounted());
        assert_eq!(poller.snapshot(), state);
    }

    #[tokio::test]
    async fn test_unmount_stops_updates() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let poller = LivePoller::mount(
            GatedSource {
                entered: entered.clone(),
                release: release.clone(),
            },
            Duration::from_secs(3600),
        );
        let rx = poller.subscribe();

        entered.notified().await;
        poller.unmount();
        release.notify_one();
        tokio::task::yield_now().await;

        let state = rx.borrow().clone();
        assert_eq!(state.phase, Phase::Loading);
        assert!(!state.has_data());
    }
}
