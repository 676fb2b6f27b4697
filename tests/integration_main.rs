use ampdeck::app::config::UserConfig;
use ampdeck::app::events::{AppEvent, EventReceiver};
use ampdeck::app::App;
use ampdeck::error::{RemoteError, RemoteResult};
use ampdeck::player::{
    MediaInfo, PlaybackState, PlayerCommand, RemoteClient, RepeatMode, ServerConfig, Snapshot, Track,
};
use ampdeck::transport::{ConnectionState, Dialer, Endpoint, SocketLink, TransportEvent};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const UUID: &str = "plugin-uuid";

#[derive(Default)]
struct FakeRemote {
    snapshot: Mutex<Option<Snapshot>>,
    configured: Mutex<Option<ServerConfig>>,
    commands: Mutex<Vec<PlayerCommand>>,
    metadata_calls: Mutex<Vec<String>>,
    timeline_calls: Mutex<usize>,
    ratings: Mutex<Vec<(String, u8)>>,
}

impl FakeRemote {
    fn commands(&self) -> Vec<PlayerCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    fn configure(&self, config: ServerConfig) {
        *self.configured.lock().unwrap() = Some(config);
    }

    async fn fetch_timeline(&self) -> RemoteResult<Option<Snapshot>> {
        *self.timeline_calls.lock().unwrap() += 1;
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn fetch_metadata(&self, rating_key: &str) -> RemoteResult<Option<Track>> {
        self.metadata_calls.lock().unwrap().push(rating_key.to_string());
        Ok(Some(Track {
            rating_key: rating_key.to_string(),
            parent_rating_key: Some("album-1".into()),
            title: "Song".into(),
            parent_title: "Album".into(),
            grandparent_title: "Artist".into(),
            user_rating: 6,
            duration_ms: 200_000,
            index: Some(3),
            media: Some(MediaInfo {
                codec: Some("flac".into()),
                bitrate: Some(1411),
            }),
            thumb: Some("/thumb/1".into()),
            ..Default::default()
        }))
    }

    async fn fetch_child_count(&self, _parent_key: &str) -> RemoteResult<Option<u32>> {
        Ok(Some(12))
    }

    async fn fetch_art(&self, _path: &str) -> RemoteResult<Vec<u8>> {
        Err(RemoteError::NotConfigured("art"))
    }

    async fn player_command(&self, command: PlayerCommand, _target: Option<&str>) -> RemoteResult<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }

    async fn rate(&self, rating_key: &str, rating: u8, _target: Option<&str>) -> RemoteResult<()> {
        self.ratings.lock().unwrap().push((rating_key.to_string(), rating));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeDialer {
    links: Arc<Mutex<Vec<SocketLink>>>,
}

impl Dialer for FakeDialer {
    fn dial(&self, link: SocketLink) -> JoinHandle<()> {
        self.links.lock().unwrap().push(link);
        tokio::spawn(async {})
    }
}

fn playing_snapshot() -> Snapshot {
    Snapshot {
        state: PlaybackState::Playing,
        position_ms: 30_000,
        duration_ms: 200_000,
        rating_key: Some("100".into()),
        volume: Some(50),
        shuffle: false,
        repeat: RepeatMode::Off,
        machine_identifier: Some("player-1".into()),
    }
}

struct Harness {
    app: App,
    rx: EventReceiver,
    remote: Arc<FakeRemote>,
    dialer: FakeDialer,
}

impl Harness {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = Arc::new(FakeRemote::default());
        *remote.snapshot.lock().unwrap() = Some(playing_snapshot());
        let dialer = FakeDialer::default();
        let mut app = App::new(remote.clone(), Box::new(dialer.clone()), tx, &UserConfig::default());
        app.connect(Endpoint {
            port: 28196,
            uuid: UUID.into(),
            register_event: "registerPlugin".into(),
        });
        Self {
            app,
            rx,
            remote,
            dialer,
        }
    }

    fn generation(&self) -> u64 {
        self.app.transport().generation()
    }

    fn open(&mut self) {
        let generation = self.generation();
        self.app.handle_event(
            AppEvent::Transport(TransportEvent::Opened { generation }),
            Instant::now(),
        );
    }

    fn deliver(&mut self, message: Value) {
        let generation = self.generation();
        self.app.handle_event(
            AppEvent::Transport(TransportEvent::Message {
                generation,
                text: message.to_string(),
            }),
            Instant::now(),
        );
    }

    /// Lets spawned tasks finish and feeds everything they report back
    /// into the app, without moving the clock.
    async fn settle(&mut self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
            while let Ok(event) = self.rx.try_recv() {
                self.app.handle_event(event, Instant::now());
            }
        }
    }

    /// Everything written to the live socket since the last call.
    fn sent(&self) -> Vec<Value> {
        let mut links = self.dialer.links.lock().unwrap();
        let Some(link) = links.last_mut() else {
            return Vec::new();
        };
        let mut messages = Vec::new();
        while let Ok(text) = link.outbound.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    fn appear(&mut self, context: &str, action: &str, settings: Value) {
        self.deliver(json!({
            "event": "willAppear",
            "action": action,
            "context": context,
            "payload": { "settings": settings }
        }));
    }

    fn key(&mut self, event: &str, context: &str) {
        self.deliver(json!({ "event": event, "action": "a", "context": context }));
    }

    async fn running(action: &str) -> Self {
        let mut harness = Self::new();
        harness.open();
        harness.appear("ctx", action, json!({}));
        harness.settle().await;
        harness.sent();
        harness
    }
}

fn titles_for<'a>(messages: &'a [Value], context: &str) -> Vec<&'a str> {
    messages
        .iter()
        .filter(|m| m["event"] == "setTitle" && m["context"] == context)
        .filter_map(|m| m["payload"]["title"].as_str())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_open_registers_and_requests_global_settings() {
    let mut harness = Harness::new();
    assert_eq!(harness.app.transport().state(), ConnectionState::Connecting);
    harness.open();

    let sent = harness.sent();
    assert_eq!(sent[0], json!({ "event": "registerPlugin", "uuid": UUID }));
    assert_eq!(sent[1], json!({ "event": "getGlobalSettings", "context": UUID }));
}

#[tokio::test(start_paused = true)]
async fn test_will_appear_polls_and_renders_track() {
    let mut harness = Harness::new();
    harness.open();
    harness.sent();
    harness.appear("info", "com.ampdeck.info", json!({}));
    harness.settle().await;

    assert!(harness.app.scheduler().is_running());
    let track = harness.app.store.track().expect("track loaded");
    assert_eq!(track.rating_key, "100");
    assert_eq!(harness.app.store.session().rating, 6);

    let sent = harness.sent();
    let titles = titles_for(&sent, "info");
    assert_eq!(titles.last(), Some(&"FLAC\n1411 kbps\nTRACK\n3/12"));
}

#[tokio::test(start_paused = true)]
async fn test_same_track_not_refetched() {
    let mut harness = Harness::running("com.ampdeck.time").await;
    tokio::time::sleep(Duration::from_millis(2100)).await;
    harness.settle().await;

    assert_eq!(harness.remote.metadata_calls.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_global_keys_promoted_and_saved() {
    let mut harness = Harness::new();
    harness.open();
    harness.sent();
    harness.appear(
        "strip",
        "com.ampdeck.strip",
        json!({ "plexServerUrl": "http://nas:32400", "plexToken": "tok", "displayMode": "album" }),
    );

    let sent = harness.sent();
    let saved = sent
        .iter()
        .find(|m| m["event"] == "setGlobalSettings")
        .expect("global settings saved");
    assert_eq!(saved["context"], UUID);
    assert_eq!(saved["payload"]["plexToken"], "tok");
    assert!(saved["payload"].get("displayMode").is_none());

    let configured = harness.remote.configured.lock().unwrap().clone().unwrap();
    assert_eq!(configured.server_url.as_deref(), Some("http://nas:32400"));
}

#[tokio::test(start_paused = true)]
async fn test_tap_toggles_playback_optimistically() {
    let mut harness = Harness::running("com.ampdeck.play-pause").await;
    harness.key("keyDown", "ctx");
    harness.key("keyUp", "ctx");
    harness.settle().await;

    assert_eq!(harness.remote.commands(), vec![PlayerCommand::Pause]);
    assert_eq!(harness.app.store.session().playback, PlaybackState::Paused);
    let sent = harness.sent();
    assert!(sent
        .iter()
        .any(|m| m["event"] == "setState" && m["payload"]["state"] == 0));
}

#[tokio::test(start_paused = true)]
async fn test_quick_tap_on_next_skips() {
    let mut harness = Harness::running("com.ampdeck.next").await;
    harness.key("keyDown", "ctx");
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.key("keyUp", "ctx");
    harness.settle().await;

    assert_eq!(harness.remote.commands(), vec![PlayerCommand::SkipNext]);
}

#[tokio::test(start_paused = true)]
async fn test_hold_on_next_seeks_without_skipping() {
    let mut harness = Harness::running("com.ampdeck.next").await;
    harness.key("keyDown", "ctx");
    tokio::time::sleep(Duration::from_millis(450)).await;
    harness.settle().await;
    assert!(harness.app.holds().is_animating("ctx"));

    harness.key("keyUp", "ctx");
    harness.settle().await;

    let commands = harness.remote.commands();
    assert!(commands.iter().any(|c| matches!(c, PlayerCommand::SeekTo(_))));
    assert!(!commands.contains(&PlayerCommand::SkipNext));

    let sent = harness.sent();
    let titles = titles_for(&sent, "ctx");
    assert_eq!(titles.first(), Some(&"▶▶\n+10s"));
    assert_eq!(titles.last(), Some(&""));
}

#[tokio::test(start_paused = true)]
async fn test_dial_volume_shows_overlay() {
    let mut harness = Harness::new();
    harness.open();
    harness.appear("strip", "com.ampdeck.strip", json!({ "dialAction": "volume" }));
    harness.settle().await;
    harness.sent();

    harness.deliver(json!({
        "event": "dialRotate",
        "action": "com.ampdeck.strip",
        "context": "strip",
        "payload": { "ticks": 2, "pressed": false }
    }));
    harness.settle().await;

    assert_eq!(harness.remote.commands(), vec![PlayerCommand::SetVolume(60)]);
    let sent = harness.sent();
    let overlay = sent
        .iter()
        .find(|m| m["event"] == "setFeedback")
        .expect("overlay sent");
    assert_eq!(overlay["payload"], json!({ "title": "VOLUME", "value": "60%" }));

    tokio::time::sleep(Duration::from_millis(1600)).await;
    harness.settle().await;
    assert!(!harness.app.store.contexts.has_overlay("strip"));
}

#[tokio::test(start_paused = true)]
async fn test_huge_dial_rotation_clamps() {
    let mut harness = Harness::new();
    harness.open();
    harness.appear("strip", "com.ampdeck.strip", json!({ "dialAction": "rating" }));
    harness.settle().await;

    harness.deliver(json!({
        "event": "dialRotate",
        "action": "com.ampdeck.strip",
        "context": "strip",
        "payload": { "ticks": i32::MAX, "pressed": false }
    }));
    assert_eq!(harness.app.store.session().rating, 10);
}

#[tokio::test(start_paused = true)]
async fn test_session_end_clears_display() {
    let mut harness = Harness::running("com.ampdeck.rating").await;
    assert!(harness.app.store.track().is_some());

    *harness.remote.snapshot.lock().unwrap() = None;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    harness.settle().await;

    assert!(harness.app.store.track().is_none());
    assert_eq!(harness.app.store.session().playback, PlaybackState::Stopped);
    let sent = harness.sent();
    assert_eq!(titles_for(&sent, "ctx").last(), Some(&"No Track"));
}

#[tokio::test(start_paused = true)]
async fn test_session_end_cancels_pending_rating() {
    let mut harness = Harness::running("com.ampdeck.rating").await;
    harness.key("keyDown", "ctx");
    harness.key("keyUp", "ctx");
    assert_eq!(harness.app.store.session().rating, 7);
    assert!(harness.app.executor().rating_write_pending());

    *harness.remote.snapshot.lock().unwrap() = None;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    harness.settle().await;
    assert!(harness.app.store.track().is_none());
    assert!(!harness.app.executor().rating_write_pending());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    harness.settle().await;
    assert!(harness.remote.ratings.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rating_written_once_after_debounce() {
    let mut harness = Harness::running("com.ampdeck.rating").await;
    harness.key("keyDown", "ctx");
    harness.key("keyUp", "ctx");

    tokio::time::sleep(Duration::from_millis(2100)).await;
    harness.settle().await;
    assert_eq!(*harness.remote.ratings.lock().unwrap(), vec![("100".to_string(), 7)]);
}

#[tokio::test(start_paused = true)]
async fn test_disappear_during_hold_stops_seeking() {
    let mut harness = Harness::running("com.ampdeck.next").await;
    harness.key("keyDown", "ctx");
    tokio::time::sleep(Duration::from_millis(450)).await;
    harness.settle().await;
    assert!(harness.app.holds().is_animating("ctx"));
    let seeks_before = harness.remote.commands().len();
    assert!(seeks_before > 0);

    harness.deliver(json!({ "event": "willDisappear", "action": "a", "context": "ctx" }));
    assert_eq!(harness.app.holds().phase("ctx"), None);

    tokio::time::sleep(Duration::from_secs(2)).await;
    harness.settle().await;
    assert_eq!(harness.remote.commands().len(), seeks_before);
}

#[tokio::test(start_paused = true)]
async fn test_configured_global_settings_poll_immediately() {
    let mut harness = Harness::new();
    harness.open();
    harness.deliver(json!({
        "event": "didReceiveGlobalSettings",
        "payload": { "settings": { "debugMode": true } }
    }));
    harness.settle().await;
    assert_eq!(*harness.remote.timeline_calls.lock().unwrap(), 0);

    harness.deliver(json!({
        "event": "didReceiveGlobalSettings",
        "payload": { "settings": { "plexServerUrl": "http://nas:32400", "plexToken": "tok" } }
    }));
    harness.settle().await;
    assert_eq!(*harness.remote.timeline_calls.lock().unwrap(), 1);
    assert!(harness.app.store.track().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_last_context_gone_stops_loops() {
    let mut harness = Harness::running("com.ampdeck.time").await;
    assert!(harness.app.scheduler().is_running());
    harness.deliver(json!({ "event": "willDisappear", "action": "a", "context": "ctx" }));
    assert!(!harness.app.scheduler().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_lost_connection_redials_after_backoff() {
    let mut harness = Harness::new();
    harness.open();
    let generation = harness.generation();
    harness.app.handle_event(
        AppEvent::Transport(TransportEvent::Closed {
            generation,
            reason: "host restarted".into(),
        }),
        Instant::now(),
    );
    assert_eq!(harness.app.transport().pending_reconnect(), Some(Duration::from_secs(3)));

    tokio::time::sleep(Duration::from_millis(3100)).await;
    harness.settle().await;
    assert_eq!(harness.dialer.links.lock().unwrap().len(), 2);
    assert_eq!(harness.app.transport().state(), ConnectionState::Connecting);
}
