pub mod cli;
pub mod config;
pub mod events;
pub mod input_handler;
pub mod pending;
pub mod state;

use crate::artwork::Artwork;
use crate::commands::CommandExecutor;
use crate::error::RemoteResult;
use crate::gesture::{GestureEffect, HoldTracker};
use crate::logging::LogHandle;
use crate::player::{RemoteClient, Snapshot, Track};
use crate::reconcile::{self, MetadataOutcome, SnapshotOutcome};
use crate::scheduler::Scheduler;
use crate::transport::{Backoff, Dialer, Endpoint, Transport};
use crate::ui::{self, ViewModel};
use config::{Timing, UserConfig};
use events::{AppEvent, EventReceiver, EventSender};
use state::StateStore;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The plugin: owns every piece of mutable state and reacts to one event
/// at a time.
pub struct App {
    pub store: StateStore,
    transport: Transport,
    remote: Arc<dyn RemoteClient>,
    executor: CommandExecutor,
    scheduler: Scheduler,
    holds: HoldTracker,
    events: EventSender,
    timing: Timing,
    log: Option<LogHandle>,
}

impl App {
    pub fn new(remote: Arc<dyn RemoteClient>, dialer: Box<dyn Dialer>, events: EventSender, config: &UserConfig) -> Self {
        let timing = config.timing;
        let backoff = Backoff::new(timing.reconnect_base(), timing.reconnect_max());
        Self {
            store: StateStore::new(timing.volume_guard()),
            transport: Transport::new(dialer, events.clone(), backoff),
            executor: CommandExecutor::new(Arc::clone(&remote), events.clone(), timing),
            scheduler: Scheduler::new(timing),
            holds: HoldTracker::new(timing),
            remote,
            events,
            timing,
            log: None,
        }
    }

    pub fn with_logging(mut self, log: LogHandle) -> Self {
        self.log = Some(log);
        self
    }

    pub fn connect(&mut self, endpoint: Endpoint) {
        self.transport.connect(endpoint);
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn holds(&self) -> &HoldTracker {
        &self.holds
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Drives the app until shutdown or until every sender is gone.
    pub async fn run(mut self, mut rx: EventReceiver) {
        while let Some(event) = rx.recv().await {
            if !self.handle_event(event, Instant::now()) {
                break;
            }
        }
        info!("Event loop finished");
    }

    /// Returns false once the app should stop.
    pub fn handle_event(&mut self, event: AppEvent, now: Instant) -> bool {
        match event {
            AppEvent::Transport(event) => {
                let was_open = self.transport.is_open();
                let inbound = self.transport.handle_event(event);
                if !was_open && self.transport.is_open() {
                    self.store.contexts.invalidate_all();
                }
                if let Some(inbound) = inbound {
                    self.handle_inbound(inbound, now);
                }
            }
            AppEvent::PollTick => self.poll(),
            AppEvent::RenderTick => self.render_all(now),
            AppEvent::Timeline(result) => self.on_timeline(result, now),
            AppEvent::Metadata { rating_key, result } => self.on_metadata(&rating_key, result, now),
            AppEvent::ChildCount { parent_key, count } => {
                if self.store.set_album_track_count(&parent_key, count) {
                    self.render_all(now);
                }
            }
            AppEvent::Artwork { path, art } => {
                if self.store.set_artwork(&path, art) {
                    self.render_all(now);
                }
            }
            AppEvent::CommandFailed {
                command,
                rollback,
                error,
            } => {
                self.executor
                    .on_command_failed(&mut self.store, command, rollback, &error, now);
                self.render_all(now);
            }
            AppEvent::RatingDue { rating_key, rating } => {
                self.executor.on_rating_due(&self.store, rating_key, rating);
            }
            AppEvent::HoldThreshold { context, press } => {
                let position = self.store.displayed_position(now);
                let duration = self.store.session().duration_ms;
                let effects = self
                    .holds
                    .on_threshold(&context, press, position, duration, &self.events);
                self.apply_gesture(&context, effects, now);
            }
            AppEvent::HoldRepeat { context, press } => {
                let duration = self.store.session().duration_ms;
                let effects = self.holds.on_repeat(&context, press, duration);
                self.apply_gesture(&context, effects, now);
            }
            AppEvent::OverlayExpired { context, serial } => {
                if self.store.contexts.expire_overlay(&context, serial) {
                    self.render_context(&context, now);
                }
            }
            AppEvent::Shutdown => {
                info!("Shutting down");
                self.scheduler.stop();
                self.transport.close();
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Poll chain: timeline, then metadata when the identity changed.
    // ------------------------------------------------------------------

    fn poll(&mut self) {
        if !self.scheduler.begin_poll() {
            return;
        }
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = remote.fetch_timeline().await;
            let _ = events.send(AppEvent::Timeline(result));
        });
    }

    fn on_timeline(&mut self, result: RemoteResult<Option<Snapshot>>, now: Instant) {
        let outcome = match result {
            Ok(snapshot) => Some(reconcile::apply_snapshot(&mut self.store, snapshot, now)),
            Err(e) => reconcile::apply_poll_error(&mut self.store, &e),
        };
        match outcome {
            Some(SnapshotOutcome::LoadTrack(key)) | Some(SnapshotOutcome::ProbeRating(key)) => {
                self.fetch_metadata(key);
            }
            Some(SnapshotOutcome::NoSession { cleared: true }) => {
                self.executor.cancel_rating();
                self.scheduler.finish_poll();
                self.render_all(now);
            }
            _ => self.scheduler.finish_poll(),
        }
    }

    fn fetch_metadata(&self, rating_key: String) {
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = remote.fetch_metadata(&rating_key).await;
            let _ = events.send(AppEvent::Metadata { rating_key, result });
        });
    }

    fn on_metadata(&mut self, rating_key: &str, result: RemoteResult<Option<Track>>, now: Instant) {
        self.scheduler.finish_poll();
        let track = match result {
            Ok(track) => track,
            Err(e) => {
                warn!("Metadata for {} unavailable: {}", rating_key, e);
                return;
            }
        };
        match reconcile::apply_metadata(&mut self.store, rating_key, track) {
            MetadataOutcome::Discarded => {}
            MetadataOutcome::RatingReconciled { .. } => self.render_all(now),
            MetadataOutcome::Loaded {
                fetch_children,
                fetch_art,
            } => {
                if let Some(parent_key) = fetch_children {
                    self.fetch_child_count(parent_key);
                }
                if let Some(path) = fetch_art {
                    self.fetch_artwork(path);
                }
                self.render_all(now);
            }
        }
    }

    fn fetch_child_count(&self, parent_key: String) {
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        tokio::spawn(async move {
            let count = match remote.fetch_child_count(&parent_key).await {
                Ok(count) => count,
                Err(e) => {
                    debug!("Album track count unavailable: {}", e);
                    None
                }
            };
            let _ = events.send(AppEvent::ChildCount { parent_key, count });
        });
    }

    fn fetch_artwork(&self, path: String) {
        let remote = Arc::clone(&self.remote);
        let events = self.events.clone();
        tokio::spawn(async move {
            let art = match remote.fetch_art(&path).await {
                Ok(bytes) => Artwork::load(bytes).await,
                Err(e) => Err(e),
            };
            let art = match art {
                Ok(art) => Some(Arc::new(art)),
                Err(e) => {
                    warn!("Album art {} unavailable: {}", path, e);
                    None
                }
            };
            let _ = events.send(AppEvent::Artwork { path, art });
        });
    }

    // ------------------------------------------------------------------
    // Hold gesture
    // ------------------------------------------------------------------

    fn apply_gesture(&mut self, context: &str, effects: Vec<GestureEffect>, now: Instant) {
        for effect in effects {
            match effect {
                GestureEffect::Seek(position) => {
                    self.executor.seek_to(&mut self.store, position as i64, now);
                }
                GestureEffect::Animate { frame } => {
                    let Some(direction) = self.store.contexts.kind(context).and_then(|k| k.seek_direction())
                    else {
                        continue;
                    };
                    let title = ui::hold_frame(context, direction, frame, self.timing.seek_step_ms);
                    self.transport.send(&title);
                    if let Some(entry) = self.store.contexts.get_mut(context) {
                        entry.invalidate();
                    }
                }
                GestureEffect::Settle => {
                    if let Some(entry) = self.store.contexts.get_mut(context) {
                        entry.invalidate();
                    }
                    self.render_context(context, now);
                }
                GestureEffect::Tap(kind) => self.tap(context, kind, now),
            }
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Refreshes every context except those showing an overlay or a seek
    /// animation.
    pub fn render_all(&mut self, now: Instant) {
        if !self.transport.is_open() {
            return;
        }
        let view = ViewModel::capture(&self.store, now);
        for (context, entry) in self.store.contexts.iter_mut() {
            if entry.overlay.is_some() || self.holds.is_animating(context) {
                continue;
            }
            for message in ui::render_context(&view, context, entry) {
                self.transport.send(&message);
            }
        }
    }

    fn render_context(&mut self, context: &str, now: Instant) {
        if !self.transport.is_open() || self.holds.is_animating(context) {
            return;
        }
        let view = ViewModel::capture(&self.store, now);
        let Some(entry) = self.store.contexts.get_mut(context) else {
            return;
        };
        for message in ui::render_context(&view, context, entry) {
            self.transport.send(&message);
        }
    }
}
