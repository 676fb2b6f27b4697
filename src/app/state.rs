//! The single mutable source of truth. Owned by the event loop; every
//! multi-field change is one method here.

pub mod contexts;
pub mod session;

pub use contexts::{ContextEntry, ContextRegistry, Overlay};
pub use session::{clamp_to_track, PlayerStatus, SessionData};

use super::config::GlobalSettings;
use super::pending::{Attribute, Correlation, PendingWrites};
use crate::artwork::Artwork;
use crate::player::{PlaybackState, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct StateStore {
    session: SessionData,
    pub player: PlayerStatus,
    pending: PendingWrites,
    pub contexts: ContextRegistry,
    pub global: GlobalSettings,
    position_revision: u64,
    volume_guard: Duration,
}

impl StateStore {
    pub fn new(volume_guard: Duration) -> Self {
        Self {
            session: SessionData::default(),
            player: PlayerStatus::default(),
            pending: PendingWrites::default(),
            contexts: ContextRegistry::default(),
            global: GlobalSettings::default(),
            position_revision: 0,
            volume_guard,
        }
    }

    pub fn session(&self) -> &SessionData {
        &self.session
    }

    pub fn track(&self) -> Option<&Arc<Track>> {
        self.session.track.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.session.playback != PlaybackState::Stopped
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Replaces the track wholesale. The displayed rating starts from the
    /// server value; pending writes are layered on by the reconciler.
    pub fn set_track(&mut self, track: Track) -> Arc<Track> {
        let parent_changed = self
            .session
            .track
            .as_deref()
            .map(|t| t.parent_rating_key != track.parent_rating_key)
            .unwrap_or(true);
        if parent_changed {
            self.session.album_track_count = None;
        }
        if self.session.duration_ms == 0 {
            self.session.duration_ms = track.duration_ms;
        }
        self.session.rating = track.user_rating;
        let track = Arc::new(track);
        self.session.track = Some(Arc::clone(&track));
        track
    }

    pub fn set_timeline_key(&mut self, key: Option<String>) {
        self.session.timeline_key = key;
    }

    /// Takes a polled playback sample as the new anchor.
    pub fn apply_timeline(&mut self, playback: PlaybackState, position_ms: u64, duration_ms: u64, now: Instant) {
        self.session.playback = playback;
        if duration_ms > 0 {
            self.session.duration_ms = duration_ms;
        }
        self.set_position(position_ms, now);
    }

    /// Resets track, playback, position, art, accent, album count, rating
    /// and the rating cache in one step. Returns false when there was
    /// nothing to clear.
    pub fn clear_session(&mut self) -> bool {
        let rating_cached = self.has_pending_ratings();
        if self.session.is_empty() && !rating_cached {
            return false;
        }
        self.session = SessionData::default();
        self.pending.clear_attribute(Attribute::Rating);
        self.position_revision += 1;
        true
    }

    // ------------------------------------------------------------------
    // Position
    // ------------------------------------------------------------------

    /// Clamps to `[0, duration]`. Returns the new position revision.
    pub fn set_position(&mut self, position_ms: u64, now: Instant) -> u64 {
        self.session.position_ms = self.session.clamp_position(position_ms as i64);
        self.session.position_at = Some(now);
        self.position_revision += 1;
        self.position_revision
    }

    pub fn position_revision(&self) -> u64 {
        self.position_revision
    }

    /// Changes playback state, re-anchoring the position so the displayed
    /// value does not jump.
    pub fn set_playback(&mut self, playback: PlaybackState, now: Instant) {
        let position = self.session.displayed_position(now, 0);
        self.session.position_ms = position;
        self.session.position_at = Some(now);
        self.session.playback = playback;
    }

    pub fn displayed_position(&self, now: Instant) -> u64 {
        self.session
            .displayed_position(now, self.global.sync_offset_ms())
    }

    /// 0.0..=100.0
    pub fn progress(&self, now: Instant) -> f64 {
        if self.session.duration_ms == 0 {
            return 0.0;
        }
        (self.displayed_position(now) as f64 / self.session.duration_ms as f64 * 100.0).min(100.0)
    }

    // ------------------------------------------------------------------
    // Rating
    // ------------------------------------------------------------------

    /// Records a local rating and shows it if it is for the current track.
    pub fn set_pending_rating(&mut self, rating_key: &str, rating: u8, now: Instant) {
        self.pending.record(
            Attribute::Rating,
            Correlation::Item(rating_key.to_string()),
            rating,
            now,
        );
        if self.session.track_key() == Some(rating_key) {
            self.session.rating = rating;
        }
    }

    pub fn pending_rating(&self, rating_key: &str) -> Option<u8> {
        self.pending
            .get(Attribute::Rating, &Correlation::Item(rating_key.to_string()))
            .map(|w| w.value)
    }

    pub fn clear_pending_rating(&mut self, rating_key: &str) {
        self.pending
            .clear(Attribute::Rating, &Correlation::Item(rating_key.to_string()));
    }

    pub fn has_pending_ratings(&self) -> bool {
        self.pending
            .iter()
            .any(|(attribute, _)| attribute == Attribute::Rating)
    }

    pub fn set_rating(&mut self, rating: u8) {
        self.session.rating = rating.min(10);
    }

    // ------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------

    /// Applies a locally-commanded volume and opens the guard window.
    /// Returns the guard's sequence number for a later rollback.
    pub fn set_local_volume(&mut self, volume: u8, now: Instant) -> u64 {
        self.player.volume = volume.min(100);
        self.pending
            .record(Attribute::Volume, Correlation::Global, self.player.volume, now)
    }

    /// Polled volume is taken only once the guard window has passed.
    pub fn offer_polled_volume(&mut self, volume: u8, now: Instant) -> bool {
        if self
            .pending
            .guarded(Attribute::Volume, &Correlation::Global, now, self.volume_guard)
        {
            return false;
        }
        self.player.volume = volume.min(100);
        true
    }

    /// Restores `previous` unless a newer volume command owns the guard.
    pub fn rollback_volume(&mut self, previous: u8, seq: u64) -> bool {
        let owns_guard = self
            .pending
            .get(Attribute::Volume, &Correlation::Global)
            .is_some_and(|w| w.seq == seq);
        if !owns_guard {
            return false;
        }
        self.player.volume = previous;
        self.pending.clear(Attribute::Volume, &Correlation::Global);
        true
    }

    // ------------------------------------------------------------------
    // Follow-up data
    // ------------------------------------------------------------------

    /// Marks `path` as the art the session wants; returns true if it differs
    /// from the previous request.
    pub fn request_art(&mut self, path: Option<&str>) -> bool {
        if self.session.art_path.as_deref() == path {
            return false;
        }
        self.session.art_path = path.map(str::to_string);
        if path.is_none() {
            self.session.artwork = None;
        }
        true
    }

    /// Ignored if the session has moved on to other art.
    pub fn set_artwork(&mut self, path: &str, artwork: Option<Arc<Artwork>>) -> bool {
        if self.session.art_path.as_deref() != Some(path) {
            return false;
        }
        self.session.artwork = artwork;
        true
    }

    pub fn set_album_track_count(&mut self, parent_key: &str, count: Option<u32>) -> bool {
        let current_parent = self
            .session
            .track
            .as_deref()
            .and_then(|t| t.parent_rating_key.as_deref());
        if current_parent != Some(parent_key) {
            return false;
        }
        self.session.album_track_count = count;
        true
    }

    /// Accent colour for the current art, honouring `dynamicColors`.
    pub fn accent(&self) -> String {
        match &self.session.artwork {
            Some(art) if self.global.dynamic_colors() => art.accent.clone(),
            _ => crate::app::config::settings::DEFAULT_ACCENT.to_string(),
        }
    }
}
