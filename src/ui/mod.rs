//! Turns store state into Stream Deck draw messages.
//!
//! Pixel drawing happens on the host. Keys get titles, state indices and
//! the album art data URL; strips get `$B1` feedback values.

pub mod keys;
pub mod layout;
pub mod utils;

use crate::app::config::{ActionKind, DialAction, RatingMode};
use crate::app::state::{ContextEntry, StateStore};
use crate::artwork::Artwork;
use crate::player::{PlaybackState, RepeatMode, Track};
use crate::transport::protocol::Outbound;
use std::sync::Arc;
use tokio::time::Instant;

/// Accent used while paused.
pub const DARK_GRAY: &str = "#555555";

/// One consistent read of the store for a render pass.
#[derive(Debug, Clone)]
pub struct ViewModel {
    pub playback: PlaybackState,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub progress: f64,
    pub rating: u8,
    pub volume: u8,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub track: Option<Arc<Track>>,
    pub album_track_count: Option<u32>,
    pub artwork: Option<Arc<Artwork>>,
    pub accent: String,
    pub text_color: String,
}

impl ViewModel {
    pub fn capture(store: &StateStore, now: Instant) -> Self {
        let session = store.session();
        let accent = if session.playback == PlaybackState::Paused {
            DARK_GRAY.to_string()
        } else {
            store.accent()
        };
        Self {
            playback: session.playback,
            position_ms: store.displayed_position(now),
            duration_ms: session.duration_ms,
            progress: store.progress(now),
            rating: session.rating,
            volume: store.player.volume,
            shuffle: store.player.shuffle,
            repeat: store.player.repeat,
            track: session.track.clone(),
            album_track_count: session.album_track_count,
            artwork: session.artwork.clone(),
            accent,
            text_color: store.global.text_color().to_string(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.playback == PlaybackState::Stopped
    }
}

/// Builds the frame for one context and returns only what differs from
/// the last frame sent to it.
pub fn render_context(view: &ViewModel, context: &str, entry: &mut ContextEntry) -> Vec<Outbound> {
    let mut frame = match entry.kind {
        ActionKind::Strip => match &entry.overlay {
            Some(overlay) => vec![layout::overlay(context, &overlay.title, &overlay.value)],
            None => vec![layout::feedback(view, context, &entry.settings)],
        },
        kind => keys::render(view, context, kind, entry),
    };

    if frame == entry.last_render {
        return Vec::new();
    }
    entry.last_render = frame.clone();

    if entry.kind == ActionKind::Strip && entry.layout != Some(layout::STRIP_LAYOUT) {
        entry.layout = Some(layout::STRIP_LAYOUT);
        frame.insert(0, Outbound::set_feedback_layout(context, layout::STRIP_LAYOUT));
    }
    frame
}

/// Overlay text for a dial turn.
pub fn dial_overlay(action: DialAction, view: &ViewModel, ticks: i32, rating_mode: RatingMode) -> Option<(String, String)> {
    match action {
        DialAction::None => None,
        DialAction::Skip if ticks > 0 => Some(("NEXT".into(), "▶▶".into())),
        DialAction::Skip => Some(("PREVIOUS".into(), "◀◀".into())),
        DialAction::Volume => Some(("VOLUME".into(), format!("{}%", view.volume))),
        DialAction::Rating => Some((
            "RATING".into(),
            utils::format_rating(view.rating, rating_mode),
        )),
    }
}

/// Title shown on a next/previous key while hold-to-seek runs.
pub fn hold_frame(context: &str, direction: i64, frame: u32, step_ms: u64) -> Outbound {
    let seconds = (frame as u64 + 1) * step_ms / 1000;
    let title = if direction > 0 {
        format!("▶▶\n+{}s", seconds)
    } else {
        format!("◀◀\n-{}s", seconds)
    };
    Outbound::set_title(context, &title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::protocol::Settings;
    use std::time::Duration;

    fn store_with(action: &str) -> StateStore {
        let mut store = StateStore::new(Duration::from_secs(2));
        store.contexts.add("ctx", action, Settings::new());
        store
    }

    #[test]
    fn test_identical_frames_not_resent() {
        let now = Instant::now();
        let mut store = store_with("com.ampdeck.rating");
        let view = ViewModel::capture(&store, now);
        let entry = store.contexts.get_mut("ctx").unwrap();

        let first = render_context(&view, "ctx", entry);
        assert_eq!(first, vec![Outbound::set_title("ctx", "No Track")]);
        assert!(render_context(&view, "ctx", entry).is_empty());

        entry.invalidate();
        assert_eq!(render_context(&view, "ctx", entry).len(), 1);
    }

    #[test]
    fn test_strip_sends_layout_once() {
        let now = Instant::now();
        let mut store = store_with("com.ampdeck.strip");
        let mut view = ViewModel::capture(&store, now);
        let entry = store.contexts.get_mut("ctx").unwrap();

        let first = render_context(&view, "ctx", entry);
        assert_eq!(first[0], Outbound::set_feedback_layout("ctx", layout::STRIP_LAYOUT));
        assert_eq!(first.len(), 2);

        view.progress = 40.0;
        view.playback = PlaybackState::Playing;
        let second = render_context(&view, "ctx", entry);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].event, "setFeedback");
    }

    #[test]
    fn test_paused_dims_accent() {
        let now = Instant::now();
        let mut store = store_with("com.ampdeck.strip");
        store.apply_timeline(PlaybackState::Paused, 0, 1000, now);
        assert_eq!(ViewModel::capture(&store, now).accent, DARK_GRAY);
        store.apply_timeline(PlaybackState::Playing, 0, 1000, now);
        assert_eq!(
            ViewModel::capture(&store, now).accent,
            crate::app::config::settings::DEFAULT_ACCENT
        );
    }

    #[test]
    fn test_hold_frame_titles() {
        assert_eq!(hold_frame("n", 1, 0, 10_000), Outbound::set_title("n", "▶▶\n+10s"));
        assert_eq!(hold_frame("p", -1, 2, 10_000), Outbound::set_title("p", "◀◀\n-30s"));
    }
}
