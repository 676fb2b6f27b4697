use crate::artwork::Artwork;
use crate::player::{PlaybackState, RepeatMode, Track};
use std::sync::Arc;
use tokio::time::Instant;

/// Keeps a position inside the track. A zero duration is not yet known and
/// bounds nothing above.
pub fn clamp_to_track(position_ms: i64, duration_ms: u64) -> u64 {
    let position = position_ms.max(0) as u64;
    if duration_ms > 0 {
        position.min(duration_ms)
    } else {
        position
    }
}

/// Everything tied to the current playback session. Reset as one block.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub track: Option<Arc<Track>>,
    /// Identity the latest snapshot reported; may run ahead of `track`
    /// while its metadata loads.
    pub timeline_key: Option<String>,
    pub playback: PlaybackState,
    pub position_ms: u64,
    pub position_at: Option<Instant>,
    pub duration_ms: u64,
    /// Displayed rating, 0..=10.
    pub rating: u8,
    pub album_track_count: Option<u32>,
    pub art_path: Option<String>,
    pub artwork: Option<Arc<Artwork>>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.track.is_none()
            && self.timeline_key.is_none()
            && self.playback == PlaybackState::Stopped
            && self.position_ms == 0
            && self.artwork.is_none()
    }

    pub fn track_key(&self) -> Option<&str> {
        self.track.as_deref().map(|t| t.rating_key.as_str())
    }

    pub fn clamp_position(&self, position_ms: i64) -> u64 {
        clamp_to_track(position_ms, self.duration_ms)
    }

    /// While playing the stored position is extrapolated from its timestamp;
    /// otherwise it is shown as-is.
    pub fn displayed_position(&self, now: Instant, sync_offset_ms: i64) -> u64 {
        match (self.playback, self.position_at) {
            (PlaybackState::Playing, Some(at)) => {
                let elapsed = now.saturating_duration_since(at).as_millis() as i64;
                self.clamp_position(self.position_ms as i64 + elapsed + sync_offset_ms)
            }
            _ => self.position_ms,
        }
    }
}

/// Device-level state that outlives a session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub volume: u8,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    /// Needed to relay commands through the server.
    pub machine_identifier: Option<String>,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            volume: 50,
            shuffle: false,
            repeat: RepeatMode::Off,
            machine_identifier: None,
        }
    }
}
