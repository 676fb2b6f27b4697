use crate::error::RemoteResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Plex reports `playing`, `paused`, `stopped` and transient states such
    /// as `buffering`, which count as playing.
    pub fn from_plex(value: &str) -> Self {
        match value {
            "playing" | "buffering" => Self::Playing,
            "paused" => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn from_plex(value: u8) -> Self {
        match value {
            1 => Self::All,
            2 => Self::One,
            _ => Self::Off,
        }
    }

    pub fn as_plex(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::All => 1,
            Self::One => 2,
        }
    }

    /// off -> all -> one -> off
    pub fn next(self) -> Self {
        Self::from_plex((self.as_plex() + 1) % 3)
    }
}

/// One polled sample of the remote player's timeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub state: PlaybackState,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub rating_key: Option<String>,
    pub volume: Option<u8>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub machine_identifier: Option<String>,
}

impl Snapshot {
    pub fn has_session(&self) -> bool {
        self.state != PlaybackState::Stopped
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
}

/// Full track metadata. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub rating_key: String,
    pub parent_rating_key: Option<String>,
    pub grandparent_rating_key: Option<String>,
    pub title: String,
    /// Album
    pub parent_title: String,
    /// Artist
    pub grandparent_title: String,
    /// 0..=10, two units per star.
    pub user_rating: u8,
    pub duration_ms: u64,
    pub index: Option<u32>,
    pub media: Option<MediaInfo>,
    pub thumb: Option<String>,
    pub parent_thumb: Option<String>,
    pub grandparent_thumb: Option<String>,
}

impl Track {
    pub fn art_path(&self) -> Option<&str> {
        self.thumb
            .as_deref()
            .or(self.parent_thumb.as_deref())
            .or(self.grandparent_thumb.as_deref())
    }
}

/// Commands addressed to the player (`/player/playback/...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    SkipNext,
    SkipPrevious,
    SeekTo(u64),
    SetVolume(u8),
    SetShuffle(bool),
    SetRepeat(RepeatMode),
}

impl PlayerCommand {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Play => "/player/playback/play",
            Self::Pause => "/player/playback/pause",
            Self::SkipNext => "/player/playback/skipNext",
            Self::SkipPrevious => "/player/playback/skipPrevious",
            Self::SeekTo(_) => "/player/playback/seekTo",
            Self::SetVolume(_) | Self::SetShuffle(_) | Self::SetRepeat(_) => {
                "/player/playback/setParameters"
            }
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        match *self {
            Self::SeekTo(offset) => vec![("offset", offset.to_string())],
            Self::SetVolume(volume) => vec![("volume", volume.to_string())],
            Self::SetShuffle(on) => vec![("shuffle", u8::from(on).to_string())],
            Self::SetRepeat(mode) => vec![("repeat", mode.as_plex().to_string())],
            _ => Vec::new(),
        }
    }
}

/// Connection details pushed down from the global settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerConfig {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub player_url: Option<String>,
}

/// The remote player and its backing server.
///
/// Implementations are stateless with respect to playback: they only move
/// requests and parse responses. Every call carries its own timeout.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    fn configure(&self, config: ServerConfig);

    /// `Ok(None)` when no music timeline is active.
    async fn fetch_timeline(&self) -> RemoteResult<Option<Snapshot>>;
    async fn fetch_metadata(&self, rating_key: &str) -> RemoteResult<Option<Track>>;
    async fn fetch_child_count(&self, parent_key: &str) -> RemoteResult<Option<u32>>;
    async fn fetch_art(&self, path: &str) -> RemoteResult<Vec<u8>>;

    /// Sent to the local player first, relayed through the server on failure.
    async fn player_command(&self, command: PlayerCommand, target: Option<&str>) -> RemoteResult<()>;
    async fn rate(&self, rating_key: &str, rating: u8, target: Option<&str>) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_cycle() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
    }

    #[test]
    fn test_command_params() {
        assert_eq!(
            PlayerCommand::SeekTo(12_000).params(),
            vec![("offset", "12000".to_string())]
        );
        assert_eq!(
            PlayerCommand::SetShuffle(true).params(),
            vec![("shuffle", "1".to_string())]
        );
        assert!(PlayerCommand::Play.params().is_empty());
        assert_eq!(PlayerCommand::SetRepeat(RepeatMode::One).path(), "/player/playback/setParameters");
    }

    #[test]
    fn test_art_path_fallback() {
        let track = Track {
            parent_thumb: Some("/album.jpg".into()),
            grandparent_thumb: Some("/artist.jpg".into()),
            ..Default::default()
        };
        assert_eq!(track.art_path(), Some("/album.jpg"));
    }
}
