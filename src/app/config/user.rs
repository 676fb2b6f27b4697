use crate::player::plex::DEFAULT_PLAYER_URL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User-editable configuration (read-only after load)
/// stored in `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Used when the Stream Deck settings carry no `playerUrl`.
    #[serde(default = "default_player_url")]
    pub player_url: String,
    #[serde(default)]
    pub timing: Timing,
}

fn default_player_url() -> String {
    DEFAULT_PLAYER_URL.to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            player_url: default_player_url(),
            timing: Timing::default(),
        }
    }
}

/// Loop periods, gesture thresholds and guard windows, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub poll_interval_ms: u64,
    pub render_interval_ms: u64,
    pub hold_threshold_ms: u64,
    pub seek_interval_ms: u64,
    pub seek_step_ms: u64,
    pub rating_debounce_ms: u64,
    pub overlay_ms: u64,
    pub volume_guard_ms: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    pub volume_step: u8,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            render_interval_ms: 200,
            hold_threshold_ms: 400,
            seek_interval_ms: 500,
            seek_step_ms: 10_000,
            rating_debounce_ms: 2000,
            overlay_ms: 1500,
            volume_guard_ms: 2000,
            reconnect_base_ms: 3000,
            reconnect_max_ms: 30_000,
            volume_step: 5,
        }
    }
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(1))
    }

    pub fn hold_threshold(&self) -> Duration {
        Duration::from_millis(self.hold_threshold_ms)
    }

    pub fn seek_interval(&self) -> Duration {
        Duration::from_millis(self.seek_interval_ms.max(1))
    }

    pub fn rating_debounce(&self) -> Duration {
        Duration::from_millis(self.rating_debounce_ms)
    }

    pub fn overlay(&self) -> Duration {
        Duration::from_millis(self.overlay_ms)
    }

    pub fn volume_guard(&self) -> Duration {
        Duration::from_millis(self.volume_guard_ms)
    }

    pub fn reconnect_base(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}
