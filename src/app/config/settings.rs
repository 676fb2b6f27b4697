//! Stream Deck settings: the plugin-wide global bag and per-key settings.

use crate::player::ServerConfig;
use crate::transport::protocol::Settings;
use serde_json::Value;

/// Keys that belong to the plugin rather than a single key. Property
/// inspectors write them into per-key settings; they are promoted.
pub const GLOBAL_KEYS: [&str; 8] = [
    "plexServerUrl",
    "plexToken",
    "clientName",
    "playerUrl",
    "syncOffset",
    "textColor",
    "dynamicColors",
    "debugMode",
];

pub const DEFAULT_ACCENT: &str = "#E5A00D";
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

fn as_text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Numbers sometimes arrive as strings from HTML forms.
fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" | "" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalSettings {
    values: Settings,
}

impl GlobalSettings {
    pub fn as_map(&self) -> &Settings {
        &self.values
    }

    /// Merges incoming keys over the current ones. Returns whether anything
    /// changed.
    pub fn merge(&mut self, incoming: &Settings) -> bool {
        let mut changed = false;
        for (key, value) in incoming {
            if self.values.get(key) != Some(value) {
                self.values.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// Copies global keys out of per-key settings. Empty strings and nulls
    /// never overwrite a stored value.
    pub fn promote(&mut self, action_settings: &Settings) -> bool {
        let mut changed = false;
        for key in GLOBAL_KEYS {
            let Some(value) = action_settings.get(key) else {
                continue;
            };
            let usable = match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            };
            if usable && self.values.get(key) != Some(value) {
                self.values.insert(key.to_string(), value.clone());
                changed = true;
            }
        }
        changed
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            server_url: as_text(self.values.get("plexServerUrl")).map(str::to_string),
            token: as_text(self.values.get("plexToken")).map(str::to_string),
            player_url: as_text(self.values.get("playerUrl")).map(str::to_string),
        }
    }

    pub fn is_configured(&self) -> bool {
        let config = self.server_config();
        config.server_url.is_some() && config.token.is_some()
    }

    /// Milliseconds added to the interpolated position. May be negative.
    pub fn sync_offset_ms(&self) -> i64 {
        as_number(self.values.get("syncOffset"))
            .map(|n| n.round() as i64)
            .unwrap_or(0)
    }

    pub fn debug_mode(&self) -> bool {
        as_flag(self.values.get("debugMode")).unwrap_or(false)
    }

    /// Accent follows the album art unless switched off.
    pub fn dynamic_colors(&self) -> bool {
        as_flag(self.values.get("dynamicColors")).unwrap_or(true)
    }

    pub fn text_color(&self) -> &str {
        as_text(self.values.get("textColor")).unwrap_or(DEFAULT_TEXT_COLOR)
    }
}

/// What a key or dial does, from the suffix of its action UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AlbumArt,
    PlayPause,
    Play,
    Pause,
    Next,
    Previous,
    Info,
    Time,
    Rating,
    Shuffle,
    Repeat,
    Strip,
    Unknown,
}

impl ActionKind {
    pub fn from_uuid(action: &str) -> Self {
        match action.rsplit('.').next().unwrap_or_default() {
            "album-art" => Self::AlbumArt,
            "play-pause" => Self::PlayPause,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "next" => Self::Next,
            "previous" => Self::Previous,
            "info" => Self::Info,
            "time" => Self::Time,
            "rating" => Self::Rating,
            "shuffle" => Self::Shuffle,
            "repeat" => Self::Repeat,
            "strip" => Self::Strip,
            _ => Self::Unknown,
        }
    }

    /// Next and previous seek when held.
    pub fn seek_direction(self) -> Option<i64> {
        match self {
            Self::Next => Some(1),
            Self::Previous => Some(-1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Artist,
    Album,
    Track,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingMode {
    #[default]
    Half,
    Full,
}

impl RatingMode {
    pub fn step(self) -> u8 {
        match self {
            Self::Half => 1,
            Self::Full => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingDisplay {
    #[default]
    Stars,
    Numeric,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialAction {
    #[default]
    None,
    Skip,
    Volume,
    Rating,
}

/// Per-key settings, parsed leniently: unknown values fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSettings {
    pub display_mode: DisplayMode,
    pub rating_mode: RatingMode,
    pub rating_display: RatingDisplay,
    pub dial_action: DialAction,
    pub font_size: u32,
    pub progress_total_panels: u32,
    pub progress_position: u32,
    pub text_color: Option<String>,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::default(),
            rating_mode: RatingMode::default(),
            rating_display: RatingDisplay::default(),
            dial_action: DialAction::default(),
            font_size: 16,
            progress_total_panels: 3,
            progress_position: 1,
            text_color: None,
        }
    }
}

impl ActionSettings {
    pub fn from_map(settings: &Settings) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u32| {
            as_number(settings.get(key))
                .filter(|n| *n >= 1.0)
                .map(|n| n as u32)
                .unwrap_or(default)
        };

        Self {
            display_mode: match as_text(settings.get("displayMode")) {
                Some("album") => DisplayMode::Album,
                Some("track") => DisplayMode::Track,
                Some("time") => DisplayMode::Time,
                _ => DisplayMode::Artist,
            },
            rating_mode: match as_text(settings.get("ratingMode")) {
                Some("full") => RatingMode::Full,
                _ => RatingMode::Half,
            },
            rating_display: match as_text(settings.get("ratingDisplay")) {
                Some("numeric") => RatingDisplay::Numeric,
                Some("both") => RatingDisplay::Both,
                _ => RatingDisplay::Stars,
            },
            dial_action: match as_text(settings.get("dialAction")) {
                Some("skip") => DialAction::Skip,
                Some("volume") => DialAction::Volume,
                Some("rating") => DialAction::Rating,
                _ => DialAction::None,
            },
            font_size: number("fontSize", defaults.font_size),
            progress_total_panels: number("progressTotalPanels", defaults.progress_total_panels),
            progress_position: number("progressPosition", defaults.progress_position),
            text_color: as_text(settings.get("textColor")).map(str::to_string),
        }
    }
}
