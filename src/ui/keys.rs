//! Key faces.

use super::utils::{format_numeric_rating, format_rating, format_time};
use super::ViewModel;
use crate::app::config::{ActionKind, RatingDisplay};
use crate::app::state::ContextEntry;
use crate::player::PlaybackState;
use crate::transport::protocol::Outbound;

const NO_TRACK: &str = "No Track";

pub fn render(view: &ViewModel, context: &str, kind: ActionKind, entry: &ContextEntry) -> Vec<Outbound> {
    match kind {
        ActionKind::AlbumArt => vec![album_art(view, context)],
        ActionKind::PlayPause => {
            let state = u8::from(view.playback == PlaybackState::Playing);
            vec![Outbound::set_state(context, state)]
        }
        ActionKind::Next | ActionKind::Previous => vec![Outbound::set_title(context, "")],
        ActionKind::Info => vec![Outbound::set_title(context, &info_title(view))],
        ActionKind::Time => vec![Outbound::set_title(context, &time_title(view, entry.show_remaining))],
        ActionKind::Rating => vec![Outbound::set_title(context, &rating_title(view, entry))],
        ActionKind::Shuffle => vec![Outbound::set_state(context, u8::from(view.shuffle))],
        ActionKind::Repeat => vec![Outbound::set_state(context, view.repeat.as_plex())],
        ActionKind::Play | ActionKind::Pause | ActionKind::Strip | ActionKind::Unknown => Vec::new(),
    }
}

fn album_art(view: &ViewModel, context: &str) -> Outbound {
    match view.artwork.as_deref() {
        Some(art) if !view.is_stopped() => Outbound::set_image(context, &art.data_url),
        _ => Outbound::reset_image(context),
    }
}

/// Codec, bitrate and position in the album.
pub fn info_title(view: &ViewModel) -> String {
    let Some(track) = view.track.as_deref().filter(|_| !view.is_stopped()) else {
        return NO_TRACK.to_string();
    };
    let media = track.media.as_ref();
    let codec = media
        .and_then(|m| m.codec.as_deref())
        .map(str::to_uppercase)
        .unwrap_or_else(|| "---".to_string());
    let bitrate = media
        .and_then(|m| m.bitrate)
        .map(|kbps| format!("{} kbps", kbps))
        .unwrap_or_else(|| "---".to_string());
    let index = track.index.map_or("?".to_string(), |i| i.to_string());
    let count = view
        .album_track_count
        .map_or("?".to_string(), |c| c.to_string());
    format!("{}\n{}\nTRACK\n{}/{}", codec, bitrate, index, count)
}

pub fn time_title(view: &ViewModel, show_remaining: bool) -> String {
    if view.is_stopped() {
        return "0:00\n/ 0:00".to_string();
    }
    let current = if show_remaining {
        format!("-{}", format_time(view.duration_ms.saturating_sub(view.position_ms)))
    } else {
        format_time(view.position_ms)
    };
    format!("{}\n/ {}", current, format_time(view.duration_ms))
}

pub fn rating_title(view: &ViewModel, entry: &ContextEntry) -> String {
    if view.track.is_none() || view.is_stopped() {
        return NO_TRACK.to_string();
    }
    let settings = &entry.settings;
    let shown = match settings.rating_display {
        RatingDisplay::Stars => format_rating(view.rating, settings.rating_mode),
        RatingDisplay::Numeric => format_numeric_rating(view.rating, false),
        RatingDisplay::Both => format!(
            "{}\n{}",
            format_rating(view.rating, settings.rating_mode),
            format_numeric_rating(view.rating, true)
        ),
    };
    format!("RATING\n{}", shown)
}
