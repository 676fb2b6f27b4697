//! Touch strip feedback on the built-in `$B1` layout: a title, a value
//! line and a bar indicator.

use super::utils::{format_time, progress_segment, truncate};
use super::ViewModel;
use crate::app::config::{ActionSettings, DisplayMode};
use crate::transport::protocol::Outbound;
use serde_json::json;

pub const STRIP_LAYOUT: &str = "$B1";

/// Usable strip width in pixels for the value line.
const STRIP_WIDTH: f64 = 180.0;

/// Rough character budget for the value line at a given font size.
fn max_chars(font_size: u32) -> usize {
    ((STRIP_WIDTH / (font_size.max(1) as f64 * 0.6)) as usize).max(4)
}

/// Label and value line for the strip's display mode.
pub fn strip_text(view: &ViewModel, mode: DisplayMode) -> (String, String) {
    let time = || format!("{} / {}", format_time(view.position_ms), format_time(view.duration_ms));
    let Some(track) = view.track.as_deref().filter(|_| !view.is_stopped()) else {
        let (label, text) = match mode {
            DisplayMode::Artist => ("ARTIST", "Not Playing"),
            DisplayMode::Album => ("ALBUM", "Not Playing"),
            DisplayMode::Track => ("TRACK", "Not Playing"),
            DisplayMode::Time => ("TIME", "0:00 / 0:00"),
        };
        return (label.to_string(), text.to_string());
    };

    match mode {
        DisplayMode::Artist => ("ARTIST".into(), track.grandparent_title.clone()),
        DisplayMode::Album => ("ALBUM".into(), track.parent_title.clone()),
        DisplayMode::Track => ("TRACK".into(), track.title.clone()),
        DisplayMode::Time => ("TIME".into(), time()),
    }
}

pub fn feedback(view: &ViewModel, context: &str, settings: &ActionSettings) -> Outbound {
    let (label, text) = strip_text(view, settings.display_mode);
    let color = settings.text_color.as_deref().unwrap_or(&view.text_color);
    let fill = progress_segment(
        view.progress,
        settings.progress_position,
        settings.progress_total_panels,
    );

    Outbound::set_feedback(
        context,
        json!({
            "title": { "value": label, "color": color },
            "value": { "value": truncate(&text, max_chars(settings.font_size)), "color": color },
            "indicator": { "value": fill.round() as u32, "bar_fill_c": view.accent },
        }),
    )
}

pub fn overlay(context: &str, title: &str, value: &str) -> Outbound {
    Outbound::set_feedback(context, json!({ "title": title, "value": value }))
}
