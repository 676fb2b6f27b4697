use crate::app::config::RatingMode;

const FULL_STAR: char = '★';
const HALF_STAR: char = '⯨';
const EMPTY_STAR: char = '☆';

/// Truncate to `max_width` characters, appending "…" when cut.
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        s.chars()
            .take(max_width.saturating_sub(1))
            .chain(std::iter::once('…'))
            .collect()
    } else {
        s.to_string()
    }
}

/// `M:SS`, or `H:MM:SS` from an hour up.
pub fn format_time(ms: u64) -> String {
    let total = ms / 1000;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Five stars from a 0..=10 rating. Odd ratings get a half star only in
/// half-star mode.
pub fn format_rating(rating: u8, mode: RatingMode) -> String {
    let rating = rating.min(10);
    let full = (rating / 2) as usize;
    let half = mode == RatingMode::Half && rating % 2 == 1;
    let mut stars = String::with_capacity(15);
    stars.extend(std::iter::repeat(FULL_STAR).take(full));
    if half {
        stars.push(HALF_STAR);
    }
    let used = full + half as usize;
    stars.extend(std::iter::repeat(EMPTY_STAR).take(5 - used));
    stars
}

/// "4.5", "4", "0"; with `with_scale` "4.5/5".
pub fn format_numeric_rating(rating: u8, with_scale: bool) -> String {
    let rating = rating.min(10);
    let value = if rating % 2 == 1 {
        format!("{}.5", rating / 2)
    } else {
        format!("{}", rating / 2)
    };
    if with_scale {
        format!("{}/5", value)
    } else {
        value
    }
}

/// Fill (0..=100) of panel `position` when a progress bar of `progress`
/// percent is spread over `total_panels` strips side by side.
pub fn progress_segment(progress: f64, position: u32, total_panels: u32) -> f64 {
    if total_panels == 0 || position == 0 || position > total_panels {
        return 0.0;
    }
    let segment = 100.0 / total_panels as f64;
    let start = (position - 1) as f64 * segment;
    let end = start + segment;
    if progress <= start {
        return 0.0;
    }
    ((progress.min(end) - start) / segment * 100.0).clamp(0.0, 100.0)
}
