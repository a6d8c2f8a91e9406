use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime};
use fancy_regex::Regex;

/// Russian grammatical agreement for "hour": values whose last two digits fall
/// in 11..=14 always take the large-plural form; otherwise the last digit
/// decides (1 singular, 2..=4 small-plural, everything else large-plural).
pub fn hour_word(hours: i64) -> &'static str {
    let tail_two = hours.rem_euclid(100);
    if (11..=14).contains(&tail_two) {
        return "часов";
    }
    match hours.rem_euclid(10) {
        1 => "час",
        2..=4 => "часа",
        _ => "часов",
    }
}

/// Formats a duration in seconds. Negative inputs clamp to zero. Durations
/// under one hour render as `MM:SS`; longer ones as `H <hour-word> MM:SS`.
pub fn format_duration(total_seconds: i64) -> String {
    let safe_seconds = total_seconds.max(0);
    let hours = safe_seconds / 3600;
    let minutes = (safe_seconds % 3600) / 60;
    let seconds = safe_seconds % 60;

    if hours == 0 {
        return format!("{minutes:02}:{seconds:02}");
    }
    format!("{hours} {} {minutes:02}:{seconds:02}", hour_word(hours))
}

fn legacy_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\s*ч\s*(\d{2})\s*мин\s*(\d{2})\s*(?:секунд|сек)?$").ok()
    })
    .as_ref()
}

/// Rewrites the older verbose duration text (`"<N> ч <MM> мин <SS>[ секунд|сек]"`)
/// into the compact form. Returns `None` when the text is not in the legacy
/// format, which makes the migration idempotent: compact text never matches.
pub fn from_legacy_format(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let re = legacy_regex()?;
    let caps = re.captures(trimmed).ok()??;
    let hours: i64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: i64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: i64 = caps.get(3)?.as_str().parse().ok()?;

    if hours == 0 {
        return Some(format!("{minutes:02}:{seconds:02}"));
    }
    Some(format!(
        "{hours} {} {minutes:02}:{seconds:02}",
        hour_word(hours)
    ))
}

/// Parses a start-instant marker: RFC 3339 first, then a few naive date-time
/// shapes interpreted as UTC. Returns epoch milliseconds.
pub(crate) fn parse_start_instant(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp_millis());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    None
}

pub(crate) fn format_wall_clock(now_ms: i64) -> String {
    DateTime::from_timestamp_millis(now_ms)
        .map(|instant| instant.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
