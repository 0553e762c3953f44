//! Externalized note text format.
//!
//! # Responsibility
//! - Render and parse the `"<timestamp>;; <text>"` line format.
//! - Keep timestamp formatting independent of the host time zone.
//!
//! # Invariants
//! - Timestamps are rendered as `yyyy-MM-dd HH:mm:ss.SSS` in UTC.
//! - `parse_timestamp(format_timestamp(ms)) == Some(ms)` for every `ms`
//!   inside `MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS`.
//! - Only the first separator splits a line; later ones belong to the text.

use chrono::{DateTime, NaiveDateTime};

/// Separator between the timestamp and text sections.
pub const FIELD_SEPARATOR: &str = ";; ";

/// chrono pattern for `yyyy-MM-dd HH:mm:ss.SSS`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// `0000-01-01 00:00:00.000` UTC in epoch milliseconds.
pub const MIN_TIMESTAMP_MS: i64 = -62_167_219_200_000;

/// `9999-12-31 23:59:59.999` UTC in epoch milliseconds.
pub const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

/// Returns whether `epoch_ms` fits the four-digit-year text format.
pub fn is_formattable(epoch_ms: i64) -> bool {
    (MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&epoch_ms)
}

/// Renders epoch milliseconds as `yyyy-MM-dd HH:mm:ss.SSS` (UTC).
///
/// Values outside the four-digit-year range are clamped to the nearest
/// bound; callers that care should check [`is_formattable`] first.
pub fn format_timestamp(epoch_ms: i64) -> String {
    let clamped = epoch_ms.clamp(MIN_TIMESTAMP_MS, MAX_TIMESTAMP_MS);
    DateTime::from_timestamp_millis(clamped)
        .unwrap_or_default()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Parses a `yyyy-MM-dd HH:mm:ss.SSS` (UTC) value into epoch milliseconds.
///
/// Parsing is strict: the value must be exactly what [`format_timestamp`]
/// would render for the parsed instant. Unpadded fields, missing millis,
/// leap seconds and trailing characters are all rejected.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let parsed = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()?;
    let epoch_ms = parsed.and_utc().timestamp_millis();
    if !is_formattable(epoch_ms) || format_timestamp(epoch_ms) != value {
        return None;
    }
    Some(epoch_ms)
}

/// Splits a raw note line into an optional timestamp and its text.
///
/// Returns `(Some(ts), text)` when the line starts with a valid timestamp
/// followed by [`FIELD_SEPARATOR`]. Otherwise returns `(None, raw)`, i.e.
/// the entire input is treated as text.
pub fn split_note_str(raw: &str) -> (Option<i64>, &str) {
    match raw.split_once(FIELD_SEPARATOR) {
        Some((prefix, text)) => match parse_timestamp(prefix) {
            Some(epoch_ms) => (Some(epoch_ms), text),
            None => (None, raw),
        },
        None => (None, raw),
    }
}

/// Joins a timestamp and text into the externalized line format.
pub fn join_note_str(epoch_ms: i64, text: &str) -> String {
    format!("{}{FIELD_SEPARATOR}{text}", format_timestamp(epoch_ms))
}
