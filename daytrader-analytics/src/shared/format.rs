//! Display formatting shared by the dashboard panels.

use chrono::{Local, TimeZone};

/// Shown when a timestamp cannot be represented
const INVALID_CLOCK: &str = "--:--:--";

/// Format with an explicit sign and two decimals, eg/ "+1.00", "-0.25", "0.00"
pub fn format_signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.2}", value)
    } else if value == 0.0 {
        // Covers -0.0
        format!("{:.2}", 0.0)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a percentage with an explicit sign, eg/ "+0.45%"
pub fn format_signed_pct(value: f64) -> String {
    format!("{}%", format_signed(value))
}

/// Local wall-clock `HH:MM:SS` for Unix seconds
pub fn format_clock(ts: f64) -> String {
    format_clock_in(ts, &Local)
}

pub fn format_clock_in<Tz>(ts: f64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if !ts.is_finite() {
        return INVALID_CLOCK.to_string();
    }

    let secs = ts.floor();
    let nanos = ((ts - secs) * 1e9) as u32;
    match tz.timestamp_opt(secs as i64, nanos.min(999_999_999)).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => INVALID_CLOCK.to_string(),
    }
}
