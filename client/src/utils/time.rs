use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// `HH:MM:SS`, zero padded. Hours keep growing past 99 instead of wrapping.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Elapsed time between two instants, clamped at zero when `since` lies in
/// the future (device clock behind the server).
pub fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

pub fn format_total_hours(hours: f64) -> String {
    format!("{:.2}", hours)
}

/// "2h 30m", "45m", "3h"
pub fn format_duration_hours(hours: f64) -> String {
    let hours = hours.max(0.0);
    let mut whole = hours.floor() as u64;
    let mut minutes = ((hours - hours.floor()) * 60.0).round() as u64;
    if minutes == 60 {
        whole += 1;
        minutes = 0;
    }
    if whole == 0 {
        return format!("{}m", minutes);
    }
    if minutes > 0 {
        format!("{}h {}m", whole, minutes)
    } else {
        format!("{}h", whole)
    }
}

pub fn format_clock_time(at: Option<DateTime<Utc>>, tz: Tz) -> String {
    match at {
        Some(at) => at.with_timezone(&tz).format("%I:%M %p").to_string(),
        None => "--:--".to_string(),
    }
}

pub fn now_in_tz(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}
