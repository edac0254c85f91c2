//! IANA timezone resolution and human-readable offset labels.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::config::FALLBACK_TIMEZONE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("Unknown timezone: {0}")]
    Unknown(String),
}

/// Look up an IANA zone name such as `America/New_York`.
pub fn resolve_timezone(name: &str) -> Result<Tz, TimezoneError> {
    let trimmed = name.trim();
    trimmed
        .parse::<Tz>()
        .map_err(|_| TimezoneError::Unknown(trimmed.to_string()))
}

/// Best-effort browser timezone, `UTC` when `Intl` is unavailable.
pub fn detect_user_timezone() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        intl_time_zone().unwrap_or_else(|| FALLBACK_TIMEZONE.to_string())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        FALLBACK_TIMEZONE.to_string()
    }
}

#[cfg(target_arch = "wasm32")]
fn intl_time_zone() -> Option<String> {
    use js_sys::{Array, Intl, Object, Reflect};

    let intl = Reflect::get(&js_sys::global(), &"Intl".into()).ok()?;
    if intl.is_undefined() {
        return None;
    }
    let options = Intl::DateTimeFormat::new(&Array::new(), &Object::new()).resolved_options();
    Reflect::get(&options, &"timeZone".into()).ok()?.as_string()
}

/// Resolve wall-clock fields in `tz` to an absolute instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earliest instant.
/// Local times inside a DST gap use the offset in force before the gap,
/// which lands them just after the transition.
pub fn wall_clock_to_utc(local: &NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(local) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&(*local - Duration::days(1)));
            let offset = Duration::seconds(i64::from(before.fix().local_minus_utc()));
            DateTime::from_naive_utc_and_offset(*local - offset, Utc)
        }
    }
}

fn offset_seconds(tz: &Tz, at: &DateTime<Utc>) -> i32 {
    tz.offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc()
}

/// `UTC`, `UTC+05:30`, `UTC-04:00`.
pub fn format_utc_offset(tz: &Tz, at: &DateTime<Utc>) -> String {
    let secs = offset_seconds(tz, at);
    if secs == 0 {
        return "UTC".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let minutes = secs.abs() / 60;
    format!("UTC{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

fn format_hours(secs: i32) -> String {
    let minutes = secs.abs() / 60;
    if minutes % 60 == 0 {
        (minutes / 60).to_string()
    } else {
        let text = format!("{:.2}", minutes as f64 / 60.0);
        text.trim_end_matches('0').to_string()
    }
}

/// Describe `target_tz` relative to the viewer's own zone at instant `at`.
pub fn format_offset_label(target_tz: &str, user_tz: &str, at: &DateTime<Utc>) -> String {
    if target_tz == user_tz {
        return "Your timezone".to_string();
    }
    let (Ok(target), Ok(user)) = (resolve_timezone(target_tz), resolve_timezone(user_tz)) else {
        return target_tz.to_string();
    };

    let diff = offset_seconds(&target, at) - offset_seconds(&user, at);
    if diff == 0 {
        return "Same time as you".to_string();
    }
    let hours = format_hours(diff);
    let unit = if hours == "1" { "hour" } else { "hours" };
    let direction = if diff > 0 { "ahead of" } else { "behind" };
    format!("{} {} {} you", hours, unit, direction)
}
