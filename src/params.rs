//! Query-parameter loading and validation.
//!
//! The loader never touches the browser directly: callers hand it a lookup
//! closure (`UrlSearchParams::get` on the web, a map in tests) and get back
//! either an immutable [`CountdownConfig`] or a user-facing [`ConfigError`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::{
    DEFAULT_MESSAGE, DEFAULT_THEME, FALLBACK_TIMEZONE, MAX_DURATION_SECS, MIN_DURATION_SECS,
};
use crate::countdown::{CountdownConfig, CountdownMode, CountdownTarget};
use crate::timezone::{resolve_timezone, wall_clock_to_utc};

// Compiled regexes for target parsing
static OFFSET_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?P<zulu>[Zz])|(?P<sign>[+-])(?P<hh>\d{2}):?(?P<mm>\d{2}))$").unwrap()
});
static LOCAL_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<date>\d{4}-\d{2}-\d{2})(?:[T ](?P<time>\d{2}:\d{2}(?::\d{2}(?:\.\d{1,9})?)?))?$")
        .unwrap()
});

/// Validation failures shown to the user in place of the countdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Countdown mode is required (timer, absolute, or wall-clock).")]
    MissingMode,
    #[error("Invalid mode. Must be one of: timer, absolute, wall-clock.")]
    InvalidMode(String),
    #[error("Duration is required for timer mode.")]
    MissingDuration,
    #[error("Invalid duration. Must be a positive number of seconds (max 31,536,000).")]
    InvalidDuration(String),
    #[error("Target date is required for {0} mode.")]
    MissingTarget(CountdownMode),
    #[error("Wall-clock mode requires abstract time (must not end with Z).")]
    WallClockWithOffset,
    #[error("Invalid target date. Use ISO 8601 (YYYY-MM-DDTHH:MM[:SS]).")]
    InvalidTarget(String),
}

/// Raw, unvalidated query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountdownParams {
    pub mode: Option<String>,
    pub duration: Option<String>,
    pub target: Option<String>,
    pub tz: Option<String>,
    pub theme: Option<String>,
    pub message: Option<String>,
}

/// A target string split into local fields and an optional explicit offset.
struct ParsedTarget {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl CountdownParams {
    /// Read every known parameter through `lookup`. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            mode: read("mode"),
            duration: read("duration"),
            target: read("target"),
            tz: read("tz"),
            theme: read("theme"),
            message: read("message"),
        }
    }

    /// Validate into a config. `now` anchors timer mode; `fallback_tz` is used
    /// when `tz` is missing or unknown.
    pub fn into_config(
        self,
        now: DateTime<Utc>,
        fallback_tz: &str,
    ) -> Result<CountdownConfig, ConfigError> {
        let mode = self.resolve_mode()?;
        let timezone = select_timezone(self.tz.as_deref(), fallback_tz);

        let target = match mode {
            CountdownMode::Timer => {
                let raw = self.duration.as_deref().ok_or(ConfigError::MissingDuration)?;
                CountdownTarget::Timer {
                    duration_secs: parse_duration(raw)?,
                    started_at: now,
                }
            }
            CountdownMode::Absolute => {
                let raw = self
                    .target
                    .as_deref()
                    .ok_or(ConfigError::MissingTarget(mode))?;
                let parsed = parse_target(raw)?;
                let at = match parsed.offset {
                    Some(offset) => offset
                        .from_local_datetime(&parsed.local)
                        .single()
                        .ok_or_else(|| ConfigError::InvalidTarget(raw.to_string()))?
                        .with_timezone(&Utc),
                    None => wall_clock_to_utc(&parsed.local, &timezone),
                };
                CountdownTarget::Absolute(at)
            }
            CountdownMode::WallClock => {
                let raw = self
                    .target
                    .as_deref()
                    .ok_or(ConfigError::MissingTarget(mode))?;
                if OFFSET_SUFFIX.is_match(raw) {
                    return Err(ConfigError::WallClockWithOffset);
                }
                CountdownTarget::WallClock(parse_target(raw)?.local)
            }
        };

        let theme = self.theme.unwrap_or_else(|| DEFAULT_THEME.to_string());
        let message = self.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        info!(
            "Loaded {} countdown (tz: {}, theme: {})",
            mode,
            timezone.name(),
            theme
        );
        Ok(CountdownConfig::new(target, timezone, theme, message))
    }

    fn resolve_mode(&self) -> Result<CountdownMode, ConfigError> {
        if let Some(raw) = self.mode.as_deref() {
            return raw
                .parse()
                .map_err(|_| ConfigError::InvalidMode(raw.to_string()));
        }
        // No explicit mode: infer from whichever parameter is present.
        match (&self.duration, self.target.as_deref()) {
            (Some(_), _) => Ok(CountdownMode::Timer),
            (None, Some(target)) if OFFSET_SUFFIX.is_match(target) => Ok(CountdownMode::Absolute),
            (None, Some(_)) => Ok(CountdownMode::WallClock),
            (None, None) => Err(ConfigError::MissingMode),
        }
    }
}

fn select_timezone(requested: Option<&str>, fallback: &str) -> Tz {
    if let Some(name) = requested {
        match resolve_timezone(name) {
            Ok(tz) => return tz,
            Err(e) => warn!("{}, falling back to {}", e, fallback),
        }
    }
    resolve_timezone(fallback)
        .or_else(|_| resolve_timezone(FALLBACK_TIMEZONE))
        .unwrap_or(Tz::UTC)
}

/// Parse a duration in whole seconds within the accepted range.
pub fn parse_duration(input: &str) -> Result<u64, ConfigError> {
    let trimmed = input.trim();
    match trimmed.parse::<u64>() {
        Ok(secs) if (MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&secs) => Ok(secs),
        _ => Err(ConfigError::InvalidDuration(trimmed.to_string())),
    }
}

fn parse_target(input: &str) -> Result<ParsedTarget, ConfigError> {
    let invalid = || ConfigError::InvalidTarget(input.to_string());
    let trimmed = input.trim();

    let (local_text, offset) = match OFFSET_SUFFIX.captures(trimmed) {
        Some(caps) => {
            let whole = caps.get(0).ok_or_else(invalid)?;
            let offset = if caps.name("zulu").is_some() {
                FixedOffset::east_opt(0)
            } else {
                let hh: i32 = caps["hh"].parse().map_err(|_| invalid())?;
                let mm: i32 = caps["mm"].parse().map_err(|_| invalid())?;
                let secs = hh * 3_600 + mm * 60;
                if &caps["sign"] == "-" {
                    FixedOffset::west_opt(secs)
                } else {
                    FixedOffset::east_opt(secs)
                }
            };
            (&trimmed[..whole.start()], Some(offset.ok_or_else(invalid)?))
        }
        None => (trimmed, None),
    };

    let caps = LOCAL_DATE_TIME.captures(local_text).ok_or_else(invalid)?;
    let date = NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").map_err(|_| invalid())?;
    let time = match caps.name("time") {
        Some(time) => {
            let text = time.as_str();
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .map_err(|_| invalid())?
        }
        None => NaiveTime::MIN,
    };

    Ok(ParsedTarget {
        local: date.and_time(time),
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::compute_remaining;
    use chrono::Duration;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap()
    }

    fn load(query: &[(&str, &str)]) -> Result<CountdownConfig, ConfigError> {
        let map: HashMap<String, String> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CountdownParams::from_lookup(|key| map.get(key).cloned()).into_config(now(), "UTC")
    }

    fn message(query: &[(&str, &str)]) -> String {
        load(query).unwrap_err().to_string()
    }

    #[test]
    fn timer_starts_at_full_duration() {
        let config = load(&[("mode", "timer"), ("duration", "300"), ("tz", "UTC")]).unwrap();
        assert_eq!(config.mode(), CountdownMode::Timer);
        assert_eq!(compute_remaining(&config, now()).total, 300);
        assert_eq!(config.theme(), DEFAULT_THEME);
        assert_eq!(config.message(), DEFAULT_MESSAGE);
    }

    #[test]
    fn wall_clock_rejects_zulu_suffix() {
        assert_eq!(
            message(&[("mode", "wall-clock"), ("target", "2099-01-01T00:00:00Z")]),
            "Wall-clock mode requires abstract time (must not end with Z)."
        );
    }

    #[test]
    fn required_fields_have_readable_errors() {
        assert_eq!(
            message(&[("mode", "timer")]),
            "Duration is required for timer mode."
        );
        assert_eq!(
            message(&[("mode", "wall-clock")]),
            "Target date is required for wall-clock mode."
        );
        assert_eq!(
            message(&[("mode", "absolute")]),
            "Target date is required for absolute mode."
        );
        assert_eq!(
            message(&[("mode", "sometime")]),
            "Invalid mode. Must be one of: timer, absolute, wall-clock."
        );
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingMode);
    }

    #[test]
    fn duration_bounds() {
        let invalid = "Invalid duration. Must be a positive number of seconds (max 31,536,000).";
        for raw in ["0", "-5", "abc", "31536001", "1.5"] {
            assert_eq!(message(&[("mode", "timer"), ("duration", raw)]), invalid);
        }
        assert_eq!(parse_duration("31536000"), Ok(31_536_000));
        assert_eq!(parse_duration(" 1 "), Ok(1));
    }

    #[test]
    fn absolute_honours_explicit_offsets() {
        let config = load(&[("mode", "absolute"), ("target", "2030-05-01T13:00:00Z")]).unwrap();
        assert_eq!(config.deadline(), now() + Duration::hours(1));

        let config = load(&[("mode", "absolute"), ("target", "2030-05-01T15:00:00+02:00")])
            .unwrap();
        assert_eq!(config.deadline(), now() + Duration::hours(1));
    }

    #[test]
    fn absolute_without_offset_uses_timezone() {
        let config = load(&[
            ("mode", "absolute"),
            ("target", "2030-05-01T09:00"),
            ("tz", "America/New_York"),
        ])
        .unwrap();
        // 09:00 EDT is 13:00 UTC.
        assert_eq!(config.deadline(), now() + Duration::hours(1));
    }

    #[test]
    fn mode_is_inferred_when_absent() {
        let config = load(&[("duration", "60")]).unwrap();
        assert_eq!(config.mode(), CountdownMode::Timer);
        let config = load(&[("target", "2099-01-01T00:00:00Z")]).unwrap();
        assert_eq!(config.mode(), CountdownMode::Absolute);
        let config = load(&[("target", "2099-01-01")]).unwrap();
        assert_eq!(config.mode(), CountdownMode::WallClock);
    }

    #[test]
    fn unknown_timezone_falls_back() {
        let config = load(&[
            ("mode", "wall-clock"),
            ("target", "2099-01-01T00:00"),
            ("tz", "Nowhere/Special"),
        ])
        .unwrap();
        assert_eq!(*config.timezone(), Tz::UTC);
    }

    #[test]
    fn malformed_target_is_rejected() {
        assert!(matches!(
            load(&[("mode", "wall-clock"), ("target", "next tuesday")]),
            Err(ConfigError::InvalidTarget(_))
        ));
        assert!(matches!(
            load(&[("mode", "absolute"), ("target", "2099-13-40T00:00Z")]),
            Err(ConfigError::InvalidTarget(_))
        ));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = load(&[
            ("mode", "timer"),
            ("duration", "10"),
            ("theme", "  "),
            ("message", "Launch!"),
        ])
        .unwrap();
        assert_eq!(config.theme(), DEFAULT_THEME);
        assert_eq!(config.message(), "Launch!");
    }
}
