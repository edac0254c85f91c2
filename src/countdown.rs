//! Countdown data model and the time engine.
//!
//! Everything here is pure: `compute_remaining` reads nothing but its
//! arguments, so the orchestrator can poll it on any cadence and tests can
//! drive it with synthetic instants.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::CELEBRATION_DURATION_MS;
use crate::timezone::wall_clock_to_utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountdownMode {
    Timer,
    Absolute,
    WallClock,
}

impl CountdownMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountdownMode::Timer => "timer",
            CountdownMode::Absolute => "absolute",
            CountdownMode::WallClock => "wall-clock",
        }
    }
}

impl fmt::Display for CountdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountdownMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "timer" => Ok(CountdownMode::Timer),
            "absolute" => Ok(CountdownMode::Absolute),
            "wall-clock" => Ok(CountdownMode::WallClock),
            _ => Err(()),
        }
    }
}

/// What the countdown runs towards. Exactly one shape per mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownTarget {
    /// Fixed duration measured from the instant the config was loaded.
    Timer {
        duration_secs: u64,
        started_at: DateTime<Utc>,
    },
    Absolute(DateTime<Utc>),
    /// Abstract local fields, resolved against the config's timezone.
    WallClock(NaiveDateTime),
}

/// Immutable countdown settings, built once by the parameter loader.
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownConfig {
    target: CountdownTarget,
    timezone: Tz,
    theme: String,
    message: String,
}

impl CountdownConfig {
    pub fn new(target: CountdownTarget, timezone: Tz, theme: String, message: String) -> Self {
        Self {
            target,
            timezone,
            theme,
            message,
        }
    }

    pub fn mode(&self) -> CountdownMode {
        match self.target {
            CountdownTarget::Timer { .. } => CountdownMode::Timer,
            CountdownTarget::Absolute(_) => CountdownMode::Absolute,
            CountdownTarget::WallClock(_) => CountdownMode::WallClock,
        }
    }

    pub fn target(&self) -> &CountdownTarget {
        &self.target
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Same countdown, different theme. Used when the user switches themes.
    pub fn with_theme(&self, theme: &str) -> Self {
        Self {
            theme: theme.to_string(),
            ..self.clone()
        }
    }

    /// The absolute instant at which the countdown reaches zero.
    pub fn deadline(&self) -> DateTime<Utc> {
        match &self.target {
            CountdownTarget::Timer {
                duration_secs,
                started_at,
            } => *started_at + Duration::seconds(*duration_secs as i64),
            CountdownTarget::Absolute(at) => *at,
            CountdownTarget::WallClock(local) => wall_clock_to_utc(local, &self.timezone),
        }
    }
}

/// Remaining time broken into display units. `total` is in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeRemaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub total: u64,
}

impl TimeRemaining {
    pub const ZERO: TimeRemaining = TimeRemaining {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        total: 0,
    };

    pub fn from_total_secs(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
            total,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total == 0
    }

    /// `DD:HH:MM:SS` when at least a day remains, `HH:MM:SS` otherwise.
    pub fn clock_label(&self) -> String {
        if self.days > 0 {
            format!(
                "{:02}:{:02}:{:02}:{:02}",
                self.days, self.hours, self.minutes, self.seconds
            )
        } else {
            format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
        }
    }
}

/// Time left until `config`'s deadline as seen at `now`.
///
/// Partial seconds round up so zero is only reported once the deadline has
/// actually passed. Never negative.
pub fn compute_remaining(config: &CountdownConfig, now: DateTime<Utc>) -> TimeRemaining {
    let diff_ms = (config.deadline() - now).num_milliseconds();
    if diff_ms <= 0 {
        return TimeRemaining::ZERO;
    }
    TimeRemaining::from_total_secs((diff_ms as u64).div_ceil(1_000))
}

/// One-directional celebration progress: counting → celebrating → celebrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelebrationState {
    Counting,
    Celebrating { since: DateTime<Utc> },
    Celebrated,
}

impl CelebrationState {
    /// Advance given a fresh reading. Repeated zero readings are idempotent.
    pub fn advance(self, remaining: &TimeRemaining, now: DateTime<Utc>) -> Self {
        match self {
            CelebrationState::Counting if remaining.is_complete() => {
                CelebrationState::Celebrating { since: now }
            }
            CelebrationState::Celebrating { since }
                if now - since >= Duration::milliseconds(CELEBRATION_DURATION_MS) =>
            {
                CelebrationState::Celebrated
            }
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CelebrationState::Counting => "counting",
            CelebrationState::Celebrating { .. } => "celebrating",
            CelebrationState::Celebrated => "celebrated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap()
    }

    fn timer(duration_secs: u64) -> CountdownConfig {
        CountdownConfig::new(
            CountdownTarget::Timer {
                duration_secs,
                started_at: start(),
            },
            Tz::UTC,
            "starfield".to_string(),
            "done".to_string(),
        )
    }

    fn wall_clock(tz: Tz) -> CountdownConfig {
        let local = NaiveDate::from_ymd_opt(2099, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        CountdownConfig::new(
            CountdownTarget::WallClock(local),
            tz,
            "starfield".to_string(),
            "done".to_string(),
        )
    }

    #[test]
    fn timer_counts_down_one_second_per_tick() {
        let config = timer(300);
        assert_eq!(compute_remaining(&config, start()).total, 300);
        for tick in 1..=300i64 {
            let now = start() + Duration::seconds(tick);
            assert_eq!(compute_remaining(&config, now).total, 300 - tick as u64);
        }
        assert!(compute_remaining(&config, start() + Duration::seconds(300)).is_complete());
    }

    #[test]
    fn total_is_non_increasing_and_clamps_at_zero() {
        let configs = [
            timer(90),
            CountdownConfig::new(
                CountdownTarget::Absolute(start() + Duration::minutes(2)),
                Tz::UTC,
                "fireworks".to_string(),
                "done".to_string(),
            ),
        ];
        for config in &configs {
            let mut previous = u64::MAX;
            for step in 0..400i64 {
                let now = start() + Duration::milliseconds(step * 750);
                let remaining = compute_remaining(config, now);
                assert!(remaining.total <= previous);
                previous = remaining.total;
            }
            assert_eq!(previous, 0);
        }
    }

    #[test]
    fn partial_seconds_round_up() {
        let config = timer(10);
        let now = start() + Duration::milliseconds(9_001);
        assert_eq!(compute_remaining(&config, now).total, 1);
        let now = start() + Duration::milliseconds(10_001);
        assert_eq!(compute_remaining(&config, now), TimeRemaining::ZERO);
    }

    #[test]
    fn compute_is_deterministic() {
        let config = wall_clock(Tz::Europe__Berlin);
        let now = start();
        assert_eq!(compute_remaining(&config, now), compute_remaining(&config, now));
    }

    #[test]
    fn wall_clock_resolves_against_timezone() {
        let now = start();
        let utc = compute_remaining(&wall_clock(Tz::UTC), now);
        let new_york = compute_remaining(&wall_clock(Tz::America__New_York), now);
        assert_eq!(new_york.total - utc.total, 5 * 3_600);
    }

    #[test]
    fn units_split() {
        let remaining = TimeRemaining::from_total_secs(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
        assert_eq!(
            (remaining.days, remaining.hours, remaining.minutes, remaining.seconds),
            (2, 3, 4, 5)
        );
        assert_eq!(remaining.clock_label(), "02:03:04:05");
        assert_eq!(TimeRemaining::from_total_secs(65).clock_label(), "00:01:05");
    }

    #[test]
    fn celebration_is_one_directional() {
        let now = start();
        let live = TimeRemaining::from_total_secs(5);
        let state = CelebrationState::Counting.advance(&live, now);
        assert_eq!(state, CelebrationState::Counting);

        let state = state.advance(&TimeRemaining::ZERO, now);
        assert_eq!(state, CelebrationState::Celebrating { since: now });

        // Repeated zero readings do not restart the celebration.
        let later = now + Duration::seconds(1);
        assert_eq!(
            state.advance(&TimeRemaining::ZERO, later),
            CelebrationState::Celebrating { since: now }
        );

        let done = now + Duration::milliseconds(CELEBRATION_DURATION_MS);
        let state = state.advance(&TimeRemaining::ZERO, done);
        assert_eq!(state, CelebrationState::Celebrated);
        assert_eq!(state.advance(&live, done), CelebrationState::Celebrated);
    }

    #[test]
    fn mode_follows_target_shape() {
        assert_eq!(timer(1).mode(), CountdownMode::Timer);
        assert_eq!(wall_clock(Tz::UTC).mode(), CountdownMode::WallClock);
        assert_eq!("wall-clock".parse::<CountdownMode>(), Ok(CountdownMode::WallClock));
        assert!("later".parse::<CountdownMode>().is_err());
    }
}
