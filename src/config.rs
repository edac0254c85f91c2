//! Application-level configuration constants.

// Clock
pub const TICK_MS: u32 = 1_000;
pub const CELEBRATION_DURATION_MS: i64 = 6_000;

// Query parameter limits
pub const MIN_DURATION_SECS: u64 = 1;
pub const MAX_DURATION_SECS: u64 = 31_536_000;

// Default values for optional parameters
pub const DEFAULT_THEME: &str = "contribution-graph";
pub const DEFAULT_MESSAGE: &str = "Time's up!";
pub const FALLBACK_TIMEZONE: &str = "UTC";

// Browser environment
pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";
pub const REDUCED_MOTION_ATTR: &str = "data-reduced-motion";
pub const ACTIVE_COUNT_ATTR: &str = "data-active-count";

// UI constants
pub const LAYOUT_BREAKPOINT_PX: f64 = 1050.0;
pub const DOCUMENT_TITLE_SUFFIX: &str = "Countdown";
