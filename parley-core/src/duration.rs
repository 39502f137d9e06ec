//! Timing knobs carried in parley settings.
//!
//! Typing delays, typing periods and turn deadlines are all written as whole
//! milliseconds in settings files (`{"period": 2000}`, `turn_timeout =
//! 15000`). [`DurationMs`] is that number, converted to a
//! [`std::time::Duration`] at the point where a timer is armed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whole milliseconds, serialized as a bare integer.
///
/// Zero is representable. Whether it is allowed is up to the setting:
/// a zero typing delay shows the indicator at once, while a zero typing
/// period or turn deadline is rejected by the component that owns it.
///
/// ```
/// use parley_core::DurationMs;
/// use std::time::Duration;
///
/// let period: DurationMs = serde_json::from_str("2000").unwrap();
/// assert_eq!(period.to_std(), Duration::from_secs(2));
/// assert_eq!(serde_json::to_string(&DurationMs::from_secs(15)).unwrap(), "15000");
/// assert!(DurationMs::ZERO.is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMs(u64);

impl DurationMs {
    /// No time at all.
    pub const ZERO: Self = Self(0);

    /// `ms` milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// `secs` seconds, saturating at `u64::MAX` milliseconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// The raw millisecond count.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// True for [`DurationMs::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The value as a timer argument.
    pub fn to_std(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

/// Sub-millisecond precision is truncated; spans past `u64::MAX`
/// milliseconds saturate.
impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        d.to_std()
    }
}

impl Default for DurationMs {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for DurationMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
