use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relative window used when no usable time range is supplied.
pub const DEFAULT_RECENT_SECONDS: u64 = 30 * 60;

/// Time window a list view queries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeRange {
    /// The last `seconds` seconds, anchored at the moment of resolution.
    Recent { seconds: u64 },
    /// Fixed `[start, end]` window in unix seconds.
    Absolute { start: i64, end: i64 },
}

impl TimeRange {
    pub fn recent(seconds: u64) -> Self {
        TimeRange::Recent { seconds }
    }

    /// Builds an absolute window; bounds supplied in the wrong order are swapped.
    pub fn absolute(start: i64, end: i64) -> Self {
        if start <= end {
            TimeRange::Absolute { start, end }
        } else {
            TimeRange::Absolute {
                start: end,
                end: start,
            }
        }
    }

    pub fn is_recent(&self) -> bool {
        matches!(self, TimeRange::Recent { .. })
    }

    /// Resolves the range into concrete unix-second bounds relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedRange {
        match *self {
            TimeRange::Recent { seconds } => {
                let end = now.timestamp();
                let span = i64::try_from(seconds).unwrap_or(i64::MAX);
                ResolvedRange {
                    begin: end.saturating_sub(span),
                    end,
                }
            }
            TimeRange::Absolute { start, end } => ResolvedRange { begin: start, end },
        }
    }

    /// Resolves the range against the current wall clock.
    pub fn resolve_now(&self) -> ResolvedRange {
        self.resolve(Utc::now())
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::recent(DEFAULT_RECENT_SECONDS)
    }
}

/// Concrete `[begin, end]` window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub begin: i64,
    pub end: i64,
}

impl ResolvedRange {
    pub fn duration_secs(&self) -> i64 {
        self.end - self.begin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn recent_range_is_anchored_at_now() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let resolved = TimeRange::recent(1800).resolve(now);
        assert_eq!(resolved.end, 1_700_000_000);
        assert_eq!(resolved.begin, 1_700_000_000 - 1800);
        assert_eq!(resolved.duration_secs(), 1800);
    }

    #[test]
    fn absolute_range_swaps_inverted_bounds() {
        let range = TimeRange::absolute(200, 100);
        assert_eq!(range, TimeRange::Absolute { start: 100, end: 200 });
        let resolved = range.resolve(Utc::now());
        assert_eq!((resolved.begin, resolved.end), (100, 200));
    }

    #[test]
    fn default_is_last_thirty_minutes() {
        assert_eq!(TimeRange::default(), TimeRange::Recent { seconds: 1800 });
    }
}
