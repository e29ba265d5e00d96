use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Width of one interval bucket, in minutes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalLength(u32);

impl IntervalLength {
    pub const FIVE_MINUTES: IntervalLength = IntervalLength(5);
    pub const QUARTER_HOUR: IntervalLength = IntervalLength(15);
    pub const ONE_HOUR: IntervalLength = IntervalLength(60);
    pub const FOUR_HOURS: IntervalLength = IntervalLength(240);
    pub const ONE_DAY: IntervalLength = IntervalLength(1440);

    /// Lengths materialized for every market unless configured otherwise.
    pub const DEFAULTS: [IntervalLength; 5] =
        [Self::FIVE_MINUTES, Self::QUARTER_HOUR, Self::ONE_HOUR, Self::FOUR_HOURS, Self::ONE_DAY];

    /// Returns `None` for a zero-minute length.
    pub fn new(minutes: u32) -> Option<Self> {
        (minutes > 0).then_some(Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn seconds(&self) -> i64 {
        i64::from(self.0) * 60
    }

    pub fn as_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }
}

impl Display for IntervalLength {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// Half-open `[start, end)` bucket bounds, in epoch seconds, that contain `timestamp`.
///
/// Floors towards negative infinity so pre-epoch timestamps still land in the
/// bucket that contains them.
pub fn bucket_bounds(timestamp: i64, length: IntervalLength) -> (i64, i64) {
    let width = length.seconds();
    let start = timestamp.div_euclid(width) * width;
    (start, start + width)
}

/// Same as [`bucket_bounds`] but returned as UTC datetimes.
pub fn get_timestamp_interval(timestamp: i64, length: IntervalLength) -> (DateTime<Utc>, DateTime<Utc>) {
    let (start, end) = bucket_bounds(timestamp, length);
    (from_epoch(start), from_epoch(end))
}

/// Coarsest of the given lengths, if any.
pub fn coarsest(lengths: &[IntervalLength]) -> Option<IntervalLength> {
    lengths.iter().copied().max()
}

pub(crate) fn from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_floor_of_timestamp() {
        let (start, end) = bucket_bounds(1_700_000_123, IntervalLength::FIVE_MINUTES);
        assert_eq!(start, 1_700_000_100);
        assert_eq!(end, 1_700_000_400);
        assert!(start <= 1_700_000_123 && 1_700_000_123 < end);
    }

    #[test]
    fn test_bucket_function_is_pure() {
        for length in IntervalLength::DEFAULTS {
            let first = get_timestamp_interval(1_650_000_321, length);
            let second = get_timestamp_interval(1_650_000_321, length);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_consecutive_buckets_touch() {
        for length in IntervalLength::DEFAULTS {
            let (start, end) = bucket_bounds(1_650_000_321, length);
            let (next_start, _) = bucket_bounds(end, length);
            let (prev_start, prev_end) = bucket_bounds(start - 1, length);

            assert_eq!(next_start, end);
            assert_eq!(prev_end, start);
            assert_eq!(start - prev_start, length.seconds());
        }
    }

    #[test]
    fn test_negative_timestamps_floor_downwards() {
        let (start, end) = bucket_bounds(-1, IntervalLength::ONE_HOUR);
        assert_eq!(start, -3600);
        assert_eq!(end, 0);
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(IntervalLength::new(0).is_none());
        assert_eq!(IntervalLength::new(60), Some(IntervalLength::ONE_HOUR));
        assert_eq!(coarsest(&IntervalLength::DEFAULTS), Some(IntervalLength::ONE_DAY));
        assert_eq!(coarsest(&[]), None);
    }

    #[test]
    fn test_serializes_as_minutes() {
        assert_eq!(serde_json::to_string(&IntervalLength::FOUR_HOURS).unwrap(), "240");
        assert_eq!(IntervalLength::FOUR_HOURS.to_string(), "240m");
    }
}
