mod bucket;
mod group;
mod length;
mod map;
mod rollup;

pub use bucket::IntervalBucket;
pub use group::DurationGroup;
pub use length::{IntervalLength, bucket_bounds, coarsest, get_timestamp_interval};
pub(crate) use length::from_epoch;
pub use map::IntervalsMap;
pub use rollup::rollup_intervals;
