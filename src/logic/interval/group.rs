use super::{IntervalBucket, IntervalLength, bucket_bounds, from_epoch};
use crate::logic::types::{Interval, Trade};
use dashmap::DashMap;
use eyre::Result;

/// Buckets of a single length for a single market, keyed by bucket start.
///
/// Folding goes through the dashmap entry guard, so a bucket is never updated
/// by two trades at once even when trades are folded from several threads.
#[derive(Debug)]
pub struct DurationGroup {
    length: IntervalLength,
    buckets: DashMap<i64, IntervalBucket>,
}

impl DurationGroup {
    pub fn new(length: IntervalLength) -> Self {
        Self { length, buckets: DashMap::new() }
    }

    pub fn length(&self) -> IntervalLength {
        self.length
    }

    pub fn add_trade(&self, trade: &Trade) -> Result<()> {
        let (start, end) = bucket_bounds(trade.executed_at.timestamp(), self.length);
        self.buckets
            .entry(start)
            .or_insert_with(|| IntervalBucket::new(from_epoch(start), from_epoch(end), self.length))
            .add_trade(trade)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Exported rows, ascending by start.
    pub fn intervals(&self, market_id: &str) -> Vec<Interval> {
        let mut rows: Vec<Interval> = self.buckets.iter().map(|bucket| bucket.to_interval(market_id)).collect();
        rows.sort_by_key(Interval::start_epoch);
        rows
    }
}
