use super::{IntervalLength, bucket_bounds, from_epoch};
use crate::logic::types::{Interval, TradingViewInterval};
use std::collections::BTreeMap;

/// Re-aggregates finer stored rows (hourly in practice) into chart candles of
/// `target` length, keyed by the coarse bucket start.
///
/// Low is the min of lows, high the max of highs, value the summed base
/// volume. Open comes from the earliest fine row of the bucket and close from
/// the latest one.
pub fn rollup_intervals(rows: &[Interval], target: IntervalLength) -> BTreeMap<i64, TradingViewInterval> {
    let mut sorted: Vec<&Interval> = rows.iter().collect();
    sorted.sort_by_key(|row| row.start_epoch());

    let mut candles: BTreeMap<i64, TradingViewInterval> = BTreeMap::new();
    for row in sorted {
        let (start, _) = bucket_bounds(row.start_epoch(), target);
        candles
            .entry(start)
            .and_modify(|candle| {
                candle.low = candle.low.min(row.lowest_price);
                candle.high = candle.high.max(row.highest_price);
                candle.close = row.close_price;
                candle.value += row.base_volume;
            })
            .or_insert_with(|| TradingViewInterval {
                time: from_epoch(start),
                low: row.lowest_price,
                open: row.open_price,
                high: row.highest_price,
                close: row.close_price,
                value: row.base_volume,
            });
    }

    candles
}
