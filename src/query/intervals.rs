use crate::error::QueryError;
use crate::logic::{
    Interval, IntervalLength, MarketDescriptor, TradingViewInterval, bucket_bounds, datetime_from_epoch, rollup_intervals,
};
use crate::storage::{IntervalStorage, MarketStorage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Read path for interval series.
///
/// Every answer is contiguous and ascending: buckets without a stored row are
/// filled with zero-valued placeholders. A series never reaches back past the
/// market's creation, so young markets get fewer than `limit` points.
pub struct IntervalQueryService {
    markets: Arc<dyn MarketStorage>,
    intervals: Arc<dyn IntervalStorage>,
    lengths: Vec<IntervalLength>,
}

impl IntervalQueryService {
    pub fn new(
        markets: Arc<dyn MarketStorage>,
        intervals: Arc<dyn IntervalStorage>,
        lengths: Vec<IntervalLength>,
    ) -> Self {
        Self { markets, intervals, lengths }
    }

    pub async fn get_intervals(&self, market_id: &str, minutes: u32, limit: usize) -> Result<Vec<Interval>, QueryError> {
        self.get_intervals_at(market_id, minutes, limit, Utc::now()).await
    }

    /// `limit == 0` returns every bucket since the market was created.
    pub async fn get_intervals_at(
        &self,
        market_id: &str,
        minutes: u32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Interval>, QueryError> {
        let length = self.resolve_length(minutes)?;
        let market = self.market(market_id).await?;
        let window_start = window_start(&market, length, limit, now);

        let stored = self.intervals.get_intervals_in_range(market_id, length, window_start).await?;
        if limit > 0 && stored.len() == limit {
            let mut rows: Vec<Interval> = stored.into_values().collect();
            rows.sort_by_key(Interval::start_epoch);
            return Ok(rows);
        }

        debug!(market_id, %length, stored = stored.len(), limit, "Filling interval gaps");
        Ok(fill_gaps(stored, length, window_start.timestamp(), now.timestamp(), limit, |start| {
            Interval::placeholder(market_id, length, datetime_from_epoch(start), datetime_from_epoch(start + length.seconds()))
        }))
    }

    pub async fn get_trading_view_intervals(
        &self,
        market_id: &str,
        minutes: u32,
        limit: usize,
    ) -> Result<Vec<TradingViewInterval>, QueryError> {
        self.get_trading_view_intervals_at(market_id, minutes, limit, Utc::now()).await
    }

    /// Candles coarser than an hour are rolled up from the stored hourly rows
    /// when hourly rows are materialized.
    pub async fn get_trading_view_intervals_at(
        &self,
        market_id: &str,
        minutes: u32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<TradingViewInterval>, QueryError> {
        let length = self.resolve_length(minutes)?;
        let market = self.market(market_id).await?;
        let window_start = window_start(&market, length, limit, now);
        let since = window_start.timestamp();

        let candles: HashMap<i64, TradingViewInterval> =
            if length > IntervalLength::ONE_HOUR && self.lengths.contains(&IntervalLength::ONE_HOUR) {
                let hourly = self
                    .intervals
                    .get_intervals_in_range(market_id, IntervalLength::ONE_HOUR, window_start)
                    .await?;
                let rows: Vec<Interval> = hourly.into_values().collect();
                // a coarse bucket straddling the window start would only be partially covered
                rollup_intervals(&rows, length).into_iter().filter(|(start, _)| *start >= since).collect()
            } else {
                self.intervals
                    .get_intervals_in_range(market_id, length, window_start)
                    .await?
                    .into_iter()
                    .map(|(start, row)| (start, TradingViewInterval::from(&row)))
                    .collect()
            };

        Ok(fill_gaps(candles, length, since, now.timestamp(), limit, |start| {
            TradingViewInterval::placeholder(datetime_from_epoch(start))
        }))
    }

    fn resolve_length(&self, minutes: u32) -> Result<IntervalLength, QueryError> {
        IntervalLength::new(minutes)
            .filter(|length| self.lengths.contains(length))
            .ok_or(QueryError::InvalidLength(minutes))
    }

    async fn market(&self, market_id: &str) -> Result<MarketDescriptor, QueryError> {
        self.markets.get_market(market_id).await?.ok_or_else(|| QueryError::MarketNotFound(market_id.to_string()))
    }
}

/// Start of the requested series: `limit` buckets back from `now`, but never
/// before the market was created.
fn window_start(market: &MarketDescriptor, length: IntervalLength, limit: usize, now: DateTime<Utc>) -> DateTime<Utc> {
    if limit == 0 {
        return market.created_at;
    }

    let span = length.seconds().saturating_mul(i64::try_from(limit).unwrap_or(i64::MAX));
    datetime_from_epoch(now.timestamp().saturating_sub(span)).max(market.created_at)
}

/// Walks back one bucket at a time from the bucket holding `now` while the
/// bucket starts at or after `window_start`, taking stored rows and
/// synthesizing the missing ones. At most `limit` points are produced
/// (unbounded when `limit == 0`); the result is ascending.
pub(crate) fn fill_gaps<T>(
    mut stored: HashMap<i64, T>,
    length: IntervalLength,
    window_start: i64,
    now: i64,
    limit: usize,
    placeholder: impl Fn(i64) -> T,
) -> Vec<T> {
    let max_points = if limit == 0 { usize::MAX } else { limit };
    let width = length.seconds();
    let (mut cursor, _) = bucket_bounds(now, length);

    let mut series = Vec::new();
    while cursor >= window_start && series.len() < max_points {
        series.push(stored.remove(&cursor).unwrap_or_else(|| placeholder(cursor)));
        cursor -= width;
    }

    series.reverse();
    series
}
