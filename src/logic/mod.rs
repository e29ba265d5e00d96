/// Logic Layer - pure market-data computation
///
/// This layer holds everything that does not touch the chain or storage:
/// - Row types shared with storage and the read API
/// - Deterministic bucketing and multi-length OHLCV aggregation
/// - Hourly-to-coarser candle rollup for chart consumers
/// - Ticker folding and price-change calculation

pub mod interval;
pub mod ticker;
pub mod types;

pub use interval::{
    DurationGroup, IntervalBucket, IntervalLength, IntervalsMap, bucket_bounds, coarsest, get_timestamp_interval,
    rollup_intervals,
};
pub use ticker::{Ticker, TickerSummary, calculate_price_change};
pub use types::{
    AggregatedOrder, HistoryOrder, Interval, LiquidityPool, MarketDescriptor, MarketOrder, MarketWithLastPrice,
    OrderSide, Trade, TradingViewInterval, datetime_from_epoch, market_id, pool_id,
};
