/// Storage contracts consumed by the sync jobs and the read services.
///
/// Each concern gets its own trait so a job only depends on what it touches.
/// Implementations must make `upsert_intervals` idempotent on
/// `(market_id, length, start_at)` and must surface batch failures as errors.
mod memory;

pub use memory::MemoryStorage;

use crate::logic::{
    Interval, IntervalLength, LiquidityPool, MarketDescriptor, MarketOrder, MarketWithLastPrice, OrderSide, Trade,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use std::collections::HashMap;

#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Newest stored trade of the market, by execution time.
    async fn get_last_trade(&self, market_id: &str) -> Result<Option<Trade>>;

    /// Deletes the market's trades executed at any of `clear_executed_at`, then
    /// inserts `trades` with fresh ids.
    async fn save_trades(&self, market_id: &str, trades: Vec<Trade>, clear_executed_at: &[DateTime<Utc>]) -> Result<()>;

    async fn get_oldest_unprocessed_trade(&self, market_id: &str) -> Result<Option<Trade>>;

    /// Every trade of the market executed at or after `since`, in any order.
    async fn get_trades_since(&self, market_id: &str, since: DateTime<Utc>) -> Result<Vec<Trade>>;

    async fn mark_trades_processed(&self, ids: &[u64]) -> Result<()>;
}

#[async_trait]
pub trait IntervalStorage: Send + Sync {
    async fn upsert_intervals(&self, rows: &[Interval]) -> Result<()>;

    /// Stored rows with `start_at >= since`, keyed by bucket-start epoch seconds.
    async fn get_intervals_in_range(
        &self,
        market_id: &str,
        length: IntervalLength,
        since: DateTime<Utc>,
    ) -> Result<HashMap<i64, Interval>>;
}

#[async_trait]
pub trait MarketStorage: Send + Sync {
    async fn get_market(&self, market_id: &str) -> Result<Option<MarketDescriptor>>;

    async fn get_markets(&self) -> Result<Vec<MarketDescriptor>>;

    /// Inserts only the markets not stored yet and returns how many were new.
    async fn save_markets_if_absent(&self, markets: Vec<MarketDescriptor>) -> Result<usize>;

    /// All markets, each with the price of its latest trade executed after `since`.
    async fn get_markets_with_last_price(&self, since: DateTime<Utc>) -> Result<Vec<MarketWithLastPrice>>;
}

#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Replaces the stored book of `market_id` with `orders`.
    async fn replace_orders(&self, market_id: &str, orders: Vec<MarketOrder>) -> Result<()>;

    /// Best-first: buys by price descending, sells by price ascending.
    async fn get_orders(&self, market_id: &str, side: OrderSide, limit: usize) -> Result<Vec<MarketOrder>>;
}

#[async_trait]
pub trait LiquidityStorage: Send + Sync {
    async fn save_liquidity_pools(&self, pools: Vec<LiquidityPool>) -> Result<()>;

    async fn get_liquidity_pool(&self, pool_id: &str) -> Result<Option<LiquidityPool>>;
}

/// Everything a full deployment needs from one backend.
pub trait Storage: HistoryStorage + IntervalStorage + MarketStorage + OrderStorage + LiquidityStorage {}

impl<T> Storage for T where T: HistoryStorage + IntervalStorage + MarketStorage + OrderStorage + LiquidityStorage {}
