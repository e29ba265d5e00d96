use super::{HistoryStorage, IntervalStorage, LiquidityStorage, MarketStorage, OrderStorage};
use crate::logic::{
    Interval, IntervalLength, LiquidityPool, MarketDescriptor, MarketOrder, MarketWithLastPrice, OrderSide, Trade,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use eyre::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

type IntervalKey = (String, IntervalLength, i64);

/// In-process backend used by tests, benches and single-node setups.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    last_trade_id: AtomicU64,
    trades: DashMap<String, Vec<Trade>>,
    intervals: DashMap<IntervalKey, Interval>,
    markets: DashMap<String, MarketDescriptor>,
    orders: DashMap<String, Vec<MarketOrder>>,
    pools: DashMap<String, LiquidityPool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self, market_id: &str) -> Vec<Trade> {
        let mut trades = self.trades.get(market_id).map(|trades| trades.clone()).unwrap_or_default();
        trades.sort_by_key(|trade| (trade.executed_at, trade.id));
        trades
    }

    /// Stored rows of one market and length, ascending by start.
    pub fn intervals(&self, market_id: &str, length: IntervalLength) -> Vec<Interval> {
        let mut rows: Vec<Interval> = self
            .intervals
            .iter()
            .filter(|entry| entry.key().0 == market_id && entry.key().1 == length)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(Interval::start_epoch);
        rows
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn get_last_trade(&self, market_id: &str) -> Result<Option<Trade>> {
        Ok(self
            .trades
            .get(market_id)
            .and_then(|trades| trades.iter().max_by_key(|trade| (trade.executed_at, trade.id)).cloned()))
    }

    async fn save_trades(&self, market_id: &str, trades: Vec<Trade>, clear_executed_at: &[DateTime<Utc>]) -> Result<()> {
        let clear: HashSet<DateTime<Utc>> = clear_executed_at.iter().copied().collect();
        let mut stored = self.trades.entry(market_id.to_string()).or_default();
        stored.retain(|trade| !clear.contains(&trade.executed_at));

        for mut trade in trades {
            trade.id = self.last_trade_id.fetch_add(1, Ordering::SeqCst) + 1;
            stored.push(trade);
        }

        Ok(())
    }

    async fn get_oldest_unprocessed_trade(&self, market_id: &str) -> Result<Option<Trade>> {
        Ok(self.trades.get(market_id).and_then(|trades| {
            trades.iter().filter(|trade| !trade.processed).min_by_key(|trade| (trade.executed_at, trade.id)).cloned()
        }))
    }

    async fn get_trades_since(&self, market_id: &str, since: DateTime<Utc>) -> Result<Vec<Trade>> {
        Ok(self
            .trades
            .get(market_id)
            .map(|trades| trades.iter().filter(|trade| trade.executed_at >= since).cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_trades_processed(&self, ids: &[u64]) -> Result<()> {
        let ids: HashSet<u64> = ids.iter().copied().collect();
        for mut trades in self.trades.iter_mut() {
            trades.iter_mut().filter(|trade| ids.contains(&trade.id)).for_each(|trade| trade.processed = true);
        }

        Ok(())
    }
}

#[async_trait]
impl IntervalStorage for MemoryStorage {
    async fn upsert_intervals(&self, rows: &[Interval]) -> Result<()> {
        for row in rows {
            self.intervals.insert((row.market_id.clone(), row.length, row.start_epoch()), row.clone());
        }

        Ok(())
    }

    async fn get_intervals_in_range(
        &self,
        market_id: &str,
        length: IntervalLength,
        since: DateTime<Utc>,
    ) -> Result<HashMap<i64, Interval>> {
        Ok(self
            .intervals
            .iter()
            .filter(|entry| {
                let (market, row_length, start) = entry.key();
                market == market_id && *row_length == length && *start >= since.timestamp()
            })
            .map(|entry| (entry.key().2, entry.value().clone()))
            .collect())
    }
}

#[async_trait]
impl MarketStorage for MemoryStorage {
    async fn get_market(&self, market_id: &str) -> Result<Option<MarketDescriptor>> {
        Ok(self.markets.get(market_id).map(|market| market.clone()))
    }

    async fn get_markets(&self) -> Result<Vec<MarketDescriptor>> {
        let mut markets: Vec<MarketDescriptor> = self.markets.iter().map(|market| market.clone()).collect();
        markets.sort_by(|a, b| a.market_id.cmp(&b.market_id));
        Ok(markets)
    }

    async fn save_markets_if_absent(&self, markets: Vec<MarketDescriptor>) -> Result<usize> {
        let mut inserted = 0;
        for market in markets {
            if let Entry::Vacant(entry) = self.markets.entry(market.market_id.clone()) {
                entry.insert(market);
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn get_markets_with_last_price(&self, since: DateTime<Utc>) -> Result<Vec<MarketWithLastPrice>> {
        let markets = self.get_markets().await?;

        Ok(markets
            .into_iter()
            .map(|market| {
                let last_price = self.trades.get(&market.market_id).and_then(|trades| {
                    trades
                        .iter()
                        .filter(|trade| trade.executed_at > since)
                        .max_by_key(|trade| (trade.executed_at, trade.id))
                        .map(|trade| trade.price)
                });
                MarketWithLastPrice { market, last_price }
            })
            .collect())
    }
}

#[async_trait]
impl OrderStorage for MemoryStorage {
    async fn replace_orders(&self, market_id: &str, orders: Vec<MarketOrder>) -> Result<()> {
        self.orders.insert(market_id.to_string(), orders);
        Ok(())
    }

    async fn get_orders(&self, market_id: &str, side: OrderSide, limit: usize) -> Result<Vec<MarketOrder>> {
        let mut orders: Vec<MarketOrder> = self
            .orders
            .get(market_id)
            .map(|orders| orders.iter().filter(|order| order.side == side).cloned().collect())
            .unwrap_or_default();

        match side {
            OrderSide::Buy => orders.sort_by(|a, b| b.price.cmp(&a.price)),
            OrderSide::Sell => orders.sort_by(|a, b| a.price.cmp(&b.price)),
        }
        orders.truncate(limit);

        Ok(orders)
    }
}

#[async_trait]
impl LiquidityStorage for MemoryStorage {
    async fn save_liquidity_pools(&self, pools: Vec<LiquidityPool>) -> Result<()> {
        for pool in pools {
            self.pools.insert(pool.id.clone(), pool);
        }

        Ok(())
    }

    async fn get_liquidity_pool(&self, pool_id: &str) -> Result<Option<LiquidityPool>> {
        Ok(self.pools.get(pool_id).map(|pool| pool.clone()))
    }
}
