use super::provider::{ChainClient, EventSource, RawEvent};
use crate::logic::{AggregatedOrder, HistoryOrder, LiquidityPool, MarketDescriptor, OrderSide, Trade};
use crate::storage::{HistoryStorage, MemoryStorage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Counts concurrent holders per key and remembers the highest count seen.
#[derive(Debug, Default)]
pub struct InFlight {
    current: Mutex<HashMap<String, usize>>,
    max_per_key: AtomicUsize,
    total: AtomicUsize,
    max_total: AtomicUsize,
}

impl InFlight {
    pub fn enter(&self, key: &str) {
        let now = {
            let mut current = self.current.lock().unwrap();
            let count = current.entry(key.to_string()).or_default();
            *count += 1;
            *count
        };
        self.max_per_key.fetch_max(now, Ordering::SeqCst);
        let total = self.total.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_total.fetch_max(total, Ordering::SeqCst);
    }

    pub fn exit(&self, key: &str) {
        if let Some(count) = self.current.lock().unwrap().get_mut(key) {
            *count -= 1;
        }
        self.total.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max_per_key(&self) -> usize {
        self.max_per_key.load(Ordering::SeqCst)
    }

    pub fn max_total(&self) -> usize {
        self.max_total.load(Ordering::SeqCst)
    }
}

/// Scriptable chain: history is served newest first with offset pagination keys.
#[derive(Debug, Default)]
pub struct MockChain {
    markets: Mutex<Vec<MarketDescriptor>>,
    history: Mutex<HashMap<String, Vec<HistoryOrder>>>,
    orders: Mutex<HashMap<(String, OrderSide), Vec<AggregatedOrder>>>,
    pools: Mutex<Vec<LiquidityPool>>,
    history_delay: Mutex<Option<Duration>>,
    pub history_calls: AtomicUsize,
    pub history_in_flight: InFlight,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_market(&self, market: MarketDescriptor) {
        self.markets.lock().unwrap().push(market);
    }

    pub fn add_history(&self, order: HistoryOrder) {
        let mut history = self.history.lock().unwrap();
        let orders = history.entry(order.market_id.clone()).or_default();
        orders.push(order);
        orders.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
    }

    pub fn set_orders(&self, market_id: &str, side: OrderSide, orders: Vec<AggregatedOrder>) {
        self.orders.lock().unwrap().insert((market_id.to_string(), side), orders);
    }

    pub fn set_pool(&self, pool: LiquidityPool) {
        let mut pools = self.pools.lock().unwrap();
        pools.retain(|stored| stored.id != pool.id);
        pools.push(pool);
    }

    pub fn set_history_delay(&self, delay: Duration) {
        *self.history_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_market_history(
        &self,
        market_id: &str,
        limit: usize,
        pagination_key: Option<String>,
    ) -> Result<(Vec<HistoryOrder>, Option<String>)> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.history_in_flight.enter(market_id);
        let delay = *self.history_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let offset: usize = match pagination_key {
            Some(key) => key.parse().map_err(|_| eyre!("bad pagination key {key}"))?,
            None => 0,
        };
        let all = self.history.lock().unwrap().get(market_id).cloned().unwrap_or_default();
        let page: Vec<HistoryOrder> = all.iter().skip(offset).take(limit).cloned().collect();
        let next = (offset + limit < all.len()).then(|| (offset + limit).to_string());

        self.history_in_flight.exit(market_id);
        Ok((page, next))
    }

    async fn get_all_markets(&self) -> Result<Vec<MarketDescriptor>> {
        Ok(self.markets.lock().unwrap().clone())
    }

    async fn get_active_orders(&self, market_id: &str, side: OrderSide) -> Result<Vec<AggregatedOrder>> {
        Ok(self.orders.lock().unwrap().get(&(market_id.to_string(), side)).cloned().unwrap_or_default())
    }

    async fn get_all_liquidity_pools(&self) -> Result<Vec<LiquidityPool>> {
        Ok(self.pools.lock().unwrap().clone())
    }

    async fn get_liquidity_pool(&self, pool_id: &str) -> Result<Option<LiquidityPool>> {
        Ok(self.pools.lock().unwrap().iter().find(|pool| pool.id == pool_id).cloned())
    }
}

/// History storage wrapper that can slow down reads and fail mark-processed calls.
#[derive(Debug)]
pub struct InstrumentedHistory {
    inner: Arc<MemoryStorage>,
    pub fail_marks: AtomicBool,
    read_delay: Option<Duration>,
    pub in_flight: InFlight,
}

impl InstrumentedHistory {
    pub fn new(inner: Arc<MemoryStorage>, read_delay: Option<Duration>) -> Self {
        Self { inner, fail_marks: AtomicBool::new(false), read_delay, in_flight: InFlight::default() }
    }
}

#[async_trait]
impl HistoryStorage for InstrumentedHistory {
    async fn get_last_trade(&self, market_id: &str) -> Result<Option<Trade>> {
        self.inner.get_last_trade(market_id).await
    }

    async fn save_trades(&self, market_id: &str, trades: Vec<Trade>, clear_executed_at: &[DateTime<Utc>]) -> Result<()> {
        self.inner.save_trades(market_id, trades, clear_executed_at).await
    }

    async fn get_oldest_unprocessed_trade(&self, market_id: &str) -> Result<Option<Trade>> {
        self.inner.get_oldest_unprocessed_trade(market_id).await
    }

    async fn get_trades_since(&self, market_id: &str, since: DateTime<Utc>) -> Result<Vec<Trade>> {
        self.in_flight.enter(market_id);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let trades = self.inner.get_trades_since(market_id, since).await;
        self.in_flight.exit(market_id);
        trades
    }

    async fn mark_trades_processed(&self, ids: &[u64]) -> Result<()> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(eyre!("storage unavailable"));
        }
        self.inner.mark_trades_processed(ids).await
    }
}

/// Event source whose subscriptions are fed by the test.
#[derive(Debug, Default)]
pub struct MockEventSource {
    senders: Mutex<Vec<mpsc::Sender<RawEvent>>>,
    pub fail_subscribe: AtomicBool,
    pub fail_heartbeat: AtomicBool,
    pub subscribe_calls: AtomicUsize,
    pub heartbeats: AtomicUsize,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to the latest subscription; false when there is none.
    pub async fn emit(&self, event: RawEvent) -> bool {
        let sender = self.senders.lock().unwrap().last().cloned();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Drops every open subscription, as a lost connection would.
    pub fn disconnect(&self) {
        self.senders.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn subscribe(&self, buffer: usize) -> Result<mpsc::Receiver<RawEvent>> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(eyre!("connection refused"));
        }

        let (tx, rx) = mpsc::channel(buffer);
        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn heartbeat(&self) -> Result<()> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        if self.fail_heartbeat.load(Ordering::SeqCst) {
            return Err(eyre!("keep alive rejected"));
        }
        Ok(())
    }
}
