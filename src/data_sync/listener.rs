use super::config::SyncConfig;
use super::directory::MarketDirectory;
use super::events::{ChainEvent, EventKind, is_dex_event};
use super::jobs::SyncJobs;
use super::provider::{ChainClient, EventSource, RawEvent};
use crate::logic::{LiquidityPool, MarketDescriptor};
use crate::utils::join_all_collect;
use chrono::Utc;
use eyre::{Result, WrapErr, eyre};
use std::sync::Arc;
use std::time::Duration;
use strum_macros::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// The event named a market or pool that could not be resolved.
    Dropped(String),
    /// Not an event this service reacts to.
    Ignored,
}

/// Routes chain events to the sync jobs and owns the startup synchronization.
pub struct Dispatcher {
    jobs: SyncJobs,
    directory: Arc<MarketDirectory>,
    chain: Arc<dyn ChainClient>,
    history_batch_size: usize,
}

impl Dispatcher {
    pub fn new(
        jobs: SyncJobs,
        directory: Arc<MarketDirectory>,
        chain: Arc<dyn ChainClient>,
        history_batch_size: usize,
    ) -> Self {
        Self { jobs, directory, chain, history_batch_size }
    }

    pub fn directory(&self) -> &Arc<MarketDirectory> {
        &self.directory
    }

    /// Full synchronization: markets and pools under the directory lock, then
    /// history, order book and intervals for every known market. Markets run
    /// concurrently; the three steps of one market run in order.
    pub async fn bootstrap(&self) -> Result<()> {
        info!("Bootstrapping market data");
        {
            let guard = self.directory.lock().await;
            self.jobs.markets.sync_markets().await.wrap_err("bootstrap market sync failed")?;
            self.jobs.liquidity.sync_liquidity_pools().await.wrap_err("bootstrap pool sync failed")?;
            self.directory.load_markets(&guard, self.chain.as_ref()).await?;
            self.directory.load_pools(&guard, self.chain.as_ref()).await?;
        }

        let markets = self.directory.markets().await;
        let report = join_all_collect(markets.iter().map(|market| self.sync_market_full(market))).await;
        if let Some(err) = &report.first_error {
            error!(failed = report.failed, "Bootstrap failed for some markets: {:#}", err);
        }

        info!(markets = markets.len(), failed = report.failed, "Bootstrap finished");
        Ok(())
    }

    async fn sync_market_full(&self, market: &MarketDescriptor) -> Result<()> {
        self.jobs.history.sync_history(market, None).await?;
        self.jobs.orders.sync_market(&market.market_id).await?;
        self.jobs.intervals.sync_intervals(&market.market_id).await?;
        Ok(())
    }

    pub async fn handle_event(&self, event: ChainEvent) -> DispatchOutcome {
        let outcome = match event.kind {
            EventKind::MarketCreated => {
                info!(event = %event.kind, "Syncing markets");
                if let Err(err) = self.jobs.markets.sync_markets().await {
                    error!(event = %event.kind, "Error syncing markets: {:#}", err);
                }
                if let Err(err) = self.directory.reload_markets(self.chain.as_ref()).await {
                    error!(event = %event.kind, "Error refreshing market directory: {:#}", err);
                }
                DispatchOutcome::Handled
            }
            EventKind::OrderExecuted => match self.resolve_market(&event).await {
                Ok(market) => {
                    let market_id = market.market_id.as_str();
                    if let Err(err) = self.jobs.history.sync_history(&market, Some(self.history_batch_size)).await {
                        error!(market_id, "Error syncing history: {:#}", err);
                    }
                    if let Err(err) = self.jobs.intervals.sync_intervals(market_id).await {
                        error!(market_id, "Error syncing intervals: {:#}", err);
                    }
                    self.sync_orders(market_id).await;
                    DispatchOutcome::Handled
                }
                Err(reason) => DispatchOutcome::Dropped(reason),
            },
            EventKind::OrderCanceled | EventKind::OrderSaved => match self.resolve_market(&event).await {
                Ok(market) => {
                    self.sync_orders(&market.market_id).await;
                    DispatchOutcome::Handled
                }
                Err(reason) => DispatchOutcome::Dropped(reason),
            },
            EventKind::PoolCreated => {
                info!(event = %event.kind, "Syncing liquidity pools");
                if let Err(err) = self.jobs.liquidity.sync_liquidity_pools().await {
                    error!(event = %event.kind, "Error syncing liquidity pools: {:#}", err);
                }
                if let Err(err) = self.directory.reload_pools(self.chain.as_ref()).await {
                    error!(event = %event.kind, "Error refreshing pool directory: {:#}", err);
                }
                DispatchOutcome::Handled
            }
            EventKind::LiquidityAdded | EventKind::LiquidityRemoved => match self.resolve_pool(&event).await {
                Ok(pool) => {
                    self.sync_pool(&pool.id).await;
                    DispatchOutcome::Handled
                }
                Err(reason) => DispatchOutcome::Dropped(reason),
            },
            EventKind::Swap => match self.resolve_pool(&event).await {
                Ok(pool) => {
                    let pool_id = pool.id.as_str();
                    match self.jobs.swaps.sync_swap_event(&event, Utc::now()).await {
                        Ok(_) => {
                            if let Err(err) = self.jobs.intervals.sync_intervals(pool_id).await {
                                error!(pool_id, "Error syncing pool intervals: {:#}", err);
                            }
                        }
                        Err(err) => error!(pool_id, "Error syncing swap event: {:#}", err),
                    }
                    self.sync_pool(pool_id).await;
                    DispatchOutcome::Handled
                }
                Err(reason) => DispatchOutcome::Dropped(reason),
            },
            EventKind::Unknown => DispatchOutcome::Ignored,
        };

        match &outcome {
            DispatchOutcome::Dropped(reason) => warn!(event = %event.raw_type, "Dropping event: {}", reason),
            DispatchOutcome::Ignored => debug!(event = %event.raw_type, "Ignoring event"),
            DispatchOutcome::Handled => debug!(event = %event.raw_type, "Event handled"),
        }
        outcome
    }

    async fn sync_orders(&self, market_id: &str) {
        if let Err(err) = self.jobs.orders.sync_market(market_id).await {
            error!(market_id, "Error syncing orders: {:#}", err);
        }
    }

    async fn sync_pool(&self, pool_id: &str) {
        if let Err(err) = self.jobs.liquidity.sync_liquidity_pool(pool_id).await {
            error!(pool_id, "Error syncing liquidity pool: {:#}", err);
        }
    }

    async fn resolve_market(&self, event: &ChainEvent) -> Result<MarketDescriptor, String> {
        let market_id = event.market_id().map_err(|err| err.to_string())?;
        self.directory.market(market_id).await.ok_or_else(|| format!("unknown market {market_id}"))
    }

    async fn resolve_pool(&self, event: &ChainEvent) -> Result<LiquidityPool, String> {
        let pool_id = event.pool_id().map_err(|err| err.to_string())?;
        self.directory.pool(pool_id).await.ok_or_else(|| format!("unknown pool {pool_id}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Subscribed,
    Streaming,
    Reconnecting,
    Stopped,
}

enum StreamEnd {
    Shutdown,
    Closed,
}

/// Keeps the dispatcher fed from the chain subscription.
///
/// Each event is handled on its own task. Tasks still running when the
/// listener stops are awaited before `run` returns.
pub struct Listener {
    dispatcher: Arc<Dispatcher>,
    source: Arc<dyn EventSource>,
    channel_buffer: usize,
    heartbeat_interval: Duration,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
    state_tx: watch::Sender<ListenerState>,
}

impl Listener {
    pub fn new(dispatcher: Arc<Dispatcher>, source: Arc<dyn EventSource>, config: &SyncConfig) -> Self {
        let (state_tx, _) = watch::channel(ListenerState::Disconnected);
        Self {
            dispatcher,
            source,
            channel_buffer: config.event_channel_buffer.max(1),
            heartbeat_interval: config.heartbeat_interval(),
            max_reconnect_attempts: config.max_reconnect_attempts.max(1),
            reconnect_delay: config.reconnect_delay(),
            state_tx,
        }
    }

    pub fn state(&self) -> ListenerState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ListenerState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ListenerState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!("Listener state {} -> {}", current, state);
            *current = state;
            true
        });
    }

    /// Bootstraps, then streams events until `shutdown_rx` fires or the
    /// reconnect budget is exhausted.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        self.dispatcher.bootstrap().await?;

        let heartbeat = self.spawn_heartbeat();
        let mut tasks: JoinSet<DispatchOutcome> = JoinSet::new();
        let mut failed_attempts = 0u32;

        let result = loop {
            self.set_state(ListenerState::Connecting);
            match self.source.subscribe(self.channel_buffer).await {
                Ok(mut events) => {
                    failed_attempts = 0;
                    self.set_state(ListenerState::Subscribed);
                    info!("Subscribed to chain events");

                    match self.stream(&mut events, &mut shutdown_rx, &mut tasks).await {
                        StreamEnd::Shutdown => break Ok(()),
                        StreamEnd::Closed => warn!("Event stream closed"),
                    }
                }
                Err(err) => error!("Event subscription failed: {:#}", err),
            }

            failed_attempts += 1;
            if failed_attempts >= self.max_reconnect_attempts {
                error!("Max reconnection attempts reached, giving up");
                break Err(eyre!("event subscription lost after {} attempts", failed_attempts));
            }

            self.set_state(ListenerState::Reconnecting);
            warn!("Attempting reconnection #{} in {:?}", failed_attempts, self.reconnect_delay);
            tokio::select! {
                _ = sleep(self.reconnect_delay) => {}
                _ = shutdown_rx.recv() => break Ok(()),
            }
        };

        heartbeat.abort();
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!("Event task failed: {}", err);
            }
        }
        self.set_state(ListenerState::Stopped);
        info!("Listener stopped");
        result
    }

    async fn stream(
        &self,
        events: &mut mpsc::Receiver<RawEvent>,
        shutdown_rx: &mut mpsc::Receiver<()>,
        tasks: &mut JoinSet<DispatchOutcome>,
    ) -> StreamEnd {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return StreamEnd::Shutdown,
                received = events.recv() => {
                    let Some(raw) = received else {
                        return StreamEnd::Closed;
                    };
                    self.set_state(ListenerState::Streaming);
                    if !is_dex_event(&raw.kind) {
                        continue;
                    }

                    let dispatcher = Arc::clone(&self.dispatcher);
                    let event = ChainEvent::from(raw);
                    tasks.spawn(async move { dispatcher.handle_event(event).await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = joined {
                        error!("Event task failed: {}", err);
                    }
                }
            }
        }
    }

    fn spawn_heartbeat(&self) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let period = self.heartbeat_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match source.heartbeat().await {
                    Ok(()) => info!("Keep alive request success"),
                    Err(err) => error!("Failed to send keep alive request: {:#}", err),
                }
            }
        })
    }
}
