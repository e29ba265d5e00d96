use super::config::SyncConfig;
use super::history::HistorySync;
use super::intervals::IntervalSync;
use super::liquidity::LiquidityPoolSync;
use super::markets::MarketSync;
use super::orders::OrderSync;
use super::provider::ChainClient;
use super::swaps::SwapSync;
use crate::storage::{HistoryStorage, IntervalStorage, LiquidityStorage, MarketStorage, OrderStorage, Storage};
use crate::utils::NamedLocker;
use std::sync::Arc;

/// The sync jobs, wired to one chain client, one locker and their storage.
#[derive(Clone)]
pub struct SyncJobs {
    pub history: Arc<HistorySync>,
    pub swaps: Arc<SwapSync>,
    pub intervals: Arc<IntervalSync>,
    pub orders: Arc<OrderSync>,
    pub markets: Arc<MarketSync>,
    pub liquidity: Arc<LiquidityPoolSync>,
}

impl SyncJobs {
    pub fn from_storage<S: Storage + 'static>(
        chain: Arc<dyn ChainClient>,
        storage: Arc<S>,
        locker: Arc<NamedLocker>,
        config: &SyncConfig,
    ) -> Self {
        let history: Arc<dyn HistoryStorage> = storage.clone();
        let intervals: Arc<dyn IntervalStorage> = storage.clone();
        let orders: Arc<dyn OrderStorage> = storage.clone();
        let markets: Arc<dyn MarketStorage> = storage.clone();
        let pools: Arc<dyn LiquidityStorage> = storage;

        Self::from_parts(chain, history, intervals, orders, markets, pools, locker, config)
    }

    /// Wires the jobs against separately provided storage seams.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        chain: Arc<dyn ChainClient>,
        history: Arc<dyn HistoryStorage>,
        intervals: Arc<dyn IntervalStorage>,
        orders: Arc<dyn OrderStorage>,
        markets: Arc<dyn MarketStorage>,
        pools: Arc<dyn LiquidityStorage>,
        locker: Arc<NamedLocker>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            history: Arc::new(HistorySync::new(
                chain.clone(),
                history.clone(),
                locker.clone(),
                config.history_page_size,
            )),
            swaps: Arc::new(SwapSync::new(history.clone(), locker.clone())),
            intervals: Arc::new(IntervalSync::new(
                history,
                intervals,
                locker.clone(),
                config.interval_lengths(),
                config.refold_length(),
                config.interval_batch_size,
            )),
            orders: Arc::new(OrderSync::new(chain.clone(), orders, locker.clone())),
            markets: Arc::new(MarketSync::new(chain.clone(), markets.clone())),
            liquidity: Arc::new(LiquidityPoolSync::new(chain, markets, pools, locker)),
        }
    }
}
