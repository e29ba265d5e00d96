use super::provider::ChainClient;
use crate::logic::LiquidityPool;
use crate::storage::{LiquidityStorage, MarketStorage};
use crate::utils::{LP_LOCK_KEY, NamedLocker};
use chrono::Utc;
use eyre::{Result, WrapErr, eyre};
use std::sync::Arc;
use tracing::info;

/// Mirrors liquidity pools into storage and registers each pool as a market
/// keyed by its pool id. All pool syncs share one lock.
pub struct LiquidityPoolSync {
    chain: Arc<dyn ChainClient>,
    markets: Arc<dyn MarketStorage>,
    pools: Arc<dyn LiquidityStorage>,
    locker: Arc<NamedLocker>,
}

impl LiquidityPoolSync {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        markets: Arc<dyn MarketStorage>,
        pools: Arc<dyn LiquidityStorage>,
        locker: Arc<NamedLocker>,
    ) -> Self {
        Self { chain, markets, pools, locker }
    }

    pub async fn sync_liquidity_pools(&self) -> Result<usize> {
        let _guard = self.locker.lock(LP_LOCK_KEY).await;

        let pools = self.chain.get_all_liquidity_pools().await.wrap_err("failed to fetch liquidity pools")?;
        if pools.is_empty() {
            info!("No liquidity pools found");
            return Ok(0);
        }

        info!("Saving {} liquidity pools", pools.len());
        let count = pools.len();
        self.save(pools).await?;
        Ok(count)
    }

    pub async fn sync_liquidity_pool(&self, pool_id: &str) -> Result<()> {
        let _guard = self.locker.lock(LP_LOCK_KEY).await;

        let pool = self
            .chain
            .get_liquidity_pool(pool_id)
            .await
            .wrap_err_with(|| format!("failed to fetch liquidity pool {pool_id}"))?
            .ok_or_else(|| eyre!("liquidity pool {} not found on chain", pool_id))?;

        info!(pool_id, "Saving liquidity pool");
        self.save(vec![pool]).await
    }

    async fn save(&self, pools: Vec<LiquidityPool>) -> Result<()> {
        let now = Utc::now();
        let markets = pools.iter().map(|pool| pool.market_descriptor(now)).collect();

        self.markets.save_markets_if_absent(markets).await.wrap_err("failed to save pool markets")?;
        self.pools.save_liquidity_pools(pools).await.wrap_err("failed to save liquidity pools")
    }
}
