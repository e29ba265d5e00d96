use super::provider::ChainClient;
use crate::logic::{LiquidityPool, MarketDescriptor};
use crate::utils::{DIRECTORY_LOCK_KEY, NamedLockGuard, NamedLocker};
use eyre::{Result, WrapErr};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// In-memory view of the markets and pools known on chain, used to resolve
/// event attributes.
///
/// Rebuilds are serialized by the directory lock key. Readers never take the
/// named lock; they see either the old or the new map, never a mix.
#[derive(Debug)]
pub struct MarketDirectory {
    locker: Arc<NamedLocker>,
    markets: RwLock<HashMap<String, MarketDescriptor>>,
    pools: RwLock<HashMap<String, LiquidityPool>>,
}

impl MarketDirectory {
    pub fn new(locker: Arc<NamedLocker>) -> Self {
        Self { locker, markets: RwLock::new(HashMap::new()), pools: RwLock::new(HashMap::new()) }
    }

    /// Takes the directory lock. The guard is the proof required by the `load_*` methods.
    pub async fn lock(&self) -> NamedLockGuard {
        self.locker.lock(DIRECTORY_LOCK_KEY).await
    }

    pub async fn reload_markets(&self, chain: &dyn ChainClient) -> Result<usize> {
        let guard = self.lock().await;
        self.load_markets(&guard, chain).await
    }

    pub async fn reload_pools(&self, chain: &dyn ChainClient) -> Result<usize> {
        let guard = self.lock().await;
        self.load_pools(&guard, chain).await
    }

    /// Replaces the market map wholesale. On error the previous map is kept.
    pub async fn load_markets(&self, _guard: &NamedLockGuard, chain: &dyn ChainClient) -> Result<usize> {
        let markets = chain.get_all_markets().await.wrap_err("failed to fetch markets for the directory")?;
        let markets: HashMap<String, MarketDescriptor> =
            markets.into_iter().map(|market| (market.market_id.clone(), market)).collect();
        let count = markets.len();

        *self.markets.write().await = markets;
        info!("Market directory refreshed with {} markets", count);
        Ok(count)
    }

    pub async fn load_pools(&self, _guard: &NamedLockGuard, chain: &dyn ChainClient) -> Result<usize> {
        let pools = chain.get_all_liquidity_pools().await.wrap_err("failed to fetch pools for the directory")?;
        let pools: HashMap<String, LiquidityPool> = pools.into_iter().map(|pool| (pool.id.clone(), pool)).collect();
        let count = pools.len();

        *self.pools.write().await = pools;
        info!("Pool directory refreshed with {} pools", count);
        Ok(count)
    }

    pub async fn market(&self, market_id: &str) -> Option<MarketDescriptor> {
        self.markets.read().await.get(market_id).cloned()
    }

    pub async fn pool(&self, pool_id: &str) -> Option<LiquidityPool> {
        self.pools.read().await.get(pool_id).cloned()
    }

    /// Known markets, ordered by id.
    pub async fn markets(&self) -> Vec<MarketDescriptor> {
        let mut markets: Vec<MarketDescriptor> = self.markets.read().await.values().cloned().collect();
        markets.sort_by(|a, b| a.market_id.cmp(&b.market_id));
        markets
    }

    pub async fn market_count(&self) -> usize {
        self.markets.read().await.len()
    }
}
