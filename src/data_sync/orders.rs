use super::provider::ChainClient;
use crate::logic::{MarketOrder, OrderSide};
use crate::storage::OrderStorage;
use crate::utils::{NamedLocker, order_lock_key};
use chrono::Utc;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::info;

/// Mirrors a market's live order book into storage.
pub struct OrderSync {
    chain: Arc<dyn ChainClient>,
    storage: Arc<dyn OrderStorage>,
    locker: Arc<NamedLocker>,
}

impl OrderSync {
    pub fn new(chain: Arc<dyn ChainClient>, storage: Arc<dyn OrderStorage>, locker: Arc<NamedLocker>) -> Self {
        Self { chain, storage, locker }
    }

    /// Replaces the stored snapshot, including with an empty book. Returns the number of levels stored.
    pub async fn sync_market(&self, market_id: &str) -> Result<usize> {
        let _guard = self.locker.lock(&order_lock_key(market_id)).await;

        let (buys, sells) = tokio::try_join!(
            self.chain.get_active_orders(market_id, OrderSide::Buy),
            self.chain.get_active_orders(market_id, OrderSide::Sell),
        )
        .wrap_err_with(|| format!("failed to fetch active orders of {market_id}"))?;

        let now = Utc::now();
        let orders = buys
            .iter()
            .chain(sells.iter())
            .map(|order| MarketOrder::from_aggregated(order, now))
            .collect::<Result<Vec<_>>>()
            .wrap_err_with(|| format!("failed to convert active orders of {market_id}"))?;
        let count = orders.len();

        self.storage
            .replace_orders(market_id, orders)
            .await
            .wrap_err_with(|| format!("failed to store orders of {market_id}"))?;

        info!(market_id, buys = buys.len(), sells = sells.len(), "Order book synced");
        Ok(count)
    }
}
