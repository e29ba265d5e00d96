use super::provider::ChainClient;
use crate::logic::{HistoryOrder, MarketDescriptor, Trade};
use crate::storage::HistoryStorage;
use crate::utils::{NamedLocker, history_lock_key};
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{debug, info};

/// Pulls a market's executed orders from the chain into storage.
///
/// Pages arrive newest first. Paging stops at the first order strictly older
/// than the newest stored trade; orders from that same second are fetched
/// again and replace the stored ones, so a resumed sync never duplicates rows.
pub struct HistorySync {
    chain: Arc<dyn ChainClient>,
    storage: Arc<dyn HistoryStorage>,
    locker: Arc<NamedLocker>,
    page_size: usize,
}

impl HistorySync {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        storage: Arc<dyn HistoryStorage>,
        locker: Arc<NamedLocker>,
        page_size: usize,
    ) -> Self {
        Self { chain, storage, locker, page_size: page_size.max(1) }
    }

    /// Returns the number of trades written. `page_size` overrides the configured page size.
    pub async fn sync_history(&self, market: &MarketDescriptor, page_size: Option<usize>) -> Result<usize> {
        let market_id = market.market_id.as_str();
        let _guard = self.locker.lock(&history_lock_key(market_id)).await;
        let limit = page_size.unwrap_or(self.page_size).max(1);

        let last = self
            .storage
            .get_last_trade(market_id)
            .await
            .wrap_err_with(|| format!("failed to load last trade of {market_id}"))?;
        let last_executed_at = last.map(|trade| trade.executed_at);
        if last_executed_at.is_none() {
            info!(market_id, "No stored trades, syncing the entire history");
        }

        // stored trades of the resumed second are replaced once, by the first page reaching it
        let mut pending_clear = last_executed_at;
        let mut key: Option<String> = None;
        let mut saved = 0;
        loop {
            let (orders, next) = self
                .chain
                .get_market_history(market_id, limit, key.clone())
                .await
                .wrap_err_with(|| format!("failed to fetch history of {market_id}"))?;
            if orders.is_empty() {
                debug!(market_id, "No more history on chain");
                break;
            }

            let (done, count) = self.save_page(market, &orders, last_executed_at, &mut pending_clear).await?;
            saved += count;
            if done || next.is_none() {
                break;
            }
            key = next;
        }

        info!(market_id, saved, "Finished syncing history");
        Ok(saved)
    }

    async fn save_page(
        &self,
        market: &MarketDescriptor,
        orders: &[HistoryOrder],
        last_executed_at: Option<DateTime<Utc>>,
        pending_clear: &mut Option<DateTime<Utc>>,
    ) -> Result<(bool, usize)> {
        let mut finished = false;
        let mut trades = Vec::with_capacity(orders.len());
        let mut clear = Vec::new();

        for order in orders {
            if last_executed_at.is_some_and(|last| last.timestamp() > order.executed_at) {
                finished = true;
                break;
            }

            let mut trade = Trade::from_history_order(order)?;
            trade.market_id = market.market_id.clone();
            if pending_clear.is_some_and(|resumed| resumed == trade.executed_at) {
                clear.extend(pending_clear.take());
            }
            trades.push(trade);
        }

        if trades.is_empty() {
            debug!(market_id = %market.market_id, "History page already stored");
            return Ok((finished, 0));
        }

        let count = trades.len();
        self.storage
            .save_trades(&market.market_id, trades, &clear)
            .await
            .wrap_err_with(|| format!("failed to save history of {}", market.market_id))?;

        Ok((finished, count))
    }
}
