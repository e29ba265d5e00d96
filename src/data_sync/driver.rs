use super::intervals::SyncOutcome;
use super::jobs::SyncJobs;
use crate::logic::MarketDescriptor;
use crate::storage::MarketStorage;
use eyre::{Result, eyre};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum JobKind {
    History,
    Intervals,
    Orders,
}

/// One-shot runner behind the batch commands: a single job kind for one
/// stored market, or for all of them.
pub struct SyncDriver {
    jobs: SyncJobs,
    markets: Arc<dyn MarketStorage>,
}

impl SyncDriver {
    pub fn new(jobs: SyncJobs, markets: Arc<dyn MarketStorage>) -> Self {
        Self { jobs, markets }
    }

    pub async fn sync_market(&self, kind: JobKind, market_id: &str) -> Result<()> {
        let market = self.markets.get_market(market_id).await?.ok_or_else(|| eyre!("market {} not found", market_id))?;
        self.run(kind, &market).await
    }

    /// Runs `kind` for every stored market. Per-market failures are logged and
    /// counted; returns the number of markets that succeeded.
    pub async fn sync_all(&self, kind: JobKind) -> Result<usize> {
        let markets = self.markets.get_markets().await?;
        let mut synced = 0;

        for market in &markets {
            match self.run(kind, market).await {
                Ok(()) => synced += 1,
                Err(err) => error!(market_id = %market.market_id, job = %kind, "Sync failed: {:#}", err),
            }
        }

        info!(job = %kind, synced, total = markets.len(), "Batch sync finished");
        Ok(synced)
    }

    async fn run(&self, kind: JobKind, market: &MarketDescriptor) -> Result<()> {
        match kind {
            JobKind::History => {
                self.jobs.history.sync_history(market, None).await?;
            }
            JobKind::Intervals => {
                if self.jobs.intervals.sync_intervals(&market.market_id).await? == SyncOutcome::NothingToDo {
                    info!(market_id = %market.market_id, "No trades to add to intervals");
                }
            }
            JobKind::Orders => {
                self.jobs.orders.sync_market(&market.market_id).await?;
            }
        }
        Ok(())
    }
}
