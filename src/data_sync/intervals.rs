use crate::logic::{IntervalLength, IntervalsMap, bucket_bounds, datetime_from_epoch};
use crate::storage::{HistoryStorage, IntervalStorage};
use crate::utils::{NamedLocker, interval_lock_key, join_all_collect};
use eyre::{Result, WrapErr, eyre};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSyncReport {
    /// Trades re-folded in this pass.
    pub trades: usize,
    /// Interval rows produced.
    pub intervals: usize,
    pub failed_interval_batches: usize,
    pub failed_mark_batches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No unprocessed trade exists for the market.
    NothingToDo,
    Synced(IntervalSyncReport),
}

/// Folds a market's unprocessed trades into persisted interval rows.
///
/// The window starts at the coarse bucket holding the oldest unprocessed trade,
/// so every touched bucket is recomputed from its complete trade set. Rows are
/// upserted first, trades are marked processed after; both phases are batched
/// and best-effort.
pub struct IntervalSync {
    history: Arc<dyn HistoryStorage>,
    intervals: Arc<dyn IntervalStorage>,
    locker: Arc<NamedLocker>,
    lengths: Vec<IntervalLength>,
    refold_length: IntervalLength,
    batch_size: usize,
}

impl IntervalSync {
    pub fn new(
        history: Arc<dyn HistoryStorage>,
        intervals: Arc<dyn IntervalStorage>,
        locker: Arc<NamedLocker>,
        lengths: Vec<IntervalLength>,
        refold_length: IntervalLength,
        batch_size: usize,
    ) -> Self {
        Self { history, intervals, locker, lengths, refold_length, batch_size: batch_size.max(1) }
    }

    pub async fn sync_intervals(&self, market_id: &str) -> Result<SyncOutcome> {
        let _guard = self.locker.lock(&interval_lock_key(market_id)).await;
        info!(market_id, "Preparing to sync market intervals");

        let Some(oldest) = self
            .history
            .get_oldest_unprocessed_trade(market_id)
            .await
            .wrap_err_with(|| format!("failed to get oldest unprocessed trade of {market_id}"))?
        else {
            debug!(market_id, "No unprocessed trades");
            return Ok(SyncOutcome::NothingToDo);
        };

        // earliest start among the buckets holding the oldest trade, so each touched bucket is folded whole
        let oldest_at = oldest.executed_at.timestamp();
        let since = std::iter::once(self.refold_length)
            .chain(self.lengths.iter().copied())
            .map(|length| bucket_bounds(oldest_at, length).0)
            .min()
            .map(datetime_from_epoch)
            .unwrap_or(oldest.executed_at);
        let trades = self
            .history
            .get_trades_since(market_id, since)
            .await
            .wrap_err_with(|| format!("failed to get trades of {market_id} since {since}"))?;

        let map = IntervalsMap::new(market_id, &self.lengths);
        for trade in &trades {
            map.add_trade(trade).wrap_err_with(|| format!("failed to aggregate trades of {market_id}"))?;
        }
        let rows = map.elements();
        if rows.is_empty() {
            return Err(eyre!("{} trades of {} produced no intervals", trades.len(), market_id));
        }

        let upserts = join_all_collect(rows.chunks(self.batch_size).enumerate().map(|(batch, chunk)| async move {
            self.intervals
                .upsert_intervals(chunk)
                .await
                .wrap_err_with(|| format!("could not save intervals batch {batch}"))
        }))
        .await;
        if let Some(err) = &upserts.first_error {
            error!(market_id, failed = upserts.failed, "Interval upsert failed: {:#}", err);
        }

        let ids: Vec<u64> = trades.iter().map(|trade| trade.id).collect();
        let marks = join_all_collect(ids.chunks(self.batch_size).enumerate().map(|(batch, chunk)| async move {
            self.history
                .mark_trades_processed(chunk)
                .await
                .wrap_err_with(|| format!("could not mark trades batch {batch} as processed"))
        }))
        .await;
        if let Some(err) = &marks.first_error {
            error!(market_id, failed = marks.failed, "Marking trades processed failed: {:#}", err);
        }

        let report = IntervalSyncReport {
            trades: trades.len(),
            intervals: rows.len(),
            failed_interval_batches: upserts.failed,
            failed_mark_batches: marks.failed,
        };
        info!(market_id, trades = report.trades, intervals = report.intervals, "Market intervals synced");
        Ok(SyncOutcome::Synced(report))
    }
}
