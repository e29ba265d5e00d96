use super::{DurationGroup, IntervalLength};
use crate::logic::types::{Interval, Trade};
use eyre::{Result, WrapErr};
use tracing::warn;

/// One [`DurationGroup`] per configured length, scoped to a single market.
/// The unit of work of one aggregation pass.
#[derive(Debug)]
pub struct IntervalsMap {
    market_id: String,
    groups: Vec<DurationGroup>,
}

impl IntervalsMap {
    pub fn new(market_id: impl Into<String>, lengths: &[IntervalLength]) -> Self {
        let mut lengths = lengths.to_vec();
        lengths.sort();
        lengths.dedup();

        Self { market_id: market_id.into(), groups: lengths.into_iter().map(DurationGroup::new).collect() }
    }

    pub fn with_default_lengths(market_id: impl Into<String>) -> Self {
        Self::new(market_id, &IntervalLength::DEFAULTS)
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    pub fn lengths(&self) -> Vec<IntervalLength> {
        self.groups.iter().map(DurationGroup::length).collect()
    }

    pub fn group(&self, length: IntervalLength) -> Option<&DurationGroup> {
        self.groups.iter().find(|group| group.length() == length)
    }

    /// Folds a trade into its bucket of every length. Trades of other markets are skipped.
    pub fn add_trade(&self, trade: &Trade) -> Result<()> {
        if trade.market_id != self.market_id {
            warn!(market_id = %self.market_id, trade_market = %trade.market_id, "skipping trade of another market");
            return Ok(());
        }

        for group in &self.groups {
            group
                .add_trade(trade)
                .wrap_err_with(|| format!("could not fold trade {} into {} buckets", trade.id, group.length()))?;
        }
        Ok(())
    }

    /// All accumulated buckets as persistable rows, grouped by length.
    pub fn elements(&self) -> Vec<Interval> {
        self.groups.iter().flat_map(|group| group.intervals(&self.market_id)).collect()
    }
}
