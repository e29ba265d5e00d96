use super::IntervalLength;
use crate::logic::types::{Interval, Trade};
use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use rust_decimal::Decimal;

/// In-progress OHLCV accumulator for one bucket.
///
/// Open and close follow the earliest and latest *execution time* seen, not the
/// order in which trades are folded, so paginated backfills that arrive
/// newest-first still produce the right candle.
///
/// Low starts at zero and is replaced while it is zero or a smaller price is
/// seen. That is only correct because traded prices are always positive.
#[derive(Debug, Clone)]
pub struct IntervalBucket {
    length: IntervalLength,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lowest_price: Decimal,
    open_price: Decimal,
    average_price: Decimal,
    highest_price: Decimal,
    close_price: Decimal,
    base_volume: Decimal,
    quote_volume: Decimal,
    lowest_executed_at: Option<DateTime<Utc>>,
    highest_executed_at: Option<DateTime<Utc>>,
    trade_count: usize,
}

impl IntervalBucket {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, length: IntervalLength) -> Self {
        Self {
            length,
            start,
            end,
            lowest_price: Decimal::ZERO,
            open_price: Decimal::ZERO,
            average_price: Decimal::ZERO,
            highest_price: Decimal::ZERO,
            close_price: Decimal::ZERO,
            base_volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
            lowest_executed_at: None,
            highest_executed_at: None,
            trade_count: 0,
        }
    }

    /// Volumes are summed with checked arithmetic; on overflow the bucket is left untouched.
    pub fn add_trade(&mut self, trade: &Trade) -> Result<()> {
        let price = trade.price;
        let first = self.average_price.is_zero();
        let (base_volume, quote_volume) = if first {
            (trade.amount, trade.quote_amount)
        } else {
            let base_volume = self
                .base_volume
                .checked_add(trade.amount)
                .ok_or_else(|| eyre!("base volume overflows in bucket starting at {}", self.start))?;
            let quote_volume = self
                .quote_volume
                .checked_add(trade.quote_amount)
                .ok_or_else(|| eyre!("quote volume overflows in bucket starting at {}", self.start))?;
            (base_volume, quote_volume)
        };
        self.trade_count += 1;

        if self.lowest_executed_at.is_none_or(|at| at > trade.executed_at) {
            self.lowest_executed_at = Some(trade.executed_at);
            self.open_price = price;
        }

        if self.highest_executed_at.is_none_or(|at| at < trade.executed_at) {
            self.highest_executed_at = Some(trade.executed_at);
            self.close_price = price;
        }

        if self.lowest_price.is_zero() || price < self.lowest_price {
            self.lowest_price = price;
        }

        if self.highest_price.is_zero() || price > self.highest_price {
            self.highest_price = price;
        }

        // a single distinct price is reported as-is rather than as a quotient
        if first || self.highest_price == self.lowest_price {
            self.average_price = price;
        } else {
            self.average_price = quote_volume.checked_div(base_volume).unwrap_or(price);
        }
        self.base_volume = base_volume;
        self.quote_volume = quote_volume;
        Ok(())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn trade_count(&self) -> usize {
        self.trade_count
    }

    pub fn to_interval(&self, market_id: &str) -> Interval {
        Interval {
            market_id: market_id.to_string(),
            length: self.length,
            start_at: self.start,
            end_at: self.end,
            lowest_price: self.lowest_price.normalize(),
            open_price: self.open_price.normalize(),
            average_price: self.average_price.normalize(),
            highest_price: self.highest_price.normalize(),
            close_price: self.close_price.normalize(),
            base_volume: self.base_volume.normalize(),
            quote_volume: self.quote_volume.normalize(),
        }
    }
}
