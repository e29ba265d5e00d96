use crate::logic::types::{Interval, MarketDescriptor};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Percent change from `open` to `last`, rounded to two decimals.
/// Zero when there is no positive opening price to compare against.
pub fn calculate_price_change(open: Decimal, last: Decimal) -> Decimal {
    if open <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    ((last - open) / open * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Rolling-window summary folded from the fine intervals of one market.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerSummary {
    pub open_price: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
}

impl TickerSummary {
    /// `intervals` must be ascending by start; the first one provides the open.
    pub fn from_intervals(intervals: &[Interval]) -> Self {
        let mut summary = Self {
            open_price: intervals.first().map(|row| row.open_price).unwrap_or_default(),
            ..Self::default()
        };

        for row in intervals {
            summary.base_volume += row.base_volume;
            summary.quote_volume += row.quote_volume;

            if row.highest_price > summary.high {
                summary.high = row.highest_price;
            }
            if summary.low.is_zero() || row.lowest_price < summary.low {
                summary.low = row.lowest_price;
            }
        }

        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub base: String,
    pub quote: String,
    pub market_id: String,
    pub last_price: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
    /// Highest resting buy, zero when the book has no bids.
    pub bid: Decimal,
    /// Lowest resting sell, zero when the book has no asks.
    pub ask: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub open_price: Decimal,
    pub change: Decimal,
}

impl Ticker {
    pub fn new(
        market: &MarketDescriptor,
        summary: TickerSummary,
        last_price: Option<Decimal>,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
    ) -> Self {
        let change = last_price.map(|last| calculate_price_change(summary.open_price, last)).unwrap_or_default();

        Self {
            base: market.base.clone(),
            quote: market.quote.clone(),
            market_id: market.market_id.clone(),
            last_price: last_price.unwrap_or_default(),
            base_volume: summary.base_volume,
            quote_volume: summary.quote_volume,
            bid: bid.unwrap_or_default(),
            ask: ask.unwrap_or_default(),
            high: summary.high,
            low: summary.low,
            open_price: summary.open_price,
            change,
        }
    }
}
