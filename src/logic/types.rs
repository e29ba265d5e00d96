use super::interval::{IntervalLength, from_epoch};
use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Market ids are `<base>/<quote>` for order-book markets.
pub fn market_id(base: &str, quote: &str) -> String {
    format!("{base}/{quote}")
}

/// Pool ids (and the ids of the markets they back) are `<base>_<quote>`.
pub fn pool_id(base: &str, quote: &str) -> String {
    format!("{base}_{quote}")
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A tracked market. `created_at` anchors the earliest bucket served for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub market_id: String,
    pub base: String,
    pub quote: String,
    pub created_at: DateTime<Utc>,
}

impl MarketDescriptor {
    pub fn new(base: impl Into<String>, quote: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let base = base.into();
        let quote = quote.into();
        Self { market_id: market_id(&base, &quote), base, quote, created_at }
    }
}

/// Executed order as reported by the chain's market history query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOrder {
    pub market_id: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    /// Unix seconds.
    pub executed_at: i64,
    pub maker: String,
    pub taker: String,
}

/// Persisted market-history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Assigned by storage; zero until persisted.
    pub id: u64,
    pub market_id: String,
    pub side: OrderSide,
    /// Base amount.
    pub amount: Decimal,
    pub quote_amount: Decimal,
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
    pub maker: String,
    pub taker: String,
    pub processed: bool,
}

impl Trade {
    pub fn from_history_order(order: &HistoryOrder) -> Result<Self> {
        let executed_at = DateTime::from_timestamp(order.executed_at, 0)
            .ok_or_else(|| eyre!("invalid execution timestamp {} for market {}", order.executed_at, order.market_id))?;
        let quote_amount = order.amount.checked_mul(order.price).ok_or_else(|| {
            eyre!("quote amount of {} at {} overflows for market {}", order.amount, order.price, order.market_id)
        })?;

        Ok(Self {
            id: 0,
            market_id: order.market_id.clone(),
            side: order.side,
            amount: order.amount,
            quote_amount,
            price: order.price,
            executed_at,
            maker: order.maker.clone(),
            taker: order.taker.clone(),
            processed: false,
        })
    }
}

/// Persisted OHLCV row. Natural key is `(market_id, length, start_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub market_id: String,
    #[serde(rename = "minutes")]
    pub length: IntervalLength,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub lowest_price: Decimal,
    pub open_price: Decimal,
    pub average_price: Decimal,
    pub highest_price: Decimal,
    pub close_price: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
}

impl Interval {
    /// Zero-valued row standing in for a bucket without trades.
    pub fn placeholder(market_id: &str, length: IntervalLength, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            market_id: market_id.to_string(),
            length,
            start_at,
            end_at,
            lowest_price: Decimal::ZERO,
            open_price: Decimal::ZERO,
            average_price: Decimal::ZERO,
            highest_price: Decimal::ZERO,
            close_price: Decimal::ZERO,
            base_volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
        }
    }

    pub fn start_epoch(&self) -> i64 {
        self.start_at.timestamp()
    }

    pub fn is_placeholder(&self) -> bool {
        self.base_volume.is_zero() && self.open_price.is_zero() && self.close_price.is_zero()
    }
}

/// Reduced candle shape consumed by charting clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingViewInterval {
    pub time: DateTime<Utc>,
    pub low: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub close: Decimal,
    /// Base volume.
    pub value: Decimal,
}

impl TradingViewInterval {
    pub fn placeholder(time: DateTime<Utc>) -> Self {
        Self {
            time,
            low: Decimal::ZERO,
            open: Decimal::ZERO,
            high: Decimal::ZERO,
            close: Decimal::ZERO,
            value: Decimal::ZERO,
        }
    }

    pub fn start_epoch(&self) -> i64 {
        self.time.timestamp()
    }
}

impl From<&Interval> for TradingViewInterval {
    fn from(interval: &Interval) -> Self {
        Self {
            time: interval.start_at,
            low: interval.lowest_price,
            open: interval.open_price,
            high: interval.highest_price,
            close: interval.close_price,
            value: interval.base_volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub id: String,
    pub base: String,
    pub quote: String,
    pub lp_denom: String,
    pub fee: Decimal,
    pub reserve_base: Decimal,
    pub reserve_quote: Decimal,
}

impl LiquidityPool {
    /// Pools are tracked as markets keyed by the pool id.
    pub fn market_descriptor(&self, created_at: DateTime<Utc>) -> MarketDescriptor {
        MarketDescriptor {
            market_id: self.id.clone(),
            base: self.base.clone(),
            quote: self.quote.clone(),
            created_at,
        }
    }
}

/// Price level of the chain's live order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedOrder {
    pub market_id: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
}

/// Persisted order-book row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub market_id: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub quote_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl MarketOrder {
    pub fn from_aggregated(order: &AggregatedOrder, created_at: DateTime<Utc>) -> Result<Self> {
        let quote_amount = order.amount.checked_mul(order.price).ok_or_else(|| {
            eyre!("quote amount of {} {} order at {} overflows for market {}", order.amount, order.side, order.price, order.market_id)
        })?;

        Ok(Self {
            market_id: order.market_id.clone(),
            side: order.side,
            amount: order.amount,
            price: order.price,
            quote_amount,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketWithLastPrice {
    pub market: MarketDescriptor,
    pub last_price: Option<Decimal>,
}

/// Epoch seconds to UTC, clamped to the epoch when out of range.
pub fn datetime_from_epoch(secs: i64) -> DateTime<Utc> {
    from_epoch(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trade_from_history_order() {
        let order = HistoryOrder {
            market_id: market_id("ubze", "uusdc"),
            side: OrderSide::Buy,
            amount: dec!(20),
            price: dec!(1.2),
            executed_at: 1_700_000_000,
            maker: "maker".to_string(),
            taker: "taker".to_string(),
        };

        let trade = Trade::from_history_order(&order).unwrap();
        assert_eq!(trade.market_id, "ubze/uusdc");
        assert_eq!(trade.quote_amount, dec!(24));
        assert_eq!(trade.executed_at.timestamp(), 1_700_000_000);
        assert!(!trade.processed);
    }

    #[test]
    fn test_oversized_history_order_is_rejected() {
        let order = HistoryOrder {
            market_id: market_id("ubze", "uusdc"),
            side: OrderSide::Sell,
            amount: Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
            price: Decimal::from(10_000_000_000u64),
            executed_at: 1_700_000_000,
            maker: "maker".to_string(),
            taker: "taker".to_string(),
        };

        let err = Trade::from_history_order(&order).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_oversized_aggregated_order_is_rejected() {
        let order = AggregatedOrder {
            market_id: market_id("ubze", "uusdc"),
            side: OrderSide::Buy,
            amount: Decimal::MAX,
            price: dec!(2),
        };

        assert!(MarketOrder::from_aggregated(&order, datetime_from_epoch(1_700_000_000)).is_err());
        let fits = AggregatedOrder { amount: dec!(5), ..order };
        assert_eq!(MarketOrder::from_aggregated(&fits, datetime_from_epoch(1_700_000_000)).unwrap().quote_amount, dec!(10));
    }

    #[test]
    fn test_placeholder_renders_zero() {
        let start = datetime_from_epoch(1_700_000_100);
        let end = datetime_from_epoch(1_700_000_400);
        let row = Interval::placeholder("a/b", IntervalLength::FIVE_MINUTES, start, end);

        assert!(row.is_placeholder());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["open_price"], "0");
        assert_eq!(json["minutes"], 5);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(OrderSide::Sell.to_string(), "sell");
        assert_eq!(pool_id("ubze", "uusdc"), "ubze_uusdc");
    }
}
