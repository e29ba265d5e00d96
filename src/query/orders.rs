use crate::error::QueryError;
use crate::logic::{MarketOrder, OrderSide};
use crate::storage::{MarketStorage, OrderStorage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

impl From<&MarketOrder> for OrderBookLevel {
    fn from(order: &MarketOrder) -> Self {
        Self { price: order.price, amount: order.amount }
    }
}

/// Depth-limited snapshot of a market's stored order book. Bids are best
/// (highest) first, asks best (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub market_id: String,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

pub struct OrderBookService {
    markets: Arc<dyn MarketStorage>,
    orders: Arc<dyn OrderStorage>,
}

impl OrderBookService {
    pub fn new(markets: Arc<dyn MarketStorage>, orders: Arc<dyn OrderStorage>) -> Self {
        Self { markets, orders }
    }

    /// `depth` is split evenly between both sides.
    pub async fn get_order_book(&self, market_id: &str, depth: usize) -> Result<OrderBook, QueryError> {
        if self.markets.get_market(market_id).await?.is_none() {
            return Err(QueryError::MarketNotFound(market_id.to_string()));
        }

        let per_side = depth / 2;
        let (buys, sells) = tokio::try_join!(
            self.orders.get_orders(market_id, OrderSide::Buy, per_side),
            self.orders.get_orders(market_id, OrderSide::Sell, per_side),
        )?;

        Ok(OrderBook {
            market_id: market_id.to_string(),
            timestamp: Utc::now(),
            bids: buys.iter().map(OrderBookLevel::from).collect(),
            asks: sells.iter().map(OrderBookLevel::from).collect(),
        })
    }
}
