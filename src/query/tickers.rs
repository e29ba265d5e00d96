use crate::error::QueryError;
use crate::logic::{Interval, IntervalLength, MarketWithLastPrice, OrderSide, Ticker, TickerSummary};
use crate::storage::{IntervalStorage, MarketStorage, OrderStorage};
use crate::utils::join_all_collect;
use chrono::{DateTime, TimeDelta, Utc};
use eyre::{Result, WrapErr};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Rolling-window tickers for every stored market.
pub struct TickerService {
    markets: Arc<dyn MarketStorage>,
    intervals: Arc<dyn IntervalStorage>,
    orders: Arc<dyn OrderStorage>,
    length: IntervalLength,
    window: TimeDelta,
}

impl TickerService {
    pub fn new(
        markets: Arc<dyn MarketStorage>,
        intervals: Arc<dyn IntervalStorage>,
        orders: Arc<dyn OrderStorage>,
        length: IntervalLength,
        window: TimeDelta,
    ) -> Self {
        Self { markets, intervals, orders, length, window }
    }

    pub async fn get_tickers(&self) -> Result<Vec<Ticker>, QueryError> {
        self.get_tickers_at(Utc::now()).await
    }

    /// Builds every market's ticker concurrently. Markets without a trade in
    /// the window get a zero last price and change. Sorted by market id.
    pub async fn get_tickers_at(&self, now: DateTime<Utc>) -> Result<Vec<Ticker>, QueryError> {
        let since = now - self.window;
        let markets = self.markets.get_markets_with_last_price(since).await?;
        debug!(markets = markets.len(), "Building tickers");

        let mut tickers = join_all_collect(markets.iter().map(|market| self.build_ticker(market, since)))
            .await
            .into_result()?;
        tickers.sort_by(|a, b| a.market_id.cmp(&b.market_id));
        Ok(tickers)
    }

    async fn build_ticker(&self, entry: &MarketWithLastPrice, since: DateTime<Utc>) -> Result<Ticker> {
        let market_id = entry.market.market_id.as_str();

        let (bid, ask, stored) = tokio::try_join!(
            self.best_price(market_id, OrderSide::Buy),
            self.best_price(market_id, OrderSide::Sell),
            async {
                self.intervals
                    .get_intervals_in_range(market_id, self.length, since)
                    .await
                    .wrap_err_with(|| format!("failed to load ticker intervals of {market_id}"))
            },
        )?;

        let mut rows: Vec<Interval> = stored.into_values().collect();
        rows.sort_by_key(Interval::start_epoch);

        Ok(Ticker::new(&entry.market, TickerSummary::from_intervals(&rows), entry.last_price, bid, ask))
    }

    async fn best_price(&self, market_id: &str, side: OrderSide) -> Result<Option<Decimal>> {
        let best = self
            .orders
            .get_orders(market_id, side, 1)
            .await
            .wrap_err_with(|| format!("failed to load best {side} order of {market_id}"))?;
        Ok(best.first().map(|order| order.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{MarketDescriptor, MarketOrder, Trade, datetime_from_epoch};
    use crate::storage::{HistoryStorage, MemoryStorage};
    use rust_decimal_macros::dec;

    const NOW: i64 = 1_700_006_400;

    fn five_minutes(start: i64, open: Decimal, low: Decimal, high: Decimal, base: Decimal) -> Interval {
        Interval {
            market_id: "a/b".to_string(),
            length: IntervalLength::FIVE_MINUTES,
            start_at: datetime_from_epoch(start),
            end_at: datetime_from_epoch(start + 300),
            lowest_price: low,
            open_price: open,
            average_price: open,
            highest_price: high,
            close_price: open,
            base_volume: base,
            quote_volume: base * open,
        }
    }

    fn trade(at: i64, price: Decimal) -> Trade {
        Trade {
            id: 0,
            market_id: "a/b".to_string(),
            side: OrderSide::Buy,
            amount: dec!(1),
            quote_amount: price,
            price,
            executed_at: datetime_from_epoch(at),
            maker: "maker".to_string(),
            taker: "taker".to_string(),
            processed: true,
        }
    }

    fn order(side: OrderSide, price: Decimal) -> MarketOrder {
        MarketOrder {
            market_id: "a/b".to_string(),
            side,
            amount: dec!(10),
            price,
            quote_amount: dec!(10) * price,
            created_at: datetime_from_epoch(NOW),
        }
    }

    fn service(storage: &Arc<MemoryStorage>) -> TickerService {
        TickerService::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            IntervalLength::FIVE_MINUTES,
            TimeDelta::hours(24),
        )
    }

    #[tokio::test]
    async fn test_ticker_folds_window() {
        let storage = Arc::new(MemoryStorage::new());
        let created = datetime_from_epoch(NOW - 7 * 86_400);
        storage
            .save_markets_if_absent(vec![MarketDescriptor::new("c", "d", created), MarketDescriptor::new("a", "b", created)])
            .await
            .unwrap();
        storage
            .upsert_intervals(&[
                five_minutes(NOW - 2 * 86_400, dec!(9), dec!(0.1), dec!(20), dec!(100)),
                five_minutes(NOW - 3600, dec!(2), dec!(1.8), dec!(2.5), dec!(10)),
                five_minutes(NOW - 1800, dec!(2.4), dec!(1.5), dec!(2.6), dec!(5)),
            ])
            .await
            .unwrap();
        storage.save_trades("a/b", vec![trade(NOW - 1700, dec!(2.5))], &[]).await.unwrap();
        storage
            .replace_orders(
                "a/b",
                vec![
                    order(OrderSide::Buy, dec!(2.3)),
                    order(OrderSide::Buy, dec!(2.4)),
                    order(OrderSide::Sell, dec!(2.7)),
                    order(OrderSide::Sell, dec!(2.6)),
                ],
            )
            .await
            .unwrap();

        let tickers = service(&storage).get_tickers_at(datetime_from_epoch(NOW)).await.unwrap();

        assert_eq!(tickers.len(), 2);
        let ticker = &tickers[0];
        assert_eq!(ticker.market_id, "a/b");
        assert_eq!(ticker.open_price, dec!(2));
        assert_eq!(ticker.high, dec!(2.6));
        assert_eq!(ticker.low, dec!(1.5));
        assert_eq!(ticker.base_volume, dec!(15));
        assert_eq!(ticker.quote_volume, dec!(32));
        assert_eq!(ticker.last_price, dec!(2.5));
        assert_eq!(ticker.change, dec!(25));
        assert_eq!(ticker.bid, dec!(2.4));
        assert_eq!(ticker.ask, dec!(2.6));

        let idle = &tickers[1];
        assert_eq!(idle.market_id, "c/d");
        assert_eq!(idle.last_price, Decimal::ZERO);
        assert_eq!(idle.change, Decimal::ZERO);
        assert_eq!(idle.bid, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_no_markets_no_tickers() {
        let storage = Arc::new(MemoryStorage::new());

        assert!(service(&storage).get_tickers().await.unwrap().is_empty());
    }
}
