use super::events::ChainEvent;
use crate::logic::{OrderSide, Trade, pool_id};
use crate::storage::HistoryStorage;
use crate::utils::{NamedLocker, SWAP_EVENTS_LOCK_KEY};
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr, eyre};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Coin carried by the `in` and `out` swap attributes, e.g. `{"denom":"ubze","amount":"1000"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEventData {
    pub pool_id: String,
    pub creator: String,
    pub input: Coin,
    pub output: Coin,
}

impl SwapEventData {
    pub fn from_event(event: &ChainEvent) -> Result<Self> {
        let pool_id = event.pool_id()?.to_string();
        let creator = event.require("creator")?.to_string();
        let input = parse_coin(event, "in")?;
        let output = parse_coin(event, "out")?;
        if input.denom == output.denom {
            return Err(eyre!("swap in pool {} has the same denom {} on both sides", pool_id, input.denom));
        }

        Ok(Self { pool_id, creator, input, output })
    }

    /// The lexicographically smaller denom is the pool's base.
    pub fn base(&self) -> &Coin {
        if self.input.denom < self.output.denom { &self.input } else { &self.output }
    }

    pub fn quote(&self) -> &Coin {
        if self.input.denom > self.output.denom { &self.input } else { &self.output }
    }

    /// The swap as a trade of the pool's market. Paying in the quote denom buys base.
    pub fn to_trade(&self, executed_at: DateTime<Utc>) -> Result<Trade> {
        let (base, quote) = (self.base(), self.quote());
        if pool_id(&base.denom, &quote.denom) != self.pool_id {
            return Err(eyre!("swap of {} for {} does not belong to pool {}", self.input.denom, self.output.denom, self.pool_id));
        }
        if base.amount <= Decimal::ZERO || quote.amount <= Decimal::ZERO {
            return Err(eyre!("swap in pool {} has a non-positive amount", self.pool_id));
        }
        let price = quote
            .amount
            .checked_div(base.amount)
            .ok_or_else(|| eyre!("price of {} {} per {} {} is out of range", quote.amount, quote.denom, base.amount, base.denom))?;
        let side = if self.input.denom == quote.denom { OrderSide::Buy } else { OrderSide::Sell };

        Ok(Trade {
            id: 0,
            market_id: self.pool_id.clone(),
            side,
            amount: base.amount,
            quote_amount: quote.amount,
            price,
            executed_at,
            maker: self.pool_id.clone(),
            taker: self.creator.clone(),
            processed: false,
        })
    }
}

fn parse_coin(event: &ChainEvent, key: &str) -> Result<Coin> {
    let raw = event.require(key)?;
    serde_json::from_str(raw).wrap_err_with(|| format!("invalid '{key}' coin in {}", event.raw_type))
}

/// Records pool swaps as trades of the market keyed by the pool id, so they
/// fold into intervals like order-book trades. All swap saves share one lock.
pub struct SwapSync {
    history: Arc<dyn HistoryStorage>,
    locker: Arc<NamedLocker>,
}

impl SwapSync {
    pub fn new(history: Arc<dyn HistoryStorage>, locker: Arc<NamedLocker>) -> Self {
        Self { history, locker }
    }

    /// Returns the pool id the trade was stored under.
    pub async fn sync_swap_event(&self, event: &ChainEvent, executed_at: DateTime<Utc>) -> Result<String> {
        let _guard = self.locker.lock(SWAP_EVENTS_LOCK_KEY).await;

        let swap = SwapEventData::from_event(event).wrap_err("error parsing swap event data")?;
        let trade = swap.to_trade(executed_at)?;
        self.history
            .save_trades(&swap.pool_id, vec![trade], &[])
            .await
            .wrap_err_with(|| format!("failed to save swap of pool {}", swap.pool_id))?;

        info!(pool_id = %swap.pool_id, creator = %swap.creator, "Processed swap event");
        Ok(swap.pool_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::RawEvent;
    use crate::logic::datetime_from_epoch;
    use crate::storage::MemoryStorage;
    use rust_decimal_macros::dec;

    fn swap_event(pool: &str, input: (&str, &str), output: (&str, &str)) -> ChainEvent {
        let pool = format!("\"{pool}\"");
        let coin_in = format!(r#"{{"denom":"{}","amount":"{}"}}"#, input.0, input.1);
        let coin_out = format!(r#"{{"denom":"{}","amount":"{}"}}"#, output.0, output.1);
        ChainEvent::from(RawEvent::new(
            "bze.tradebin.v1.SwapEvent",
            &[
                ("pool_id", pool.as_str()),
                ("creator", "\"bze1trader\""),
                ("in", coin_in.as_str()),
                ("out", coin_out.as_str()),
            ],
        ))
    }

    #[test]
    fn test_selling_base_into_pool() {
        let event = swap_event("ubze_uusdc", ("ubze", "4000"), ("uusdc", "1000"));
        let swap = SwapEventData::from_event(&event).unwrap();
        assert_eq!(swap.base().denom, "ubze");
        assert_eq!(swap.quote().denom, "uusdc");

        let trade = swap.to_trade(datetime_from_epoch(1_700_000_000)).unwrap();
        assert_eq!(trade.market_id, "ubze_uusdc");
        assert_eq!(trade.side, OrderSide::Sell);
        assert_eq!(trade.amount, dec!(4000));
        assert_eq!(trade.quote_amount, dec!(1000));
        assert_eq!(trade.price, dec!(0.25));
        assert_eq!(trade.taker, "bze1trader");
    }

    #[test]
    fn test_paying_quote_buys_base() {
        let event = swap_event("ubze_uusdc", ("uusdc", "300"), ("ubze", "1000"));
        let trade = SwapEventData::from_event(&event).unwrap().to_trade(datetime_from_epoch(1_700_000_000)).unwrap();

        assert_eq!(trade.side, OrderSide::Buy);
        assert_eq!(trade.amount, dec!(1000));
        assert_eq!(trade.price, dec!(0.3));
    }

    #[test]
    fn test_malformed_swaps_are_rejected() {
        let missing_out = ChainEvent::from(RawEvent::new(
            "bze.tradebin.v1.SwapEvent",
            &[("pool_id", "ubze_uusdc"), ("creator", "bze1"), ("in", r#"{"denom":"ubze","amount":"1"}"#)],
        ));
        let err = SwapEventData::from_event(&missing_out).unwrap_err();
        assert!(format!("{err:#}").contains("out"));

        let garbled = swap_event("ubze_uusdc", ("ubze", "lots"), ("uusdc", "1"));
        assert!(SwapEventData::from_event(&garbled).is_err());

        let wrong_pool = swap_event("ubze_uatom", ("ubze", "10"), ("uusdc", "1"));
        let swap = SwapEventData::from_event(&wrong_pool).unwrap();
        assert!(swap.to_trade(datetime_from_epoch(1_700_000_000)).is_err());

        let empty = swap_event("ubze_uusdc", ("ubze", "0"), ("uusdc", "1"));
        let swap = SwapEventData::from_event(&empty).unwrap();
        assert!(swap.to_trade(datetime_from_epoch(1_700_000_000)).is_err());
    }

    #[tokio::test]
    async fn test_swap_is_stored_under_pool_market() {
        let storage = Arc::new(MemoryStorage::new());
        let sync = SwapSync::new(storage.clone(), Arc::new(NamedLocker::new()));

        let event = swap_event("ubze_uusdc", ("ubze", "4000"), ("uusdc", "1000"));
        let pool = sync.sync_swap_event(&event, datetime_from_epoch(1_700_000_000)).await.unwrap();
        assert_eq!(pool, "ubze_uusdc");

        let trades = storage.trades("ubze_uusdc");
        assert_eq!(trades.len(), 1);
        assert!(trades[0].id > 0);
        assert!(!trades[0].processed);
        assert_eq!(trades[0].executed_at.timestamp(), 1_700_000_000);

        let bad = swap_event("ubze_uusdc", ("ubze", "0"), ("uusdc", "1"));
        assert!(sync.sync_swap_event(&bad, datetime_from_epoch(1_700_000_060)).await.is_err());
        assert_eq!(storage.trades("ubze_uusdc").len(), 1);
    }
}
