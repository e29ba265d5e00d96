use super::provider::RawEvent;
use crate::error::EventError;
use strum_macros::{AsRefStr, Display, EnumString};

const DEX_MODULE: &str = "tradebin";

/// Known DEX event kinds. Both the versioned and the unversioned type names
/// are accepted; anything else parses to [`EventKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum EventKind {
    #[strum(to_string = "MarketCreatedEvent", serialize = "bze.tradebin.v1.MarketCreatedEvent", serialize = "bze.tradebin.MarketCreatedEvent")]
    MarketCreated,
    #[strum(to_string = "OrderExecutedEvent", serialize = "bze.tradebin.v1.OrderExecutedEvent", serialize = "bze.tradebin.OrderExecutedEvent")]
    OrderExecuted,
    #[strum(to_string = "OrderCanceledEvent", serialize = "bze.tradebin.v1.OrderCanceledEvent", serialize = "bze.tradebin.OrderCanceledEvent")]
    OrderCanceled,
    #[strum(to_string = "OrderSavedEvent", serialize = "bze.tradebin.v1.OrderSavedEvent", serialize = "bze.tradebin.OrderSavedEvent")]
    OrderSaved,
    #[strum(
        to_string = "LiquidityPoolCreatedEvent",
        serialize = "bze.tradebin.v1.LiquidityPoolCreatedEvent",
        serialize = "bze.tradebin.LiquidityPoolCreatedEvent"
    )]
    PoolCreated,
    #[strum(to_string = "AddLiquidityEvent", serialize = "bze.tradebin.v1.AddLiquidityEvent", serialize = "bze.tradebin.AddLiquidityEvent")]
    LiquidityAdded,
    #[strum(
        to_string = "RemoveLiquidityEvent",
        serialize = "bze.tradebin.v1.RemoveLiquidityEvent",
        serialize = "bze.tradebin.RemoveLiquidityEvent"
    )]
    LiquidityRemoved,
    #[strum(to_string = "SwapEvent", serialize = "bze.tradebin.v1.SwapEvent", serialize = "bze.tradebin.SwapEvent")]
    Swap,
    #[strum(to_string = "unknown")]
    Unknown,
}

impl EventKind {
    pub fn from_type(kind: &str) -> Self {
        kind.parse().unwrap_or(EventKind::Unknown)
    }
}

/// Only events of the DEX module are forwarded to the dispatcher.
pub fn is_dex_event(kind: &str) -> bool {
    kind.contains(DEX_MODULE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub kind: EventKind,
    pub raw_type: String,
    attributes: Vec<(String, String)>,
}

impl From<RawEvent> for ChainEvent {
    fn from(raw: RawEvent) -> Self {
        Self { kind: EventKind::from_type(&raw.kind), raw_type: raw.kind, attributes: raw.attributes }
    }
}

impl ChainEvent {
    /// First value stored under `key`, with JSON quoting stripped.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, value)| value.trim_matches('"'))
    }

    pub fn require(&self, key: &str) -> Result<&str, EventError> {
        self.attribute(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| EventError::MissingAttribute { kind: self.raw_type.clone(), key: key.to_string() })
    }

    pub fn market_id(&self) -> Result<&str, EventError> {
        self.require("market_id")
    }

    pub fn pool_id(&self) -> Result<&str, EventError> {
        self.require("pool_id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_spellings_parse() {
        assert_eq!(EventKind::from_type("bze.tradebin.v1.OrderExecutedEvent"), EventKind::OrderExecuted);
        assert_eq!(EventKind::from_type("bze.tradebin.OrderExecutedEvent"), EventKind::OrderExecuted);
        assert_eq!(EventKind::from_type("bze.tradebin.v1.SwapEvent"), EventKind::Swap);
        assert_eq!(EventKind::from_type("bze.tradebin.v1.LiquidityPoolCreatedEvent"), EventKind::PoolCreated);
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(EventKind::from_type("bze.tradebin.v1.SomethingNew"), EventKind::Unknown);
        assert_eq!(EventKind::from_type("transfer"), EventKind::Unknown);
        assert_eq!(EventKind::OrderSaved.to_string(), "OrderSavedEvent");
    }

    #[test]
    fn test_dex_filter() {
        assert!(is_dex_event("bze.tradebin.v1.OrderSavedEvent"));
        assert!(!is_dex_event("cosmos.bank.v1beta1.EventTransfer"));
    }

    #[test]
    fn test_attributes_are_unquoted() {
        let event = ChainEvent::from(RawEvent::new(
            "bze.tradebin.v1.OrderSavedEvent",
            &[("creator", "\"bze1\""), ("market_id", "\"ubze/uusdc\"")],
        ));

        assert_eq!(event.kind, EventKind::OrderSaved);
        assert_eq!(event.market_id(), Ok("ubze/uusdc"));
        assert_eq!(event.attribute("creator"), Some("bze1"));
        assert_eq!(
            event.pool_id(),
            Err(EventError::MissingAttribute {
                kind: "bze.tradebin.v1.OrderSavedEvent".to_string(),
                key: "pool_id".to_string()
            })
        );
    }
}
