use crate::logic::{AggregatedOrder, HistoryOrder, LiquidityPool, MarketDescriptor, OrderSide};
use async_trait::async_trait;
use eyre::Result;
use tokio::sync::mpsc;

/// Event exactly as delivered by the chain subscription: a type string plus
/// ordered key/value attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl RawEvent {
    pub fn new(kind: impl Into<String>, attributes: &[(&str, &str)]) -> Self {
        Self {
            kind: kind.into(),
            attributes: attributes.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

/// Query side of the chain. Every call is expected to carry its own deadline.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// One page of executed orders, newest first, and the key of the next page.
    async fn get_market_history(
        &self,
        market_id: &str,
        limit: usize,
        pagination_key: Option<String>,
    ) -> Result<(Vec<HistoryOrder>, Option<String>)>;

    async fn get_all_markets(&self) -> Result<Vec<MarketDescriptor>>;

    async fn get_active_orders(&self, market_id: &str, side: OrderSide) -> Result<Vec<AggregatedOrder>>;

    async fn get_all_liquidity_pools(&self) -> Result<Vec<LiquidityPool>>;

    async fn get_liquidity_pool(&self, pool_id: &str) -> Result<Option<LiquidityPool>>;
}

/// Streaming side of the chain.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Opens the persistent subscription. The receiver closing means the
    /// connection was lost.
    async fn subscribe(&self, buffer: usize) -> Result<mpsc::Receiver<RawEvent>>;

    /// Liveness check against the connection.
    async fn heartbeat(&self) -> Result<()>;
}
