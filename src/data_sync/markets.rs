use super::provider::ChainClient;
use crate::storage::MarketStorage;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::info;

/// Stores every chain market not stored yet. Existing rows keep their
/// creation time, which anchors gap filling.
pub struct MarketSync {
    chain: Arc<dyn ChainClient>,
    storage: Arc<dyn MarketStorage>,
}

impl MarketSync {
    pub fn new(chain: Arc<dyn ChainClient>, storage: Arc<dyn MarketStorage>) -> Self {
        Self { chain, storage }
    }

    /// Returns the number of newly stored markets.
    pub async fn sync_markets(&self) -> Result<usize> {
        let markets = self.chain.get_all_markets().await.wrap_err("failed to fetch markets")?;
        if markets.is_empty() {
            info!("No markets found on chain");
            return Ok(0);
        }

        info!("Saving {} markets", markets.len());
        self.storage.save_markets_if_absent(markets).await.wrap_err("failed to save markets")
    }
}
