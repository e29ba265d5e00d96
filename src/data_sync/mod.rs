/// Data Synchronization Layer
///
/// Keeps storage in step with the chain:
///
/// - History, swap, interval, order-book, market and liquidity-pool sync jobs
/// - An in-memory market directory used to resolve event attributes
/// - An event dispatcher and a reconnecting listener driving the jobs
/// - A batch driver for one-shot runs
///
/// Jobs touching the same market and resource are serialized by named locks;
/// nothing else orders the work.
pub mod config;
pub mod directory;
pub mod driver;
pub mod events;
pub mod history;
pub mod intervals;
pub mod jobs;
pub mod liquidity;
pub mod listener;
pub mod markets;
pub mod orders;
pub mod provider;
pub mod swaps;

#[cfg(test)]
mod mock;

pub use config::SyncConfig;
pub use directory::MarketDirectory;
pub use driver::{JobKind, SyncDriver};
pub use events::{ChainEvent, EventKind, is_dex_event};
pub use history::HistorySync;
pub use intervals::{IntervalSync, IntervalSyncReport, SyncOutcome};
pub use jobs::SyncJobs;
pub use liquidity::LiquidityPoolSync;
pub use listener::{DispatchOutcome, Dispatcher, Listener, ListenerState};
pub use markets::MarketSync;
pub use orders::OrderSync;
pub use provider::{ChainClient, EventSource, RawEvent};
pub use swaps::{SwapEventData, SwapSync};
