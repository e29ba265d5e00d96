// Three-Layer Architecture
pub mod data_sync; // Sync Layer: chain listener, sync jobs, market directory
pub mod logic; // Logic Layer: bucketing, interval aggregation, tickers
pub mod query; // Read Layer: gap-filled series, tickers, order books

// Storage seams and shared plumbing
pub mod error;
pub mod storage;
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{
    ChainClient, ChainEvent, DispatchOutcome, Dispatcher, EventKind, EventSource, IntervalSync, Listener,
    ListenerState, MarketDirectory, RawEvent, SyncConfig, SyncDriver, SyncJobs, SyncOutcome,
};
pub use error::{EventError, QueryError};
pub use logic::{
    Interval, IntervalLength, IntervalsMap, MarketDescriptor, OrderSide, Ticker, Trade, TradingViewInterval,
};
pub use query::{IntervalQueryService, OrderBook, OrderBookService, TickerService};
pub use storage::{MemoryStorage, Storage};
pub use utils::{NamedLocker, init_logging};
