/// Read Layer - what the HTTP layer serves
///
/// Gap-filled interval series, tickers and order-book snapshots, all read
/// from storage only.
pub mod intervals;
pub mod orders;
pub mod tickers;

pub use intervals::IntervalQueryService;
pub use orders::{OrderBook, OrderBookLevel, OrderBookService};
pub use tickers::TickerService;
