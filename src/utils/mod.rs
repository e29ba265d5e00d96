pub mod config_loader;
pub mod lock;
pub mod logging;
pub mod tasks;

pub use config_loader::*;
pub use lock::{
    DIRECTORY_LOCK_KEY, LP_LOCK_KEY, NamedLockGuard, NamedLocker, SWAP_EVENTS_LOCK_KEY, history_lock_key,
    interval_lock_key, order_lock_key,
};
pub use logging::init_logging;
pub use tasks::{JoinReport, join_all_collect};
