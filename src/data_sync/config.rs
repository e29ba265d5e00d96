use crate::logic::{IntervalLength, coarsest};
use crate::utils::config_loader::{
    ConfigSectionLoader, ConfigSectionLoaderSync, LoadConfigError, load_from_file, load_from_file_sync,
};
use async_trait::async_trait;
use chrono::TimeDelta;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Deserialize, Debug)]
pub struct SyncConfigRoot {
    pub sync: SyncConfig,
}

/// Configuration for the synchronization layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Interval lengths materialized for every market, in minutes
    pub interval_lengths: Vec<u32>,
    /// Re-fold lookback in minutes; the coarsest interval length when unset
    pub refold_length: Option<u32>,
    /// Interval length the tickers are folded from, in minutes
    pub ticker_interval_length: u32,
    /// Rolling ticker window in hours
    pub ticker_window_hours: u32,
    /// Page size for full history syncs
    pub history_page_size: usize,
    /// Page size for the history sync triggered by an executed order
    pub listener_history_batch_size: usize,
    /// Rows per interval upsert and per mark-processed call
    pub interval_batch_size: usize,
    /// Event source keep-alive period in seconds
    pub heartbeat_interval_secs: u64,
    /// Maximum number of consecutive subscription attempts
    pub max_reconnect_attempts: u32,
    /// Delay between subscription attempts in seconds
    pub reconnect_delay_secs: u64,
    /// Buffer size of the event channel
    pub event_channel_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_lengths: IntervalLength::DEFAULTS.iter().map(IntervalLength::minutes).collect(),
            refold_length: None,
            ticker_interval_length: 5,
            ticker_window_hours: 24,
            history_page_size: 5000,
            listener_history_batch_size: 150,
            interval_batch_size: 1000,
            heartbeat_interval_secs: 300,
            max_reconnect_attempts: 5,
            reconnect_delay_secs: 2,
            event_channel_buffer: 100,
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| eyre!("Invalid {}: {}", name, e))
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(lengths) = lookup("SYNC_INTERVAL_LENGTHS") {
            config.interval_lengths = lengths
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(|part| parse_var("SYNC_INTERVAL_LENGTHS", part))
                .collect::<Result<_>>()?;
        }

        if let Some(value) = lookup("SYNC_REFOLD_LENGTH") {
            config.refold_length = Some(parse_var("SYNC_REFOLD_LENGTH", &value)?);
        }

        if let Some(value) = lookup("SYNC_TICKER_INTERVAL_LENGTH") {
            config.ticker_interval_length = parse_var("SYNC_TICKER_INTERVAL_LENGTH", &value)?;
        }

        if let Some(value) = lookup("SYNC_TICKER_WINDOW_HOURS") {
            config.ticker_window_hours = parse_var("SYNC_TICKER_WINDOW_HOURS", &value)?;
        }

        if let Some(value) = lookup("SYNC_HISTORY_PAGE_SIZE") {
            config.history_page_size = parse_var("SYNC_HISTORY_PAGE_SIZE", &value)?;
        }

        if let Some(value) = lookup("SYNC_LISTENER_HISTORY_BATCH_SIZE") {
            config.listener_history_batch_size = parse_var("SYNC_LISTENER_HISTORY_BATCH_SIZE", &value)?;
        }

        if let Some(value) = lookup("SYNC_INTERVAL_BATCH_SIZE") {
            config.interval_batch_size = parse_var("SYNC_INTERVAL_BATCH_SIZE", &value)?;
        }

        if let Some(value) = lookup("SYNC_HEARTBEAT_INTERVAL_SECS") {
            config.heartbeat_interval_secs = parse_var("SYNC_HEARTBEAT_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = lookup("SYNC_MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = parse_var("SYNC_MAX_RECONNECT_ATTEMPTS", &value)?;
        }

        if let Some(value) = lookup("SYNC_RECONNECT_DELAY_SECS") {
            config.reconnect_delay_secs = parse_var("SYNC_RECONNECT_DELAY_SECS", &value)?;
        }

        if let Some(value) = lookup("SYNC_EVENT_CHANNEL_BUFFER") {
            config.event_channel_buffer = parse_var("SYNC_EVENT_CHANNEL_BUFFER", &value)?;
        }

        Ok(config)
    }

    /// Loads the `[sync]` section of a TOML file and validates it.
    pub async fn load_from_file(file_name: &Path) -> Result<Self> {
        let config = <Self as ConfigSectionLoader>::load_section_from_file(file_name).await?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_lengths.is_empty() {
            return Err(eyre!("interval_lengths must not be empty"));
        }
        if let Some(zero) = self.interval_lengths.iter().find(|minutes| **minutes == 0) {
            return Err(eyre!("interval length must be positive, got {}", zero));
        }
        if let Some(refold) = self.refold_length {
            if refold == 0 {
                return Err(eyre!("refold_length must be positive"));
            }
            // a refold window starting inside a coarser bucket would overwrite its row with a partial fold
            if let Some(length) = self.interval_lengths.iter().find(|minutes| refold % **minutes != 0) {
                return Err(eyre!("refold_length {} is not a multiple of interval length {}", refold, length));
            }
        }
        if self.ticker_interval_length == 0 || self.ticker_window_hours == 0 {
            return Err(eyre!("ticker interval length and window must be positive"));
        }
        if self.history_page_size == 0 || self.listener_history_batch_size == 0 || self.interval_batch_size == 0 {
            return Err(eyre!("batch sizes must be positive"));
        }
        if self.event_channel_buffer == 0 {
            return Err(eyre!("event_channel_buffer must be positive"));
        }
        Ok(())
    }

    /// Configured lengths, deduplicated and ascending. Zero entries are skipped.
    pub fn interval_lengths(&self) -> Vec<IntervalLength> {
        let mut lengths: Vec<IntervalLength> =
            self.interval_lengths.iter().filter_map(|minutes| IntervalLength::new(*minutes)).collect();
        lengths.sort();
        lengths.dedup();
        lengths
    }

    /// Length used to widen the re-fold window of an interval sync.
    pub fn refold_length(&self) -> IntervalLength {
        self.refold_length
            .and_then(IntervalLength::new)
            .or_else(|| coarsest(&self.interval_lengths()))
            .unwrap_or(IntervalLength::ONE_DAY)
    }

    pub fn ticker_interval_length(&self) -> IntervalLength {
        IntervalLength::new(self.ticker_interval_length).unwrap_or(IntervalLength::FIVE_MINUTES)
    }

    pub fn ticker_window(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.ticker_window_hours))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

#[async_trait]
impl ConfigSectionLoader for SyncConfig {
    type SectionType = SyncConfig;

    async fn load_section_from_file(file_name: &Path) -> Result<Self::SectionType, LoadConfigError> {
        let root: SyncConfigRoot = load_from_file(file_name).await?;
        Ok(root.sync)
    }
}

impl ConfigSectionLoaderSync for SyncConfig {
    type SectionType = SyncConfig;

    fn load_section_from_file_sync(file_name: &Path) -> Result<Self::SectionType, LoadConfigError> {
        let root: SyncConfigRoot = load_from_file_sync(file_name)?;
        Ok(root.sync)
    }
}
