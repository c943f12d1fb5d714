//! TOML configuration for the transport engine.
//!
//! ```toml
//! [transport]
//! enable_transport = true
//! storage_path = "/var/lib/rns"
//! persist_interval_secs = 300
//!
//! [logging]
//! level = "debug"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{
    ANNOUNCE_CAP, ANNOUNCE_RATE_MAX, ANNOUNCE_RATE_WINDOW, HASHLIST_MAXSIZE,
    HASHLIST_RETIRE_INTERVAL, JOB_INTERVAL, MAX_QUEUED_ANNOUNCES, MAX_RECEIPTS, MAX_TUNNELS,
    QUEUED_ANNOUNCE_LIFE, RECEIPTS_CHECK_INTERVAL, TABLES_CULL_INTERVAL,
};
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TransportConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::parse(&content)
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

/// The `[transport]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// Route traffic for other nodes.
    pub enable_transport: bool,
    pub job_interval_ms: u64,
    pub receipts_check_interval_ms: u64,
    pub tables_cull_interval_ms: u64,
    pub hashlist_retire_interval_ms: u64,
    /// Seconds between periodic saves of the tables. 0 disables.
    pub persist_interval_secs: u64,
    /// Directory for `destination_table` and `packet_hashlist`.
    pub storage_path: Option<PathBuf>,
    pub max_receipts: usize,
    pub max_tunnels: usize,
    pub hashlist_max_size: usize,
    pub announce_rate_window_secs: u64,
    pub announce_rate_max: usize,
    /// Fraction of interface bitrate announces may use.
    pub announce_cap: f64,
    pub max_queued_announces: usize,
    pub queued_announce_life_secs: u64,
}

impl TransportSection {
    pub fn announce_rate_window_ms(&self) -> u64 {
        self.announce_rate_window_secs * 1000
    }

    pub fn queued_announce_life_ms(&self) -> u64 {
        self.queued_announce_life_secs * 1000
    }
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            enable_transport: false,
            job_interval_ms: JOB_INTERVAL,
            receipts_check_interval_ms: RECEIPTS_CHECK_INTERVAL,
            tables_cull_interval_ms: TABLES_CULL_INTERVAL,
            hashlist_retire_interval_ms: HASHLIST_RETIRE_INTERVAL,
            persist_interval_secs: 0,
            storage_path: None,
            max_receipts: MAX_RECEIPTS,
            max_tunnels: MAX_TUNNELS,
            hashlist_max_size: HASHLIST_MAXSIZE,
            announce_rate_window_secs: ANNOUNCE_RATE_WINDOW / 1000,
            announce_rate_max: ANNOUNCE_RATE_MAX,
            announce_cap: ANNOUNCE_CAP,
            max_queued_announces: MAX_QUEUED_ANNOUNCES,
            queued_announce_life_secs: QUEUED_ANNOUNCE_LIFE / 1000,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
