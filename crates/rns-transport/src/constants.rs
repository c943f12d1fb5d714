//! Protocol timing and sizing constants.
//!
//! Durations are milliseconds unless the name says otherwise.

/// Maximum hop count a packet may travel.
pub const PATHFINDER_M: u8 = 128;

/// Lifetime of a path learned from an announce (7 days).
pub const PATH_EXPIRY: u64 = 7 * 24 * 60 * 60 * 1000;

/// Random blobs kept per path to reject replayed announces.
pub const MAX_RANDOM_BLOBS: usize = 64;

/// Consecutive failures before a path becomes unresponsive, then stale.
pub const UNRESPONSIVE_AFTER: u32 = 1;
pub const STALE_AFTER: u32 = 3;

/// Reverse entries are dropped if no proof arrives within 8 minutes.
pub const REVERSE_TIMEOUT: u64 = 8 * 60 * 1000;

/// Validated link entries live this long without traffic.
pub const LINK_TIMEOUT: u64 = 15 * 60 * 1000;

/// Proof deadline per remaining hop when a link request is forwarded.
pub const LINK_PROOF_TIMEOUT_PER_HOP: u64 = 6 * 1000;

/// Announce retransmissions allowed per destination inside the window.
pub const ANNOUNCE_RATE_WINDOW: u64 = 30 * 1000;
pub const ANNOUNCE_RATE_MAX: usize = 5;

/// Fraction of interface bandwidth announces may use.
pub const ANNOUNCE_CAP: f64 = 0.02;

/// Per-interface announce queue bounds.
pub const MAX_QUEUED_ANNOUNCES: usize = 16_384;
pub const QUEUED_ANNOUNCE_LIFE: u64 = 24 * 60 * 60 * 1000;

/// Held announces are restored after this long.
pub const HELD_ANNOUNCE_TIMEOUT: u64 = 30 * 1000;

/// Minimum interval between path requests for one destination.
pub const PATH_REQUEST_MIN_INTERVAL: u64 = 20 * 1000;

/// Remembered path request tags.
pub const MAX_PATH_REQUEST_TAGS: usize = 32_000;

/// Packet hashlist size; the current generation rotates at half.
pub const HASHLIST_MAXSIZE: usize = 1_000_000;

/// Outstanding receipts tracked at once.
pub const MAX_RECEIPTS: usize = 1024;

/// Concurrent tunnels.
pub const MAX_TUNNELS: usize = 256;

/// Tunnels expire this long after their last activity.
pub const TUNNEL_EXPIRY: u64 = PATH_EXPIRY;

/// Maintenance cadence.
pub const JOB_INTERVAL: u64 = 250;
pub const RECEIPTS_CHECK_INTERVAL: u64 = 1000;
pub const TABLES_CULL_INTERVAL: u64 = 5000;
pub const HASHLIST_RETIRE_INTERVAL: u64 = 60 * 60 * 1000;
