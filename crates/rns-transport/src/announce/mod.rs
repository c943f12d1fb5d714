//! Announce cache, retransmission rate limiting and per-interface queues.

pub mod queue;
pub mod rate;
pub mod table;

pub use queue::{AnnounceQueue, EnqueueOutcome, QueuedAnnounce, compute_announce_wait_time};
pub use rate::AnnounceRateLimiter;
pub use table::{AnnounceEntry, AnnounceTable};
