//! Path table update decisions for inbound announces.
//!
//! Kept as a pure function so every branch can be tested without an engine.

use crate::path::types::{PathEntry, PathState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathUpdate {
    /// No entry yet.
    Insert,
    /// Existing entry is worse, expired, or unresponsive and superseded.
    Replace,
    /// Keep the entry, only remember the announce's random blob.
    TrackBlob,
    /// The announce is a replay of one already accepted.
    Skip,
}

/// Decide what an announce with `hops` and `random_hash`, emitted at
/// `emitted_secs`, does to the current entry.
#[must_use]
pub fn decide_path_update(
    existing: Option<&PathEntry>,
    hops: u8,
    random_hash: &[u8; 10],
    emitted_secs: u64,
    now: u64,
) -> PathUpdate {
    let Some(entry) = existing else {
        return PathUpdate::Insert;
    };
    if entry.has_blob(random_hash) {
        return PathUpdate::Skip;
    }
    if hops <= entry.hops || entry.is_expired(now) {
        return PathUpdate::Replace;
    }
    if entry.state == PathState::Unresponsive && emitted_secs > entry.latest_emission() {
        return PathUpdate::Replace;
    }
    PathUpdate::TrackBlob
}
