//! Concurrent path table.
//!
//! Readers and writers on different destinations never block each other.
//! Read accessors hand out clones so no shard guard outlives the call.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use rns_core::{DestinationHash, TruncatedHash};

use crate::constants::PATHFINDER_M;
use crate::interface::InterfaceId;
use crate::path::types::{PathEntry, PathState};

#[derive(Default)]
pub struct PathTable {
    entries: DashMap<DestinationHash, PathEntry>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `dest`, expired or not.
    #[must_use]
    pub fn get(&self, dest: &DestinationHash) -> Option<PathEntry> {
        self.entries.get(dest).map(|e| e.clone())
    }

    /// The entry for `dest` if it has not expired.
    #[must_use]
    pub fn live(&self, dest: &DestinationHash, now: u64) -> Option<PathEntry> {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.clone())
    }

    #[must_use]
    pub fn has_path(&self, dest: &DestinationHash, now: u64) -> bool {
        self.entries.get(dest).is_some_and(|e| !e.is_expired(now))
    }

    /// Hop count to `dest`, or `PATHFINDER_M` when unknown.
    #[must_use]
    pub fn hops_to(&self, dest: &DestinationHash, now: u64) -> u8 {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.hops)
            .unwrap_or(PATHFINDER_M)
    }

    #[must_use]
    pub fn next_hop(&self, dest: &DestinationHash, now: u64) -> Option<TruncatedHash> {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.next_hop)
    }

    #[must_use]
    pub fn next_hop_interface(&self, dest: &DestinationHash, now: u64) -> Option<InterfaceId> {
        self.entries
            .get(dest)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.receiving_interface)
    }

    pub fn insert(&self, dest: DestinationHash, entry: PathEntry) -> Option<PathEntry> {
        self.entries.insert(dest, entry)
    }

    pub fn remove(&self, dest: &DestinationHash) -> Option<PathEntry> {
        self.entries.remove(dest).map(|(_, e)| e)
    }

    /// Apply `f` to the entry in place. Returns `None` if there is no entry.
    pub fn update<R>(&self, dest: &DestinationHash, f: impl FnOnce(&mut PathEntry) -> R) -> Option<R> {
        self.entries.get_mut(dest).map(|mut e| f(&mut e))
    }

    /// Count a delivery failure. A path reaching Stale is removed in the same
    /// step, so no reader ever observes a stale entry.
    pub fn mark_unresponsive(&self, dest: &DestinationHash) -> Option<PathState> {
        match self.entries.entry(*dest) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut().record_failure();
                if state == PathState::Stale {
                    occupied.remove();
                }
                Some(state)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Reset the failure count. Returns whether an entry existed.
    pub fn mark_responsive(&self, dest: &DestinationHash) -> bool {
        self.update(dest, PathEntry::reset_failures).is_some()
    }

    /// Drop expired entries, returning how many were removed.
    pub fn cull(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Point-in-time copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(DestinationHash, PathEntry)> {
        self.entries
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
