//! Reverse table and link table.

use dashmap::DashMap;

use rns_core::{LinkId, TruncatedHash};

use crate::router::types::{LinkEntry, ReverseEntry};

/// Proof return routes, keyed by the truncated hash of the relayed packet.
#[derive(Default)]
pub struct ReverseTable {
    entries: DashMap<TruncatedHash, ReverseEntry>,
}

impl ReverseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: TruncatedHash, entry: ReverseEntry) {
        self.entries.insert(key, entry);
    }

    /// Remove and return the entry; each is used by exactly one proof.
    pub fn take(&self, key: &TruncatedHash) -> Option<ReverseEntry> {
        self.entries.remove(key).map(|(_, e)| e)
    }

    #[must_use]
    pub fn contains(&self, key: &TruncatedHash) -> bool {
        self.entries.contains_key(key)
    }

    pub fn cull(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
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

/// Relayed links, keyed by link id.
#[derive(Default)]
pub struct LinkTable {
    entries: DashMap<LinkId, LinkEntry>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, link_id: LinkId, entry: LinkEntry) {
        self.entries.insert(link_id, entry);
    }

    #[must_use]
    pub fn get(&self, link_id: &LinkId) -> Option<LinkEntry> {
        self.entries.get(link_id).map(|e| e.clone())
    }

    #[must_use]
    pub fn contains(&self, link_id: &LinkId) -> bool {
        self.entries.contains_key(link_id)
    }

    pub fn update<R>(&self, link_id: &LinkId, f: impl FnOnce(&mut LinkEntry) -> R) -> Option<R> {
        self.entries.get_mut(link_id).map(|mut e| f(&mut e))
    }

    pub fn mark_validated(&self, link_id: &LinkId, now: u64) -> bool {
        self.update(link_id, |e| {
            e.validated = true;
            e.timestamp = now;
        })
        .is_some()
    }

    pub fn touch(&self, link_id: &LinkId, now: u64) {
        self.update(link_id, |e| e.timestamp = now);
    }

    pub fn remove(&self, link_id: &LinkId) -> Option<LinkEntry> {
        self.entries.remove(link_id).map(|(_, e)| e)
    }

    pub fn cull(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
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
