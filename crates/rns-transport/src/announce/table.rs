//! The last announce seen per destination, and announces held aside while
//! a path response for the same destination is in flight.

use dashmap::DashMap;

use rns_core::{DestinationHash, PacketHash};

use crate::interface::InterfaceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceEntry {
    pub raw: Vec<u8>,
    pub hops: u8,
    pub receiving_interface: InterfaceId,
    pub received_at: u64,
    pub packet_hash: PacketHash,
    pub path_response: bool,
}

#[derive(Debug, Clone)]
struct HeldAnnounce {
    entry: AnnounceEntry,
    held_at: u64,
}

#[derive(Default)]
pub struct AnnounceTable {
    entries: DashMap<DestinationHash, AnnounceEntry>,
    held: DashMap<DestinationHash, HeldAnnounce>,
}

impl AnnounceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry`. A path response displacing a regular announce holds
    /// the regular one so it can be restored afterwards.
    pub fn record(&self, dest: DestinationHash, entry: AnnounceEntry, now: u64) {
        let is_response = entry.path_response;
        if let Some(previous) = self.entries.insert(dest, entry)
            && is_response
            && !previous.path_response
        {
            self.held.insert(
                dest,
                HeldAnnounce {
                    entry: previous,
                    held_at: now,
                },
            );
        }
    }

    #[must_use]
    pub fn get(&self, dest: &DestinationHash) -> Option<AnnounceEntry> {
        self.entries.get(dest).map(|e| e.clone())
    }

    pub fn remove(&self, dest: &DestinationHash) -> Option<AnnounceEntry> {
        self.held.remove(dest);
        self.entries.remove(dest).map(|(_, e)| e)
    }

    #[must_use]
    pub fn is_held(&self, dest: &DestinationHash) -> bool {
        self.held.contains_key(dest)
    }

    /// Release holds older than `timeout`. A held announce goes back into
    /// the cache unless a newer regular announce arrived meanwhile.
    /// Returns how many were restored.
    pub fn release_held(&self, now: u64, timeout: u64) -> usize {
        let due: Vec<DestinationHash> = self
            .held
            .iter()
            .filter(|h| now.saturating_sub(h.held_at) >= timeout)
            .map(|h| *h.key())
            .collect();

        let mut restored = 0;
        for dest in due {
            let Some((_, held)) = self.held.remove(&dest) else {
                continue;
            };
            let superseded = self
                .entries
                .get(&dest)
                .is_some_and(|current| !current.path_response);
            if !superseded {
                self.entries.insert(dest, held.entry);
                restored += 1;
            }
        }
        restored
    }

    /// Keep only destinations for which `keep` holds.
    pub fn retain(&self, mut keep: impl FnMut(&DestinationHash) -> bool) {
        self.entries.retain(|dest, _| keep(dest));
        self.held.retain(|dest, _| self.entries.contains_key(dest));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn held_len(&self) -> usize {
        self.held.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.held.clear();
    }
}
