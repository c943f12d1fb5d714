//! Duplicate packet suppression over two generations of hashes.
//!
//! New hashes go into `current`. Once `current` grows past the capacity it
//! replaces `previous` and a fresh `current` starts, so a hash is remembered
//! for between one and two generations. Maintenance can also retire the
//! previous generation on a timer.

use std::collections::HashSet;

use rns_core::PacketHash;

use crate::constants::HASHLIST_MAXSIZE;

pub struct PacketHashlist {
    current: HashSet<PacketHash>,
    previous: HashSet<PacketHash>,
    capacity: usize,
}

impl PacketHashlist {
    pub fn new() -> Self {
        Self::with_max_size(HASHLIST_MAXSIZE)
    }

    /// `max_size` bounds both generations together; each holds half.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            current: HashSet::new(),
            previous: HashSet::new(),
            capacity: (max_size / 2).max(1),
        }
    }

    pub fn should_process(&self, hash: &PacketHash) -> bool {
        !self.current.contains(hash) && !self.previous.contains(hash)
    }

    pub fn remember(&mut self, hash: PacketHash) {
        self.current.insert(hash);
        if self.current.len() > self.capacity {
            self.previous = std::mem::take(&mut self.current);
        }
    }

    pub fn retire_previous(&mut self) {
        self.previous.clear();
    }

    /// Every remembered hash, previous generation first.
    pub fn iter(&self) -> impl Iterator<Item = &PacketHash> {
        self.previous.iter().chain(self.current.iter())
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    pub fn current_len(&self) -> usize {
        self.current.len()
    }

    pub fn previous_len(&self) -> usize {
        self.previous.len()
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}

impl Default for PacketHashlist {
    fn default() -> Self {
        Self::new()
    }
}
