//! Per-interface announce queue with bandwidth pacing.
//!
//! Each interface may spend a small fraction of its bitrate on announces.
//! After sending one, the queue stays closed for as long as that frame
//! takes at the capped rate.

use std::collections::HashMap;

use rns_core::DestinationHash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedAnnounce {
    pub destination: DestinationHash,
    pub scheduled_time: u64,
    pub hops: u8,
    /// Emission time in unix seconds, from the announce's random hash.
    pub emitted_at: u64,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// Replaced an older emission for the same destination.
    Replaced,
    /// An equal or newer emission is already queued.
    Ignored,
    Full,
}

/// Milliseconds to wait after sending `len_bytes` at `cap` of `bitrate`.
#[must_use]
pub fn compute_announce_wait_time(len_bytes: usize, bitrate: u64, cap: f64) -> u64 {
    if bitrate == 0 || cap <= 0.0 {
        return 0;
    }
    let bits = (len_bytes * 8) as f64;
    ((bits / bitrate as f64) / cap * 1000.0).ceil() as u64
}

pub struct AnnounceQueue {
    entries: HashMap<DestinationHash, QueuedAnnounce>,
    capacity: usize,
    next_allowed: u64,
}

impl AnnounceQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            next_allowed: 0,
        }
    }

    pub fn enqueue(&mut self, announce: QueuedAnnounce) -> EnqueueOutcome {
        if let Some(existing) = self.entries.get_mut(&announce.destination) {
            if announce.emitted_at > existing.emitted_at {
                *existing = announce;
                return EnqueueOutcome::Replaced;
            }
            return EnqueueOutcome::Ignored;
        }
        if self.entries.len() >= self.capacity {
            return EnqueueOutcome::Full;
        }
        self.entries.insert(announce.destination, announce);
        EnqueueOutcome::Queued
    }

    /// Drop entries queued more than `life` ago.
    pub fn prune(&mut self, now: u64, life: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, a| now.saturating_sub(a.scheduled_time) <= life);
        before - self.entries.len()
    }

    #[must_use]
    pub fn is_ready(&self, now: u64) -> bool {
        now >= self.next_allowed && !self.entries.is_empty()
    }

    /// Take the next announce: fewest hops first, then the longest waiting.
    pub fn pop_next(&mut self, now: u64) -> Option<QueuedAnnounce> {
        if !self.is_ready(now) {
            return None;
        }
        let dest = self
            .entries
            .values()
            .min_by_key(|a| (a.hops, a.scheduled_time))
            .map(|a| a.destination)?;
        self.entries.remove(&dest)
    }

    /// Close the queue for the airtime of a `len_bytes` frame.
    pub fn mark_sent(&mut self, now: u64, len_bytes: usize, bitrate: u64, cap: f64) {
        self.next_allowed = now + compute_announce_wait_time(len_bytes, bitrate, cap);
    }

    #[must_use]
    pub fn next_allowed(&self) -> u64 {
        self.next_allowed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_allowed = 0;
    }
}
