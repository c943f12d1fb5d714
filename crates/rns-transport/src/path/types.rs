//! Path entries and their health state machine.

use rns_core::{PacketHash, TruncatedHash};

use crate::constants::{MAX_RANDOM_BLOBS, STALE_AFTER, UNRESPONSIVE_AFTER};
use crate::interface::InterfaceId;

/// Health of a path, stored by ordinal in the persisted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Active = 0,
    Unresponsive = 1,
    Stale = 2,
}

impl PathState {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Active),
            1 => Some(Self::Unresponsive),
            2 => Some(Self::Stale),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    /// Last refresh, epoch ms.
    pub timestamp: u64,
    /// The announcing relay, or the destination itself for a direct route.
    pub next_hop: TruncatedHash,
    pub hops: u8,
    /// Epoch ms after which the entry counts as absent.
    pub expires: u64,
    /// Interface the announce arrived on; traffic to the destination leaves here.
    pub receiving_interface: InterfaceId,
    pub announce_packet_hash: PacketHash,
    pub state: PathState,
    pub failure_count: u32,
    /// Announce random hashes already accepted for this destination.
    pub random_blobs: Vec<[u8; 10]>,
}

impl PathEntry {
    pub fn new(
        timestamp: u64,
        next_hop: TruncatedHash,
        hops: u8,
        expires: u64,
        receiving_interface: InterfaceId,
        announce_packet_hash: PacketHash,
    ) -> Self {
        Self {
            timestamp,
            next_hop,
            hops,
            expires,
            receiving_interface,
            announce_packet_hash,
            state: PathState::Active,
            failure_count: 0,
            random_blobs: Vec::new(),
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires
    }

    /// Count one failed delivery and return the resulting state.
    pub fn record_failure(&mut self) -> PathState {
        self.failure_count = self.failure_count.saturating_add(1);
        self.state = if self.failure_count >= STALE_AFTER {
            PathState::Stale
        } else if self.failure_count >= UNRESPONSIVE_AFTER {
            PathState::Unresponsive
        } else {
            PathState::Active
        };
        self.state
    }

    pub fn reset_failures(&mut self) {
        self.failure_count = 0;
        self.state = PathState::Active;
    }

    pub fn has_blob(&self, blob: &[u8; 10]) -> bool {
        self.random_blobs.contains(blob)
    }

    /// Keep only the newest blobs.
    pub fn add_blob(&mut self, blob: [u8; 10]) {
        if self.has_blob(&blob) {
            return;
        }
        self.random_blobs.push(blob);
        if self.random_blobs.len() > MAX_RANDOM_BLOBS {
            let excess = self.random_blobs.len() - MAX_RANDOM_BLOBS;
            self.random_blobs.drain(..excess);
        }
    }

    /// Latest emission time (unix seconds) among the accepted blobs.
    pub fn latest_emission(&self) -> u64 {
        self.random_blobs
            .iter()
            .map(|blob| {
                let mut be = [0u8; 8];
                be[3..].copy_from_slice(&blob[5..]);
                u64::from_be_bytes(be)
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> PathEntry {
        PathEntry::new(
            1_000,
            TruncatedHash::new([1; 16]),
            2,
            5_000,
            InterfaceId::from_name("if0"),
            PacketHash::new([2; 32]),
        )
    }

    #[test]
    fn expiry_is_strict() {
        let e = entry();
        assert!(!e.is_expired(5_000));
        assert!(e.is_expired(5_001));
    }

    #[test]
    fn failures_walk_the_state_machine() {
        let mut e = entry();
        assert_eq!(e.record_failure(), PathState::Unresponsive);
        assert_eq!(e.record_failure(), PathState::Unresponsive);
        assert_eq!(e.record_failure(), PathState::Stale);
        e.reset_failures();
        assert_eq!(e.state, PathState::Active);
        assert_eq!(e.failure_count, 0);
    }

    #[test]
    fn ordinals_round_trip() {
        for s in [PathState::Active, PathState::Unresponsive, PathState::Stale] {
            assert_eq!(PathState::from_ordinal(s.ordinal()), Some(s));
        }
        assert_eq!(PathState::from_ordinal(3), None);
    }

    #[test]
    fn blobs_are_bounded_and_deduplicated() {
        let mut e = entry();
        for i in 0..(MAX_RANDOM_BLOBS + 10) {
            let mut blob = [0u8; 10];
            blob[..8].copy_from_slice(&(i as u64).to_be_bytes());
            e.add_blob(blob);
            e.add_blob(blob);
        }
        assert_eq!(e.random_blobs.len(), MAX_RANDOM_BLOBS);
    }

    #[test]
    fn latest_emission_reads_timestamp_bytes() {
        let mut e = entry();
        let mut early = [0u8; 10];
        early[5..].copy_from_slice(&100u64.to_be_bytes()[3..]);
        let mut late = [1u8; 10];
        late[5..].copy_from_slice(&200u64.to_be_bytes()[3..]);
        e.add_blob(late);
        e.add_blob(early);
        assert_eq!(e.latest_emission(), 200);
    }
}
