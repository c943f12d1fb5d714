//! Outstanding proof expectations for packets sent from this node.

use std::sync::Arc;

use dashmap::DashMap;

use rns_core::{DestinationHash, TruncatedHash};

use crate::handlers::ProofCallback;

#[derive(Clone)]
pub struct PacketReceipt {
    pub hash: TruncatedHash,
    pub destination: DestinationHash,
    pub sent_at: u64,
    pub deadline: u64,
    pub callback: Arc<dyn ProofCallback>,
}

impl std::fmt::Debug for PacketReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketReceipt")
            .field("hash", &self.hash)
            .field("destination", &self.destination)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ReceiptTable {
    receipts: DashMap<TruncatedHash, PacketReceipt>,
}

impl ReceiptTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, receipt: PacketReceipt) {
        self.receipts.insert(receipt.hash, receipt);
    }

    #[must_use]
    pub fn get(&self, hash: &TruncatedHash) -> Option<PacketReceipt> {
        self.receipts.get(hash).map(|r| r.clone())
    }

    pub fn take(&self, hash: &TruncatedHash) -> Option<PacketReceipt> {
        self.receipts.remove(hash).map(|(_, r)| r)
    }

    /// Remove receipts past their deadline, then the oldest ones while more
    /// than `max` remain. The caller reports the timeouts.
    pub fn expire(&self, now: u64, max: usize) -> Vec<PacketReceipt> {
        let due: Vec<TruncatedHash> = self
            .receipts
            .iter()
            .filter(|r| now > r.deadline)
            .map(|r| *r.key())
            .collect();
        let mut expired: Vec<PacketReceipt> = due.iter().filter_map(|h| self.take(h)).collect();

        let excess = self.receipts.len().saturating_sub(max);
        if excess > 0 {
            let mut oldest: Vec<(u64, TruncatedHash)> =
                self.receipts.iter().map(|r| (r.sent_at, *r.key())).collect();
            oldest.sort_unstable_by_key(|(sent_at, _)| *sent_at);
            expired.extend(oldest.into_iter().take(excess).filter_map(|(_, h)| self.take(&h)));
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    pub fn clear(&self) {
        self.receipts.clear();
    }
}
