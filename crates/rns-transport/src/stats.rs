//! Traffic counters per interface and in total.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::interface::InterfaceId;

#[derive(Debug, Default)]
struct SpeedSample {
    at: u64,
    rx_bytes: u64,
    tx_bytes: u64,
    rx_bps: u64,
    tx_bps: u64,
}

#[derive(Debug, Default)]
pub struct InterfaceStats {
    pub bytes_rx: AtomicU64,
    pub bytes_tx: AtomicU64,
    pub packets_rx: AtomicU64,
    pub packets_tx: AtomicU64,
    speed: Mutex<SpeedSample>,
}

impl InterfaceStats {
    pub fn record_rx(&self, bytes: u64) {
        self.bytes_rx.fetch_add(bytes, Ordering::Relaxed);
        self.packets_rx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx(&self, bytes: u64) {
        self.bytes_tx.fetch_add(bytes, Ordering::Relaxed);
        self.packets_tx.fetch_add(1, Ordering::Relaxed);
    }

    /// Recompute bits per second since the previous sample.
    fn update_speed(&self, now: u64) {
        let rx = self.bytes_rx.load(Ordering::Relaxed);
        let tx = self.bytes_tx.load(Ordering::Relaxed);
        let mut sample = self.speed.lock();
        let elapsed = now.saturating_sub(sample.at);
        if sample.at != 0 && elapsed > 0 {
            sample.rx_bps = rx.saturating_sub(sample.rx_bytes) * 8 * 1000 / elapsed;
            sample.tx_bps = tx.saturating_sub(sample.tx_bytes) * 8 * 1000 / elapsed;
        }
        sample.at = now;
        sample.rx_bytes = rx;
        sample.tx_bytes = tx;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let speed = self.speed.lock();
        StatsSnapshot {
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            packets_rx: self.packets_rx.load(Ordering::Relaxed),
            packets_tx: self.packets_tx.load(Ordering::Relaxed),
            rx_bps: speed.rx_bps,
            tx_bps: speed.tx_bps,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_rx: u64,
    pub bytes_tx: u64,
    pub packets_rx: u64,
    pub packets_tx: u64,
    pub rx_bps: u64,
    pub tx_bps: u64,
}

#[derive(Default)]
pub struct TrafficCounters {
    per_interface: DashMap<InterfaceId, Arc<InterfaceStats>>,
    total: InterfaceStats,
}

impl TrafficCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, interface: &InterfaceId) -> Arc<InterfaceStats> {
        self.per_interface.entry(*interface).or_default().clone()
    }

    pub fn record_rx(&self, interface: &InterfaceId, bytes: usize) {
        self.entry(interface).record_rx(bytes as u64);
        self.total.record_rx(bytes as u64);
    }

    pub fn record_tx(&self, interface: &InterfaceId, bytes: usize) {
        self.entry(interface).record_tx(bytes as u64);
        self.total.record_tx(bytes as u64);
    }

    pub fn update_speeds(&self, now: u64) {
        for stats in self.per_interface.iter() {
            stats.update_speed(now);
        }
        self.total.update_speed(now);
    }

    #[must_use]
    pub fn interface(&self, interface: &InterfaceId) -> Option<StatsSnapshot> {
        self.per_interface.get(interface).map(|s| s.snapshot())
    }

    #[must_use]
    pub fn total(&self) -> StatsSnapshot {
        self.total.snapshot()
    }

    pub fn forget(&self, interface: &InterfaceId) {
        self.per_interface.remove(interface);
    }
}
