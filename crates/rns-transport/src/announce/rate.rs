//! Per-destination sliding window limiter for announce retransmissions.

use std::collections::VecDeque;

use dashmap::DashMap;

use rns_core::DestinationHash;

pub struct AnnounceRateLimiter {
    window: u64,
    max: usize,
    hits: DashMap<DestinationHash, VecDeque<u64>>,
}

impl AnnounceRateLimiter {
    pub fn new(window: u64, max: usize) -> Self {
        Self {
            window,
            max,
            hits: DashMap::new(),
        }
    }

    /// Whether another retransmission for `dest` fits in the window ending
    /// at `now`. Allowed retransmissions are counted.
    pub fn allow(&self, dest: &DestinationHash, now: u64) -> bool {
        let mut hits = self.hits.entry(*dest).or_default();
        while hits.front().is_some_and(|&t| now.saturating_sub(t) >= self.window) {
            hits.pop_front();
        }
        if hits.len() >= self.max {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Forget destinations with no hits inside the window.
    pub fn cull(&self, now: u64) -> usize {
        let before = self.hits.len();
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|&t| now.saturating_sub(t) < self.window));
        before.saturating_sub(self.hits.len())
    }

    #[must_use]
    pub fn tracked(&self) -> usize {
        self.hits.len()
    }

    pub fn clear(&self) {
        self.hits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_admits_max_then_blocks() {
        let limiter = AnnounceRateLimiter::new(30_000, 5);
        let dest = DestinationHash::new([1; 16]);
        for i in 0..5 {
            assert!(limiter.allow(&dest, i * 1_000));
        }
        assert!(!limiter.allow(&dest, 10_000));
        // The first hit leaves the window at 30s.
        assert!(limiter.allow(&dest, 30_000));
        assert!(!limiter.allow(&dest, 30_500));
    }

    #[test]
    fn destinations_are_independent() {
        let limiter = AnnounceRateLimiter::new(30_000, 1);
        assert!(limiter.allow(&DestinationHash::new([1; 16]), 0));
        assert!(limiter.allow(&DestinationHash::new([2; 16]), 0));
        assert!(!limiter.allow(&DestinationHash::new([1; 16]), 0));
    }

    #[test]
    fn cull_forgets_idle_destinations() {
        let limiter = AnnounceRateLimiter::new(30_000, 5);
        limiter.allow(&DestinationHash::new([1; 16]), 0);
        limiter.allow(&DestinationHash::new([2; 16]), 20_000);
        assert_eq!(limiter.cull(30_000), 1);
        assert_eq!(limiter.tracked(), 1);
    }
}
