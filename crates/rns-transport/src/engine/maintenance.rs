//! Periodic table upkeep.
//!
//! One task ticks every `job_interval_ms`. Each tick paces announce queues;
//! slower jobs (receipt timeouts, table culling, hashlist retirement,
//! persistence) run every N ticks.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::Transport;
use crate::config::TransportSection;
use crate::constants::HELD_ANNOUNCE_TIMEOUT;
use crate::time::now_ms;

/// Which slow jobs are due on a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    pub receipts: bool,
    pub cull: bool,
    pub retire: bool,
    pub persist: bool,
}

impl Due {
    pub fn all() -> Self {
        Self {
            receipts: true,
            cull: true,
            retire: true,
            persist: true,
        }
    }
}

/// Tick counter deciding when each slow job runs.
#[derive(Debug, Clone)]
pub struct MaintenanceSchedule {
    tick: u64,
    receipts_every: u64,
    cull_every: u64,
    retire_every: u64,
    /// 0 disables persistence.
    persist_every: u64,
}

impl MaintenanceSchedule {
    pub fn new(config: &TransportSection) -> Self {
        let job = config.job_interval_ms.max(1);
        let every = |interval: u64| (interval / job).max(1);
        Self {
            tick: 0,
            receipts_every: every(config.receipts_check_interval_ms),
            cull_every: every(config.tables_cull_interval_ms),
            retire_every: every(config.hashlist_retire_interval_ms),
            persist_every: match config.persist_interval_secs {
                0 => 0,
                secs => every(secs * 1000),
            },
        }
    }

    pub fn advance(&mut self) -> Due {
        self.tick += 1;
        let t = self.tick;
        Due {
            receipts: t % self.receipts_every == 0,
            cull: t % self.cull_every == 0,
            retire: t % self.retire_every == 0,
            persist: self.persist_every != 0 && t % self.persist_every == 0,
        }
    }
}

pub(crate) async fn run(transport: Weak<Transport>, mut stop_rx: watch::Receiver<bool>, config: TransportSection) {
    let mut interval = tokio::time::interval(Duration::from_millis(config.job_interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut schedule = MaintenanceSchedule::new(&config);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }
        let Some(transport) = transport.upgrade() else {
            break;
        };
        transport.maintenance_tick(now_ms(), schedule.advance()).await;
    }
    debug!("maintenance task exited");
}

impl Transport {
    /// Run one maintenance pass as of `now`.
    pub async fn maintenance_tick(&self, now: u64, due: Due) {
        self.process_announce_queues(now);
        let released = self.announces.release_held(now, HELD_ANNOUNCE_TIMEOUT);
        if released > 0 {
            debug!(released, "restored held announces");
        }
        self.traffic.update_speeds(now);

        if due.receipts {
            for receipt in self.receipts.expire(now, self.config.max_receipts) {
                debug!(hash = %receipt.hash, dest = %receipt.destination, "receipt timed out");
                self.mark_path_unresponsive(&receipt.destination);
                receipt.callback.on_timeout();
            }
        }

        if due.cull {
            let _guard = self.decision.lock();
            let paths = self.path_table.cull(now);
            let reverse = self.reverse_table.cull(now);
            let links = self.link_table.cull(now);
            let tunnels = self.tunnels.cull(now);
            self.announce_rate.cull(now);
            self.path_requests.lock().cull(now);
            self.announces.retain(|dest| self.path_table.get(dest).is_some());
            if paths + reverse + links + tunnels > 0 {
                debug!(paths, reverse, links, tunnels, "culled tables");
            }
        }

        if due.retire {
            self.hashlist.lock().retire_previous();
        }

        if due.persist
            && let Some(dir) = self.config.storage_path.as_deref()
            && let Err(e) = self.persist_data(dir).await
        {
            warn!(path = %dir.display(), "periodic persist failed: {e}");
        }
    }
}
