//! Cancellation for the engine's background task.
//!
//! [`ShutdownToken`] pairs a watch channel that tells the maintenance loop to
//! exit with the handle needed to await it, plus the running flag `start`
//! and `stop` flip. A stopped token can be re-armed so a transport may be
//! started again.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct ShutdownToken {
    stop_tx: watch::Sender<bool>,
    running: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            stop_tx,
            running: AtomicBool::new(false),
            task_handles: Mutex::new(Vec::new()),
        }
    }

    /// Flip to running. Returns false if already running.
    pub fn begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.stop_tx.send_replace(false);
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Each background task holds its own receiver and watches it in a
    /// `tokio::select!` branch.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    pub fn add_task(&self, handle: JoinHandle<()>) {
        self.task_handles.lock().push(handle);
    }

    /// Idempotent.
    pub fn signal_stop(&self) {
        self.stop_tx.send_replace(true);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Await every registered task. Join errors are ignored.
    pub async fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = self.task_handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_exclusive_until_stopped() {
        let token = ShutdownToken::new();
        assert!(token.begin());
        assert!(!token.begin());
        token.signal_stop();
        assert!(!token.is_running());
        assert!(token.begin());
        assert!(!token.is_stopped());
    }

    #[test]
    fn stop_is_visible_to_subscribers() {
        let token = ShutdownToken::new();
        token.begin();
        let rx = token.subscribe();
        assert!(!*rx.borrow());
        token.signal_stop();
        token.signal_stop();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn join_all_waits_for_tasks() {
        let token = ShutdownToken::new();
        token.begin();
        let mut rx = token.subscribe();
        token.add_task(tokio::spawn(async move {
            let _ = rx.wait_for(|stopped| *stopped).await;
        }));
        token.signal_stop();
        token.join_all().await;
        assert!(token.task_handles.lock().is_empty());
    }
}
