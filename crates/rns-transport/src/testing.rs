//! In-memory interface for tests and topology simulation.
//!
//! A [`MemoryInterface`] records every frame the engine sends through it.
//! Wiring two engines together is a matter of feeding one interface's
//! recorded frames into the other engine's `inbound`.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::InterfaceError;
use crate::ifac::IfacCredentials;
use crate::interface::{Interface, InterfaceId};

pub struct MemoryInterface {
    name: String,
    id: InterfaceId,
    bitrate: u64,
    online: AtomicBool,
    writable: AtomicBool,
    ifac: Option<IfacCredentials>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MemoryInterface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: InterfaceId::from_name(name),
            bitrate: 1_000_000,
            online: AtomicBool::new(true),
            writable: AtomicBool::new(true),
            ifac: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_ifac(mut self, creds: IfacCredentials) -> Self {
        self.ifac = Some(creds);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Drain the recorded frames.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Interface for MemoryInterface {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> InterfaceId {
        self.id
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn can_send(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    fn bitrate(&self) -> u64 {
        self.bitrate
    }

    fn ifac(&self) -> Option<&IfacCredentials> {
        self.ifac.as_ref()
    }

    fn send(&self, frame: &[u8]) -> Result<(), InterfaceError> {
        if !self.is_online() {
            return Err(InterfaceError::Offline);
        }
        self.sent.lock().push(frame.to_vec());
        Ok(())
    }
}
