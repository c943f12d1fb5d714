//! Router table entries and the actions a routing decision produces.

use std::sync::Arc;

use rns_core::{DestinationHash, Identity, RawPacket, TruncatedHash};

use crate::constants::{LINK_TIMEOUT, REVERSE_TIMEOUT};
use crate::handlers::{LinkSink, PacketCallback, ProofCallback};
use crate::interface::InterfaceId;

/// Where to send a proof for a packet this node relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseEntry {
    /// The packet came in here; its proof goes back out here.
    pub receiving_interface: InterfaceId,
    pub outbound_interface: InterfaceId,
    pub timestamp: u64,
}

impl ReverseEntry {
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.timestamp.saturating_add(REVERSE_TIMEOUT)
    }
}

/// A link relayed through this node, keyed by link id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub timestamp: u64,
    /// Transport id the request was forwarded to.
    pub next_hop: TruncatedHash,
    /// Towards the link's destination.
    pub next_hop_interface: InterfaceId,
    /// Towards the link's initiator.
    pub receiving_interface: InterfaceId,
    pub remaining_hops: u8,
    pub taken_hops: u8,
    pub destination: DestinationHash,
    pub validated: bool,
    pub proof_timeout: u64,
}

impl LinkEntry {
    /// Unvalidated links wait for their proof; validated ones live while
    /// traffic keeps refreshing `timestamp`.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        if self.validated {
            now > self.timestamp.saturating_add(LINK_TIMEOUT)
        } else {
            now > self.proof_timeout
        }
    }
}

/// Side effects collected while the decision lock is held and executed
/// after it is released.
pub enum RouterAction {
    Transmit {
        interface: InterfaceId,
        raw: Vec<u8>,
    },
    Broadcast {
        exclude: Option<InterfaceId>,
        raw: Vec<u8>,
    },
    Deliver {
        callback: Arc<dyn PacketCallback>,
        payload: Vec<u8>,
        packet: RawPacket,
    },
    LinkRequest {
        callback: Arc<dyn PacketCallback>,
        packet: RawPacket,
    },
    ToLink {
        sink: Arc<dyn LinkSink>,
        packet: RawPacket,
    },
    NotifyAnnounce {
        destination: DestinationHash,
        identity: Arc<Identity>,
        app_data: Option<Vec<u8>>,
    },
    Proof {
        hash: TruncatedHash,
        destination: DestinationHash,
        callback: Arc<dyn ProofCallback>,
        packet: RawPacket,
    },
}

impl std::fmt::Debug for RouterAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transmit { interface, raw } => f
                .debug_struct("Transmit")
                .field("interface", interface)
                .field("len", &raw.len())
                .finish(),
            Self::Broadcast { exclude, raw } => f
                .debug_struct("Broadcast")
                .field("exclude", exclude)
                .field("len", &raw.len())
                .finish(),
            Self::Deliver { packet, .. } => {
                f.debug_struct("Deliver").field("destination", &packet.destination).finish()
            }
            Self::LinkRequest { packet, .. } => f
                .debug_struct("LinkRequest")
                .field("destination", &packet.destination)
                .finish(),
            Self::ToLink { packet, .. } => {
                f.debug_struct("ToLink").field("link", &packet.destination).finish()
            }
            Self::NotifyAnnounce { destination, .. } => f
                .debug_struct("NotifyAnnounce")
                .field("destination", destination)
                .finish(),
            Self::Proof { hash, .. } => f.debug_struct("Proof").field("hash", hash).finish(),
        }
    }
}
