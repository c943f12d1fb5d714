//! Callbacks through which the engine hands traffic to upper layers.
//!
//! All callbacks run after the routing decision lock is released, so they
//! may call back into the transport.

use std::sync::Arc;

use rns_core::destination::{destination_hash, name_hash, plain_destination_hash};
use rns_core::{DestinationHash, DestinationType, Identity, NameHash, RawPacket};

/// Observes validated announces.
pub trait AnnounceHandler: Send + Sync {
    /// Return `true` to stop later handlers from seeing this announce.
    fn handle(&self, destination: DestinationHash, identity: &Identity, app_data: Option<&[u8]>) -> bool;
}

/// Waits for the proof of one sent packet.
pub trait ProofCallback: Send + Sync {
    /// Return `true` if the proof is valid and the receipt is done.
    fn on_proof(&self, proof: &RawPacket) -> bool;

    fn on_timeout(&self) {}
}

/// Receives traffic for a locally registered destination.
pub trait PacketCallback: Send + Sync {
    /// `payload` is decrypted for SINGLE destinations.
    fn on_packet(&self, payload: &[u8], packet: &RawPacket);

    fn on_link_request(&self, _packet: &RawPacket) {}
}

/// Receives traffic for an established local link.
pub trait LinkSink: Send + Sync {
    fn receive(&self, packet: &RawPacket);
}

/// Identifies a registered announce handler for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);

/// A destination hosted on this node.
#[derive(Clone)]
pub struct LocalDestination {
    pub hash: DestinationHash,
    pub destination_type: DestinationType,
    /// Needed to decrypt SINGLE traffic and to announce.
    pub identity: Option<Arc<Identity>>,
    pub name_hash: NameHash,
    pub callback: Arc<dyn PacketCallback>,
}

impl LocalDestination {
    /// An inbound SINGLE destination owned by `identity`.
    pub fn single(
        identity: Arc<Identity>,
        app_name: &str,
        aspects: &[&str],
        callback: Arc<dyn PacketCallback>,
    ) -> Self {
        let name_hash = name_hash(app_name, aspects);
        Self {
            hash: destination_hash(&name_hash, &identity.hash()),
            destination_type: DestinationType::Single,
            identity: Some(identity),
            name_hash,
            callback,
        }
    }

    /// An unencrypted PLAIN destination.
    pub fn plain(app_name: &str, aspects: &[&str], callback: Arc<dyn PacketCallback>) -> Self {
        let name_hash = name_hash(app_name, aspects);
        Self {
            hash: plain_destination_hash(&name_hash),
            destination_type: DestinationType::Plain,
            identity: None,
            name_hash,
            callback,
        }
    }
}

impl std::fmt::Debug for LocalDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDestination")
            .field("hash", &self.hash)
            .field("destination_type", &self.destination_type)
            .field("has_identity", &self.identity.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ignore;

    impl PacketCallback for Ignore {
        fn on_packet(&self, _: &[u8], _: &RawPacket) {}
    }

    #[test]
    fn single_destination_hash_binds_identity() {
        let identity = Arc::new(Identity::generate());
        let dest = LocalDestination::single(identity.clone(), "app", &["inbox"], Arc::new(Ignore));
        assert_eq!(
            dest.hash,
            destination_hash(&name_hash("app", &["inbox"]), &identity.hash())
        );
        assert_eq!(dest.destination_type, DestinationType::Single);
    }

    #[test]
    fn plain_destination_has_no_identity() {
        let dest = LocalDestination::plain("app", &["beacon"], Arc::new(Ignore));
        assert!(dest.identity.is_none());
        assert_eq!(dest.hash, plain_destination_hash(&name_hash("app", &["beacon"])));
    }
}
