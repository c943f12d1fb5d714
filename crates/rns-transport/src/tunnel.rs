//! Virtual tunnels.
//!
//! A tunnel binds a remote transport identity to one of our interfaces.
//! Paths learned through a tunnelled interface are also recorded in the
//! tunnel, so when the peer reconnects over a new interface object its
//! paths come back without waiting for fresh announces.
//!
//! Synthesis packet payload:
//!
//! ```text
//! public_key(64) interface_id(32) random(16) signature(64)
//! ```
//!
//! The signature covers the first 112 bytes.

use std::collections::HashMap;
use std::fmt;

use dashmap::DashMap;
use rand::RngCore;

use rns_core::destination::{name_hash, plain_destination_hash};
use rns_core::{
    ContextType, DestinationHash, DestinationType, Identity, IdentityError, PacketHash,
    PacketType, RawPacket, TruncatedHash,
};
use rns_crypto::sha::sha256_concat;

use crate::constants::TUNNEL_EXPIRY;
use crate::error::TransportError;
use crate::interface::InterfaceId;

pub const TUNNEL_SYNTH_APP: &str = "rnstransport";
pub const TUNNEL_SYNTH_ASPECTS: [&str; 2] = ["tunnel", "synthesize"];

const SIGNED_LEN: usize = 64 + 32 + 16;
pub const SYNTHESIS_LEN: usize = SIGNED_LEN + 64;

pub fn tunnel_synthesis_destination() -> DestinationHash {
    plain_destination_hash(&name_hash(TUNNEL_SYNTH_APP, &TUNNEL_SYNTH_ASPECTS))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TunnelId([u8; 32]);

impl TunnelId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TunnelId({}..)", hex::encode(&self.0[..4]))
    }
}

/// `sha256(public_key || interface_id)`. Stable across reconnects because
/// both inputs are.
pub fn derive_tunnel_id(public_key: &[u8; 64], interface: &InterfaceId) -> TunnelId {
    TunnelId(sha256_concat(&[public_key.as_slice(), interface.as_bytes().as_slice()]))
}

/// Build a signed synthesis packet announcing `identity` on `interface`.
pub fn build_synthesis(identity: &Identity, interface: &InterfaceId) -> Result<RawPacket, IdentityError> {
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);

    let mut data = Vec::with_capacity(SYNTHESIS_LEN);
    data.extend_from_slice(&identity.public_key_bytes());
    data.extend_from_slice(interface.as_bytes());
    data.extend_from_slice(&random);
    let signature = identity.sign(&data)?;
    data.extend_from_slice(&signature);

    Ok(RawPacket::new(
        PacketType::Data,
        DestinationType::Plain,
        tunnel_synthesis_destination(),
        ContextType::None,
        data,
    ))
}

/// Validate a synthesis payload, returning the sender's public key and the
/// interface id it claims.
pub fn parse_synthesis(data: &[u8]) -> Option<([u8; 64], InterfaceId)> {
    if data.len() != SYNTHESIS_LEN {
        return None;
    }
    let public_key: [u8; 64] = data[..64].try_into().ok()?;
    let interface: [u8; 32] = data[64..96].try_into().ok()?;
    let signature: [u8; 64] = data[SIGNED_LEN..].try_into().ok()?;
    let identity = Identity::from_public_bytes(&public_key).ok()?;
    identity.verify(&data[..SIGNED_LEN], &signature).ok()?;
    Some((public_key, InterfaceId::new(interface)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelPathEntry {
    pub timestamp: u64,
    pub next_hop: TruncatedHash,
    pub hops: u8,
    pub expires: u64,
    pub announce_packet_hash: PacketHash,
}

#[derive(Debug, Clone)]
pub struct TunnelInfo {
    pub tunnel_id: TunnelId,
    /// `None` while the peer is disconnected.
    pub interface: Option<InterfaceId>,
    pub created_at: u64,
    pub last_activity: u64,
    pub expires: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub paths: HashMap<DestinationHash, TunnelPathEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelOutcome {
    Created,
    /// Known tunnel on a new interface; its unexpired paths to restore.
    Reassociated {
        replay: Vec<(DestinationHash, TunnelPathEntry)>,
    },
    Refreshed,
}

pub struct TunnelManager {
    tunnels: DashMap<TunnelId, TunnelInfo>,
    by_interface: DashMap<InterfaceId, TunnelId>,
    max_tunnels: usize,
}

impl TunnelManager {
    pub fn new(max_tunnels: usize) -> Self {
        Self {
            tunnels: DashMap::new(),
            by_interface: DashMap::new(),
            max_tunnels,
        }
    }

    /// Create, refresh or re-associate the tunnel `id` with `interface`.
    pub fn handle_tunnel(
        &self,
        id: TunnelId,
        interface: InterfaceId,
        now: u64,
    ) -> Result<TunnelOutcome, TransportError> {
        if let Some(mut tunnel) = self.tunnels.get_mut(&id) {
            tunnel.last_activity = now;
            tunnel.expires = now.saturating_add(TUNNEL_EXPIRY);
            let outcome = if tunnel.interface == Some(interface) {
                TunnelOutcome::Refreshed
            } else {
                if let Some(previous) = tunnel.interface.replace(interface) {
                    self.by_interface.remove_if(&previous, |_, bound| *bound == id);
                }
                TunnelOutcome::Reassociated {
                    replay: tunnel
                        .paths
                        .iter()
                        .filter(|(_, p)| now <= p.expires)
                        .map(|(d, p)| (*d, p.clone()))
                        .collect(),
                }
            };
            drop(tunnel);
            self.bind(interface, id);
            return Ok(outcome);
        }

        if self.tunnels.len() >= self.max_tunnels {
            return Err(TransportError::TunnelCapacity {
                max: self.max_tunnels,
            });
        }
        self.tunnels.insert(
            id,
            TunnelInfo {
                tunnel_id: id,
                interface: Some(interface),
                created_at: now,
                last_activity: now,
                expires: now.saturating_add(TUNNEL_EXPIRY),
                tx_bytes: 0,
                rx_bytes: 0,
                paths: HashMap::new(),
            },
        );
        self.bind(interface, id);
        Ok(TunnelOutcome::Created)
    }

    /// Point `interface` at `id`. A different tunnel previously bound to the
    /// same interface is detached from it.
    fn bind(&self, interface: InterfaceId, id: TunnelId) {
        if let Some(displaced) = self.by_interface.insert(interface, id)
            && displaced != id
            && let Some(mut other) = self.tunnels.get_mut(&displaced)
            && other.interface == Some(interface)
        {
            other.interface = None;
        }
    }

    /// Forget a tunnel that was never used, e.g. after its synthesis packet
    /// could not be sent.
    pub fn remove(&self, id: &TunnelId) -> Option<TunnelInfo> {
        let (_, tunnel) = self.tunnels.remove(id)?;
        if let Some(interface) = tunnel.interface {
            self.by_interface.remove_if(&interface, |_, bound| bound == id);
        }
        Some(tunnel)
    }

    #[must_use]
    pub fn tunnel_for(&self, interface: &InterfaceId) -> Option<TunnelId> {
        self.by_interface.get(interface).map(|id| *id)
    }

    #[must_use]
    pub fn get(&self, id: &TunnelId) -> Option<TunnelInfo> {
        self.tunnels.get(id).map(|t| t.clone())
    }

    /// Remember a path learned over `interface` if it carries a tunnel.
    pub fn record_path(&self, interface: &InterfaceId, dest: DestinationHash, path: TunnelPathEntry) -> bool {
        let Some(id) = self.tunnel_for(interface) else {
            return false;
        };
        match self.tunnels.get_mut(&id) {
            Some(mut tunnel) => {
                tunnel.paths.insert(dest, path);
                true
            }
            None => false,
        }
    }

    pub fn record_rx(&self, interface: &InterfaceId, bytes: usize, now: u64) {
        self.with_interface_tunnel(interface, |t| {
            t.rx_bytes += bytes as u64;
            t.last_activity = now;
        });
    }

    pub fn record_tx(&self, interface: &InterfaceId, bytes: usize, now: u64) {
        self.with_interface_tunnel(interface, |t| {
            t.tx_bytes += bytes as u64;
            t.last_activity = now;
        });
    }

    fn with_interface_tunnel(&self, interface: &InterfaceId, f: impl FnOnce(&mut TunnelInfo)) {
        if let Some(id) = self.tunnel_for(interface)
            && let Some(mut tunnel) = self.tunnels.get_mut(&id)
        {
            f(&mut tunnel);
        }
    }

    /// Detach tunnels from an interface that went away. They stay until
    /// they expire.
    pub fn void_interface(&self, interface: &InterfaceId) -> Option<TunnelId> {
        let (_, id) = self.by_interface.remove(interface)?;
        if let Some(mut tunnel) = self.tunnels.get_mut(&id)
            && tunnel.interface.as_ref() == Some(interface)
        {
            tunnel.interface = None;
        }
        Some(id)
    }

    /// Drop expired tunnels and expired paths inside live ones.
    pub fn cull(&self, now: u64) -> usize {
        let before = self.tunnels.len();
        self.tunnels.retain(|_, t| now <= t.expires);
        for mut tunnel in self.tunnels.iter_mut() {
            tunnel.paths.retain(|_, p| now <= p.expires);
        }
        self.by_interface
            .retain(|_, id| self.tunnels.contains_key(id));
        before.saturating_sub(self.tunnels.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }

    pub fn clear(&self) {
        self.tunnels.clear();
        self.by_interface.clear();
    }
}
