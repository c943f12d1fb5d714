//! Inbound frame processing.

use std::sync::Arc;

use tracing::{debug, trace};

use rns_core::constants::HEADER_MINSIZE;
use rns_core::{ContextType, DestinationType, PacketType, RawPacket, TruncatedHash};

use super::{Transport, link_key};
use crate::constants::LINK_PROOF_TIMEOUT_PER_HOP;
use crate::ifac;
use crate::interface::InterfaceId;
use crate::path::request::path_request_destination;
use crate::router::{LinkEntry, ReverseEntry, RouterAction, relay_rewrite};
use crate::time::now_ms;
use crate::tunnel::tunnel_synthesis_destination;

impl Transport {
    /// Process one frame received on interface `from`.
    ///
    /// Malformed, unauthenticated and duplicate frames are dropped. Every
    /// resulting send and callback runs after the routing decision is made.
    pub fn inbound(&self, raw: &[u8], from: &InterfaceId) {
        if raw.len() < HEADER_MINSIZE {
            trace!(len = raw.len(), "dropping runt frame");
            return;
        }
        let Some(interface) = self.interface(from) else {
            debug!(%from, "frame from unregistered interface");
            return;
        };
        if !interface.can_receive() {
            return;
        }
        let now = now_ms();
        self.traffic.record_rx(from, raw.len());
        self.tunnels.record_rx(from, raw.len(), now);

        let unmasked;
        let frame = match interface.ifac() {
            Some(creds) => match ifac::unmask(creds, raw) {
                Ok(bytes) => {
                    unmasked = bytes;
                    unmasked.as_slice()
                }
                Err(e) => {
                    trace!(name = interface.name(), "ifac check failed: {e}");
                    return;
                }
            },
            None if ifac::has_ifac_flag(raw) => {
                trace!(name = interface.name(), "ifac flag on open interface");
                return;
            }
            None => raw,
        };

        let mut packet = match RawPacket::parse(frame) {
            Ok(p) => p,
            Err(e) => {
                debug!(name = interface.name(), "unparseable frame: {e}");
                return;
            }
        };
        packet.hops = packet.hops.saturating_add(1);

        let actions = {
            let _guard = self.decision.lock();
            self.dispatch(packet, from, now)
        };
        self.run_actions(actions);
    }

    fn dispatch(&self, packet: RawPacket, from: &InterfaceId, now: u64) -> Vec<RouterAction> {
        let mut actions = Vec::new();

        let link_traffic = {
            let key = link_key(&packet.destination);
            self.link_table.contains(&key) || self.links.contains_key(&key)
        };
        let hash = packet.packet_hash();
        if !link_traffic {
            let mut hashlist = self.hashlist.lock();
            if !hashlist.should_process(&hash) {
                trace!(%hash, "duplicate packet");
                return actions;
            }
            if packet.context != ContextType::Lrproof {
                hashlist.remember(hash);
            }
        }

        match packet.flags.packet_type {
            PacketType::Data => self.handle_data(packet, from, now, &mut actions),
            PacketType::LinkRequest => self.handle_link_request(packet, from, now, &mut actions),
            PacketType::Proof => self.handle_proof(packet, from, now, &mut actions),
            PacketType::Announce => self.handle_announce(packet, from, now, &mut actions),
        }
        actions
    }

    fn handle_data(&self, packet: RawPacket, from: &InterfaceId, now: u64, actions: &mut Vec<RouterAction>) {
        if packet.destination == path_request_destination() {
            self.handle_path_request(&packet, from, now, actions);
            return;
        }
        if packet.destination == tunnel_synthesis_destination() {
            self.handle_tunnel_synthesis(&packet, from, now);
            return;
        }

        if let Some(local) = self.destinations.get(&packet.destination) {
            let callback = Arc::clone(&local.callback);
            let payload = match (packet.flags.destination_type, &local.identity) {
                (DestinationType::Single, Some(identity)) => match identity.decrypt(&packet.data) {
                    Ok(plain) => plain,
                    Err(e) => {
                        debug!(dest = %packet.destination, "undecryptable packet: {e}");
                        return;
                    }
                },
                (DestinationType::Single, None) => {
                    debug!(dest = %packet.destination, "single destination has no identity");
                    return;
                }
                _ => packet.data.clone(),
            };
            actions.push(RouterAction::Deliver {
                callback,
                payload,
                packet,
            });
            return;
        }

        let key = link_key(&packet.destination);
        if let Some(sink) = self.links.get(&key) {
            actions.push(RouterAction::ToLink {
                sink: Arc::clone(sink.value()),
                packet,
            });
            return;
        }

        if self.relay_addressed(&packet, from, now, actions) {
            return;
        }
        self.forward_on_link(&packet, from, now, actions);
    }

    /// Relay a packet whose transport id names this node along the path to
    /// its destination, leaving a reverse entry for its proof.
    fn relay_addressed(
        &self,
        packet: &RawPacket,
        from: &InterfaceId,
        now: u64,
        actions: &mut Vec<RouterAction>,
    ) -> bool {
        if !self.addressed_to_us(packet) {
            return false;
        }
        let Some(path) = self.path_table.live(&packet.destination, now) else {
            debug!(dest = %packet.destination, "no path for relayed packet");
            return false;
        };
        let outgoing = relay_rewrite(packet, path.hops, path.next_hop);
        let Ok(raw) = outgoing.serialize() else {
            return false;
        };
        self.reverse_table.insert(
            packet.packet_hash().truncated(),
            ReverseEntry {
                receiving_interface: *from,
                outbound_interface: path.receiving_interface,
                timestamp: now,
            },
        );
        trace!(dest = %packet.destination, hops = path.hops, "relaying packet");
        actions.push(RouterAction::Transmit {
            interface: path.receiving_interface,
            raw,
        });
        true
    }

    fn addressed_to_us(&self, packet: &RawPacket) -> bool {
        self.is_transport_enabled()
            && packet.in_transport()
            && packet.transport_id.is_some()
            && packet.transport_id == self.transport_id()
    }

    /// Forward traffic of a link relayed through this node. The hop count
    /// tells which side of the link the packet came from.
    fn forward_on_link(
        &self,
        packet: &RawPacket,
        from: &InterfaceId,
        now: u64,
        actions: &mut Vec<RouterAction>,
    ) -> bool {
        if !self.is_transport_enabled() {
            return false;
        }
        let key = link_key(&packet.destination);
        let Some(entry) = self.link_table.get(&key) else {
            return false;
        };

        let outbound = if entry.next_hop_interface == entry.receiving_interface {
            (packet.hops == entry.remaining_hops || packet.hops == entry.taken_hops)
                .then_some(entry.next_hop_interface)
        } else if *from == entry.next_hop_interface {
            (packet.hops == entry.remaining_hops).then_some(entry.receiving_interface)
        } else if *from == entry.receiving_interface {
            (packet.hops == entry.taken_hops).then_some(entry.next_hop_interface)
        } else {
            None
        };

        let Some(outbound) = outbound else {
            trace!(link = %key, hops = packet.hops, "link packet failed hop check");
            return false;
        };
        let Ok(raw) = packet.serialize() else {
            return false;
        };
        self.link_table.touch(&key, now);
        actions.push(RouterAction::Transmit {
            interface: outbound,
            raw,
        });
        true
    }

    fn handle_link_request(
        &self,
        packet: RawPacket,
        from: &InterfaceId,
        now: u64,
        actions: &mut Vec<RouterAction>,
    ) {
        if let Some(local) = self.destinations.get(&packet.destination) {
            actions.push(RouterAction::LinkRequest {
                callback: Arc::clone(&local.callback),
                packet,
            });
            return;
        }
        if !self.addressed_to_us(&packet) {
            return;
        }
        let Some(path) = self.path_table.live(&packet.destination, now) else {
            debug!(dest = %packet.destination, "no path for link request");
            return;
        };
        let outgoing = relay_rewrite(&packet, path.hops, path.next_hop);
        let Ok(raw) = outgoing.serialize() else {
            return;
        };
        let link_id = packet.link_id();
        self.link_table.insert(
            link_id,
            LinkEntry {
                timestamp: now,
                next_hop: path.next_hop,
                next_hop_interface: path.receiving_interface,
                receiving_interface: *from,
                remaining_hops: path.hops,
                taken_hops: packet.hops,
                destination: packet.destination,
                validated: false,
                proof_timeout: now + LINK_PROOF_TIMEOUT_PER_HOP * u64::from(path.hops.max(1)),
            },
        );
        debug!(link = %link_id, dest = %packet.destination, "forwarding link request");
        actions.push(RouterAction::Transmit {
            interface: path.receiving_interface,
            raw,
        });
    }

    fn handle_proof(&self, packet: RawPacket, from: &InterfaceId, now: u64, actions: &mut Vec<RouterAction>) {
        let key = link_key(&packet.destination);

        if packet.context == ContextType::Lrproof {
            if let Some(entry) = self.link_table.get(&key)
                && *from == entry.next_hop_interface
            {
                if packet.hops != entry.remaining_hops {
                    trace!(link = %key, "link proof failed hop check");
                    return;
                }
                let Ok(raw) = packet.serialize() else {
                    return;
                };
                self.link_table.mark_validated(&key, now);
                debug!(link = %key, "link validated");
                actions.push(RouterAction::Transmit {
                    interface: entry.receiving_interface,
                    raw,
                });
                return;
            }
            if let Some(sink) = self.links.get(&key) {
                actions.push(RouterAction::ToLink {
                    sink: Arc::clone(sink.value()),
                    packet,
                });
            }
            return;
        }

        let proved = TruncatedHash::from(packet.destination);
        if self.is_transport_enabled()
            && let Some(reverse) = self.reverse_table.take(&proved)
        {
            if *from == reverse.outbound_interface
                && let Ok(raw) = packet.serialize()
            {
                actions.push(RouterAction::Transmit {
                    interface: reverse.receiving_interface,
                    raw,
                });
            }
            return;
        }

        if let Some(receipt) = self.receipts.get(&proved) {
            actions.push(RouterAction::Proof {
                hash: receipt.hash,
                destination: receipt.destination,
                callback: receipt.callback,
                packet,
            });
            return;
        }

        if let Some(sink) = self.links.get(&key) {
            actions.push(RouterAction::ToLink {
                sink: Arc::clone(sink.value()),
                packet,
            });
            return;
        }

        self.forward_on_link(&packet, from, now, actions);
    }
}
