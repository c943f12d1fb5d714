//! Outbound path-vs-broadcast selection and path requests.

use rand::RngCore;
use tracing::{debug, trace};

use rns_core::{DestinationHash, DestinationType, PacketType, RawPacket};

use super::Transport;
use crate::interface::InterfaceId;
use crate::path::request::build_path_request;
use crate::router::to_transport;
use crate::time::now_ms;

enum SendPlan {
    Direct { interface: InterfaceId, raw: Vec<u8> },
    Broadcast { raw: Vec<u8> },
}

impl Transport {
    /// Send a packet originated on this node. Returns true if at least one
    /// interface accepted it.
    pub fn outbound(&self, packet: &RawPacket) -> bool {
        let plan = {
            let _guard = self.decision.lock();
            self.plan_send(packet, now_ms())
        };
        match plan {
            Some(SendPlan::Direct { interface, raw }) => self.transmit(&interface, &raw),
            Some(SendPlan::Broadcast { raw }) => self.broadcast(&raw, None) > 0,
            None => false,
        }
    }

    fn plan_send(&self, packet: &RawPacket, now: u64) -> Option<SendPlan> {
        let routable = !packet.is_announce()
            && !matches!(
                packet.flags.destination_type,
                DestinationType::Plain | DestinationType::Group
            );

        if routable
            && let Some(path) = self.path_table.live(&packet.destination, now)
            && self.interface_usable(&path.receiving_interface)
        {
            let rewritten = match packet.flags.packet_type {
                // Multi-hop DATA goes out as a broadcast.
                PacketType::Data if path.hops == 1 => Some(packet.clone()),
                PacketType::Data => None,
                _ if path.hops <= 1 => Some(packet.clone()),
                _ => Some(to_transport(packet, path.next_hop)),
            };
            if let Some(outgoing) = rewritten {
                let raw = match outgoing.serialize() {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!(dest = %packet.destination, "cannot serialize outbound packet: {e}");
                        return None;
                    }
                };
                trace!(dest = %packet.destination, hops = path.hops, "sending along path");
                return Some(SendPlan::Direct {
                    interface: path.receiving_interface,
                    raw,
                });
            }
        }

        let raw = match packet.serialize() {
            Ok(raw) => raw,
            Err(e) => {
                debug!(dest = %packet.destination, "cannot serialize outbound packet: {e}");
                return None;
            }
        };
        self.hashlist.lock().remember(packet.packet_hash());
        trace!(dest = %packet.destination, "broadcasting");
        Some(SendPlan::Broadcast { raw })
    }

    /// Ask the network for a path to `dest`. Requests for the same
    /// destination are spaced at least the minimum interval apart; returns
    /// false if this one was suppressed or could not be sent.
    pub fn request_path(&self, dest: &DestinationHash) -> bool {
        if !self.path_requests.lock().try_request(dest, now_ms()) {
            trace!(%dest, "path request suppressed");
            return false;
        }
        let mut tag = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut tag);
        let transport_id = if self.is_transport_enabled() {
            self.transport_id()
        } else {
            None
        };
        let request = build_path_request(dest, transport_id.as_ref(), &tag);
        debug!(%dest, "requesting path");
        self.outbound(&request)
    }
}
