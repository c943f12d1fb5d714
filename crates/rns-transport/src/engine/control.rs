//! Control destinations: path requests and tunnel synthesis.

use tracing::{debug, info, trace, warn};

use rns_core::RawPacket;

use super::Transport;
use crate::error::TransportError;
use crate::interface::InterfaceId;
use crate::path::PathEntry;
use crate::path::request::{ParseResult, parse_path_request_data};
use crate::router::RouterAction;
use crate::time::now_ms;
use crate::tunnel::{TunnelId, TunnelOutcome, build_synthesis, derive_tunnel_id, parse_synthesis};

impl Transport {
    pub(super) fn handle_path_request(
        &self,
        packet: &RawPacket,
        from: &InterfaceId,
        now: u64,
        actions: &mut Vec<RouterAction>,
    ) {
        let request = match parse_path_request_data(&packet.data) {
            ParseResult::Processed(request) => request,
            ParseResult::TooShort => {
                trace!("path request too short");
                return;
            }
            ParseResult::Tagless => {
                debug!("ignoring tagless path request");
                return;
            }
        };
        if !self.path_requests.lock().note_tag(request.unique_tag()) {
            trace!(dest = %request.destination, "duplicate path request");
            return;
        }

        let dest = request.destination;
        let has_identity = self
            .destinations
            .get(&dest)
            .is_some_and(|local| local.identity.is_some());
        if has_identity {
            let response = self
                .local_announce(&dest, None, true)
                .and_then(|p| Ok((p.packet_hash(), p.serialize()?)));
            match response {
                Ok((hash, raw)) => {
                    self.hashlist.lock().remember(hash);
                    debug!(%dest, "answering path request for local destination");
                    actions.push(RouterAction::Transmit { interface: *from, raw });
                }
                Err(e) => warn!(%dest, "cannot answer path request: {e}"),
            }
            return;
        }

        if let Some(path) = self.path_table.live(&dest, now) {
            debug!(%dest, hops = path.hops, "path request for known remote destination");
        } else {
            trace!(%dest, "path request for unknown destination");
        }
    }

    pub(super) fn handle_tunnel_synthesis(&self, packet: &RawPacket, from: &InterfaceId, now: u64) {
        let Some((public_key, remote_interface)) = parse_synthesis(&packet.data) else {
            debug!(%from, "invalid tunnel synthesis");
            return;
        };
        let id = derive_tunnel_id(&public_key, &remote_interface);
        let _ = self.apply_tunnel(id, from, now);
    }

    /// Announce a tunnel over `interface` so the peer can re-associate its
    /// paths with it after a reconnect.
    pub fn synthesize_tunnel(&self, interface: &InterfaceId) -> Result<TunnelId, TransportError> {
        let identity = self.identity().ok_or(TransportError::NoIdentity)?;
        let iface = self
            .interface(interface)
            .ok_or(TransportError::UnknownInterface(*interface))?;

        if !iface.is_online() || !iface.can_send() {
            return Err(TransportError::NotTransmitted);
        }

        let packet = build_synthesis(&identity, interface)?;
        let raw = packet.serialize()?;
        let id = derive_tunnel_id(&identity.public_key_bytes(), interface);
        let created = {
            let _guard = self.decision.lock();
            self.hashlist.lock().remember(packet.packet_hash());
            self.apply_tunnel(id, interface, now_ms())
        };
        if !self.transmit_on(&iface, &raw) {
            if created {
                let _guard = self.decision.lock();
                self.tunnels.remove(&id);
                debug!(tunnel = %id, %interface, "dropped unsent tunnel");
            }
            return Err(TransportError::NotTransmitted);
        }
        Ok(id)
    }

    /// Returns true when a new tunnel was installed.
    fn apply_tunnel(&self, id: TunnelId, interface: &InterfaceId, now: u64) -> bool {
        match self.tunnels.handle_tunnel(id, *interface, now) {
            Ok(TunnelOutcome::Created) => {
                info!(tunnel = %id, %interface, "tunnel established");
                return true;
            }
            Ok(TunnelOutcome::Reassociated { replay }) => {
                let mut restored = 0;
                for (dest, path) in replay {
                    let better = self
                        .path_table
                        .live(&dest, now)
                        .is_none_or(|current| {
                            path.hops < current.hops || !self.interface_usable(&current.receiving_interface)
                        });
                    if better {
                        self.path_table.insert(
                            dest,
                            PathEntry::new(
                                path.timestamp,
                                path.next_hop,
                                path.hops,
                                path.expires,
                                *interface,
                                path.announce_packet_hash,
                            ),
                        );
                        restored += 1;
                    }
                }
                info!(tunnel = %id, %interface, restored, "tunnel re-associated");
            }
            Ok(TunnelOutcome::Refreshed) => debug!(tunnel = %id, "tunnel refreshed"),
            Err(e) => warn!(tunnel = %id, "tunnel rejected: {e}"),
        }
        false
    }
}
