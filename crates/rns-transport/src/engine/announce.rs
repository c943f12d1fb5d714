//! Announce ingestion, retransmission scheduling and local announces.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use rns_core::announce::make_random_hash;
use rns_core::{Announce, ContextType, DestinationHash, RawPacket, TruncatedHash};

use super::Transport;
use crate::announce::{AnnounceEntry, EnqueueOutcome, QueuedAnnounce};
use crate::constants::{PATH_EXPIRY, PATHFINDER_M};
use crate::error::TransportError;
use crate::interface::InterfaceId;
use crate::path::{PathEntry, PathUpdate, decide_path_update};
use crate::router::{RouterAction, to_transport};
use crate::time::now_secs;
use crate::tunnel::TunnelPathEntry;

impl Transport {
    pub(super) fn handle_announce(
        &self,
        packet: RawPacket,
        from: &InterfaceId,
        now: u64,
        actions: &mut Vec<RouterAction>,
    ) {
        let announce = match Announce::from_packet(&packet) {
            Ok(a) => a,
            Err(e) => {
                debug!(dest = %packet.destination, "malformed announce: {e}");
                return;
            }
        };
        let identity = match announce.validate() {
            Ok(identity) => identity,
            Err(e) => {
                debug!(dest = %packet.destination, "invalid announce: {e}");
                return;
            }
        };
        let dest = announce.destination;
        if self.destinations.contains_key(&dest) {
            trace!(%dest, "ignoring announce for local destination");
            return;
        }

        let existing = self.path_table.get(&dest);
        let emitted = announce.emitted_at();
        match decide_path_update(existing.as_ref(), packet.hops, &announce.random_hash, emitted, now) {
            PathUpdate::Skip => {
                trace!(%dest, "replayed announce");
                return;
            }
            PathUpdate::TrackBlob => {
                self.path_table
                    .update(&dest, |entry| entry.add_blob(announce.random_hash));
                trace!(%dest, hops = packet.hops, "announce kept for replay detection only");
                return;
            }
            PathUpdate::Insert | PathUpdate::Replace => {}
        }

        let next_hop = packet
            .transport_id
            .unwrap_or_else(|| TruncatedHash::from(dest));
        let packet_hash = packet.packet_hash();
        let mut entry = PathEntry::new(now, next_hop, packet.hops, now + PATH_EXPIRY, *from, packet_hash);
        if let Some(previous) = existing {
            entry.random_blobs = previous.random_blobs;
        }
        entry.add_blob(announce.random_hash);
        self.tunnels.record_path(
            from,
            dest,
            TunnelPathEntry {
                timestamp: now,
                next_hop,
                hops: entry.hops,
                expires: entry.expires,
                announce_packet_hash: packet_hash,
            },
        );
        self.path_table.insert(dest, entry);
        debug!(%dest, hops = packet.hops, via = %next_hop, "path updated");

        let path_response = packet.context == ContextType::PathResponse;
        if let Ok(raw) = packet.serialize() {
            self.announces.record(
                dest,
                AnnounceEntry {
                    raw,
                    hops: packet.hops,
                    receiving_interface: *from,
                    received_at: now,
                    packet_hash,
                    path_response,
                },
                now,
            );
        }

        actions.push(RouterAction::NotifyAnnounce {
            destination: dest,
            identity: Arc::new(identity),
            app_data: announce.app_data.clone(),
        });

        if !path_response {
            self.queue_retransmission(&packet, emitted, from, now);
        }
    }

    /// Schedule a rebroadcast of an accepted announce on every other
    /// interface, subject to the per-destination rate limit.
    fn queue_retransmission(&self, packet: &RawPacket, emitted_at: u64, from: &InterfaceId, now: u64) {
        if !self.is_transport_enabled() || packet.hops >= PATHFINDER_M {
            return;
        }
        let Some(transport_id) = self.transport_id() else {
            return;
        };
        let dest = packet.destination;
        if !self.announce_rate.allow(&dest, now) {
            debug!(%dest, "announce rate limited");
            return;
        }
        let raw = match to_transport(packet, transport_id).serialize() {
            Ok(raw) => raw,
            Err(e) => {
                debug!(%dest, "cannot rebroadcast announce: {e}");
                return;
            }
        };

        for interface in self.interfaces() {
            let id = interface.id();
            if id == *from || !interface.is_online() || !interface.can_send() {
                continue;
            }
            let Some(mut queue) = self.announce_queues.get_mut(&id) else {
                continue;
            };
            let outcome = queue.enqueue(QueuedAnnounce {
                destination: dest,
                scheduled_time: now,
                hops: packet.hops,
                emitted_at,
                raw: raw.clone(),
            });
            if outcome == EnqueueOutcome::Full {
                warn!(name = interface.name(), %dest, "announce queue full, dropping");
            }
        }
    }

    /// Send at most one queued announce per interface whose pacing window
    /// is open. An announce that cannot be sent stays queued and does not
    /// consume the window.
    pub(crate) fn process_announce_queues(&self, now: u64) {
        let life = self.config.queued_announce_life_ms();
        for interface in self.interfaces() {
            let id = interface.id();
            let ready = interface.is_online() && interface.can_send();
            let next = {
                let Some(mut queue) = self.announce_queues.get_mut(&id) else {
                    continue;
                };
                queue.prune(now, life);
                if !ready {
                    continue;
                }
                queue.pop_next(now)
            };
            let Some(announce) = next else {
                continue;
            };

            trace!(name = interface.name(), dest = %announce.destination, "sending queued announce");
            let sent = self.transmit_on(&interface, &announce.raw);
            let Some(mut queue) = self.announce_queues.get_mut(&id) else {
                continue;
            };
            if sent {
                queue.mark_sent(now, announce.raw.len(), interface.bitrate(), self.config.announce_cap);
            } else {
                trace!(name = interface.name(), dest = %announce.destination, "announce not sent, requeued");
                queue.enqueue(announce);
            }
        }
    }

    /// Build a signed announce for a registered local destination.
    pub(super) fn local_announce(
        &self,
        dest: &DestinationHash,
        app_data: Option<&[u8]>,
        path_response: bool,
    ) -> Result<RawPacket, TransportError> {
        let local = self
            .destinations
            .get(dest)
            .ok_or(TransportError::UnknownDestination(*dest))?;
        let identity = local
            .identity
            .as_ref()
            .ok_or(TransportError::DestinationWithoutIdentity(*dest))?;
        let announce = Announce::create(identity, local.name_hash, make_random_hash(now_secs()), None, app_data)?;
        let context = if path_response {
            ContextType::PathResponse
        } else {
            ContextType::None
        };
        Ok(announce.to_packet(context))
    }

    /// Announce a local destination on every interface. Returns whether
    /// any interface accepted it.
    pub fn announce(
        &self,
        dest: &DestinationHash,
        app_data: Option<&[u8]>,
        path_response: bool,
    ) -> Result<bool, TransportError> {
        let packet = self.local_announce(dest, app_data, path_response)?;
        let raw = packet.serialize()?;
        self.hashlist.lock().remember(packet.packet_hash());
        let sent = self.broadcast(&raw, None);
        debug!(%dest, sent, "announced local destination");
        Ok(sent > 0)
    }
}
