//! Header rewrites for relayed packets.
//!
//! The lower nibble of the flags byte (destination and packet type) and the
//! payload are never touched, so the packet hash survives every rewrite.

use rns_core::{HeaderType, RawPacket, TransportType, TruncatedHash};

/// HEADER_2 form addressed to the relay `next_hop`.
#[must_use]
pub fn to_transport(packet: &RawPacket, next_hop: TruncatedHash) -> RawPacket {
    let mut out = packet.clone();
    out.flags.header_type = HeaderType::Header2;
    out.flags.transport_type = TransportType::Transport;
    out.transport_id = Some(next_hop);
    out
}

/// HEADER_1 broadcast form.
#[must_use]
pub fn to_broadcast(packet: &RawPacket) -> RawPacket {
    let mut out = packet.clone();
    out.flags.header_type = HeaderType::Header1;
    out.flags.transport_type = TransportType::Broadcast;
    out.transport_id = None;
    out
}

/// Rewrite a packet addressed to us for the next leg of its path.
///
/// More than one hop left: readdress to the path's next relay. Exactly one:
/// the next node is the destination, so send it as a plain broadcast. None:
/// only the hop count (already in `packet`) changes.
#[must_use]
pub fn relay_rewrite(packet: &RawPacket, remaining_hops: u8, next_hop: TruncatedHash) -> RawPacket {
    match remaining_hops {
        0 => packet.clone(),
        1 => to_broadcast(packet),
        _ => to_transport(packet, next_hop),
    }
}
