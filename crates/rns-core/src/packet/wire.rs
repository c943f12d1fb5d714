//! Wire form of a packet.
//!
//! ```text
//! HEADER_1: flags(1) hops(1) destination(16) context(1) data
//! HEADER_2: flags(1) hops(1) transport_id(16) destination(16) context(1) data
//! ```

use rns_crypto::sha::{sha256, truncated_hash};

use crate::constants::{
    DestinationType, ECPUBSIZE, HEADER_1_SIZE, HEADER_2_SIZE, HeaderType, PacketType,
    TransportType,
};
use crate::error::PacketError;
use crate::packet::context::ContextType;
use crate::packet::flags::PacketFlags;
use crate::types::{DestinationHash, LinkId, PacketHash, TruncatedHash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub flags: PacketFlags,
    pub hops: u8,
    pub transport_id: Option<TruncatedHash>,
    pub destination: DestinationHash,
    pub context: ContextType,
    pub data: Vec<u8>,
}

fn hash16(bytes: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes[..16]);
    out
}

impl RawPacket {
    /// A HEADER_1 broadcast packet with zero hops.
    pub fn new(
        packet_type: PacketType,
        destination_type: DestinationType,
        destination: DestinationHash,
        context: ContextType,
        data: Vec<u8>,
    ) -> Self {
        Self {
            flags: PacketFlags::header1(packet_type, destination_type),
            hops: 0,
            transport_id: None,
            destination,
            context,
            data,
        }
    }

    pub fn parse(raw: &[u8]) -> Result<Self, PacketError> {
        if raw.len() < HEADER_1_SIZE {
            return Err(PacketError::TooShort {
                min: HEADER_1_SIZE,
                actual: raw.len(),
            });
        }
        let flags = PacketFlags::from_byte(raw[0])?;
        let hops = raw[1];

        let (transport_id, rest) = match flags.header_type {
            HeaderType::Header1 => (None, &raw[2..]),
            HeaderType::Header2 => {
                if raw.len() < HEADER_2_SIZE {
                    return Err(PacketError::TooShort {
                        min: HEADER_2_SIZE,
                        actual: raw.len(),
                    });
                }
                (Some(TruncatedHash::new(hash16(&raw[2..18]))), &raw[18..])
            }
        };

        Ok(Self {
            flags,
            hops,
            transport_id,
            destination: DestinationHash::new(hash16(&rest[..16])),
            context: ContextType::from_byte(rest[16]),
            data: rest[17..].to_vec(),
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        let mut out = Vec::with_capacity(HEADER_2_SIZE + self.data.len());
        out.push(self.flags.to_byte());
        out.push(self.hops);
        match (self.flags.header_type, self.transport_id) {
            (HeaderType::Header2, Some(tid)) => out.extend_from_slice(tid.as_ref()),
            (HeaderType::Header2, None) => return Err(PacketError::MissingTransportId),
            (HeaderType::Header1, _) => {}
        }
        out.extend_from_slice(self.destination.as_ref());
        out.push(self.context.to_byte());
        out.extend_from_slice(&self.data);
        Ok(out)
    }

    /// `(flags & 0x0F) || destination || context || data`.
    ///
    /// Hops and the transport id are left out so the hash is stable across
    /// relays.
    pub fn hashable_part(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(18 + self.data.len());
        out.push(self.flags.to_byte() & 0x0F);
        out.extend_from_slice(self.destination.as_ref());
        out.push(self.context.to_byte());
        out.extend_from_slice(&self.data);
        out
    }

    pub fn packet_hash(&self) -> PacketHash {
        PacketHash::new(sha256(&self.hashable_part()))
    }

    /// Link id of a link request: the truncated hash of the hashable part,
    /// with any signalling bytes past the key material dropped.
    pub fn link_id(&self) -> LinkId {
        let mut hashable = self.hashable_part();
        if self.data.len() > ECPUBSIZE {
            let excess = self.data.len() - ECPUBSIZE;
            hashable.truncate(hashable.len() - excess);
        }
        LinkId::new(truncated_hash(&hashable))
    }

    pub fn is_announce(&self) -> bool {
        self.flags.packet_type == PacketType::Announce
    }

    /// Whether this packet is addressed to a relay, i.e. carries a transport id.
    pub fn in_transport(&self) -> bool {
        self.flags.transport_type == TransportType::Transport && self.transport_id.is_some()
    }
}
