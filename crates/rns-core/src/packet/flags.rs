//! The packed flags byte.
//!
//! ```text
//! bit 7    reserved (IFAC)
//! bit 6    header type
//! bit 5    context flag
//! bit 4    transport type
//! bits 3-2 destination type
//! bits 1-0 packet type
//! ```

use crate::constants::{DestinationType, HeaderType, PacketType, TransportType};
use crate::error::PacketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFlags {
    pub header_type: HeaderType,
    pub context_flag: bool,
    pub transport_type: TransportType,
    pub destination_type: DestinationType,
    pub packet_type: PacketType,
}

impl PacketFlags {
    /// Broadcast HEADER_1 flags without context flag.
    pub fn header1(packet_type: PacketType, destination_type: DestinationType) -> Self {
        Self {
            header_type: HeaderType::Header1,
            context_flag: false,
            transport_type: TransportType::Broadcast,
            destination_type,
            packet_type,
        }
    }

    /// Bit 7 is ignored; IFAC handling owns it.
    pub fn from_byte(byte: u8) -> Result<Self, PacketError> {
        Ok(Self {
            header_type: HeaderType::from_u8((byte >> 6) & 0x01)?,
            context_flag: (byte >> 5) & 0x01 == 1,
            transport_type: TransportType::from_u8((byte >> 4) & 0x01)?,
            destination_type: DestinationType::from_u8((byte >> 2) & 0x03)?,
            packet_type: PacketType::from_u8(byte & 0x03)?,
        })
    }

    pub fn to_byte(&self) -> u8 {
        ((self.header_type as u8) << 6)
            | ((self.context_flag as u8) << 5)
            | ((self.transport_type as u8) << 4)
            | ((self.destination_type as u8) << 2)
            | (self.packet_type as u8)
    }
}
