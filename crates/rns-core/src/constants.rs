//! Wire constants and header enumerations.

use crate::error::PacketError;

pub const MTU: usize = 500;
pub const HEADER_1_SIZE: usize = 19;
pub const HEADER_2_SIZE: usize = 35;
pub const HEADER_MINSIZE: usize = HEADER_1_SIZE;

pub const TRUNCATED_HASHLENGTH: usize = 16;
pub const KEYSIZE: usize = 64;
pub const SIGLENGTH: usize = 64;
pub const NAME_HASH_LENGTH: usize = 10;
pub const RANDOM_HASH_LENGTH: usize = 10;
pub const RATCHETSIZE: usize = 32;

/// Size of the link-request key material that participates in the link id.
pub const ECPUBSIZE: usize = 64;

/// `public_key + name_hash + random_hash + signature`.
pub const ANNOUNCE_MIN_PAYLOAD: usize = KEYSIZE + NAME_HASH_LENGTH + RANDOM_HASH_LENGTH + SIGLENGTH;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $err:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub fn from_u8(v: u8) -> Result<Self, PacketError> {
                match v {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(PacketError::$err(v)),
                }
            }
        }
    };
}

wire_enum!(HeaderType, InvalidHeaderType { Header1 = 0, Header2 = 1 });
wire_enum!(TransportType, InvalidTransportType { Broadcast = 0, Transport = 1 });
wire_enum!(DestinationType, InvalidDestinationType {
    Single = 0,
    Group = 1,
    Plain = 2,
    Link = 3,
});
wire_enum!(PacketType, InvalidPacketType {
    Data = 0,
    Announce = 1,
    LinkRequest = 2,
    Proof = 3,
});
