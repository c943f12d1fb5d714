//! Wire-level value types for the rns transport stack.
//!
//! Hash newtypes, protocol constants, the packet header codec, identities,
//! destination addressing and announces. Everything here is a plain value;
//! routing decisions live in `rns-transport`.

pub mod announce;
pub mod constants;
pub mod destination;
pub mod error;
pub mod identity;
pub mod packet;
pub mod types;

pub use announce::Announce;
pub use constants::{DestinationType, HeaderType, PacketType, TransportType};
pub use error::{AnnounceError, IdentityError, PacketError};
pub use identity::Identity;
pub use packet::{ContextType, PacketFlags, RawPacket};
pub use types::{
    DestinationHash, IdentityHash, InvalidLength, LinkId, NameHash, PacketHash, TruncatedHash,
};
