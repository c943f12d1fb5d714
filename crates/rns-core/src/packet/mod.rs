//! Packet header codec.

pub mod context;
pub mod flags;
pub mod wire;

pub use context::ContextType;
pub use flags::PacketFlags;
pub use wire::RawPacket;
