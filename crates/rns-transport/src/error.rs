//! Transport layer error types.
//!
//! Inbound packet processing never surfaces these to the caller; malformed
//! input is logged and dropped. They are returned from configuration,
//! persistence, registration and lifecycle calls.

use rns_core::{AnnounceError, DestinationHash, IdentityError, PacketError};

use crate::interface::InterfaceId;

#[derive(Debug, thiserror::Error)]
pub enum IfacError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("missing ifac flag")]
    MissingFlag,

    #[error("unexpected ifac flag")]
    UnexpectedFlag,

    #[error("packet too short for ifac: need {min} bytes, got {actual}")]
    PacketTooShort { min: usize, actual: usize },

    #[error("ifac size must be between 1 and 64 bytes, got {0}")]
    InvalidSize(usize),

    #[error("ifac needs a network name or a network key")]
    NoCredentials,

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("interface is offline")]
    Offline,

    #[error("interface cannot transmit")]
    NotWritable,

    #[error("frame of {size} bytes exceeds hardware MTU {mtu}")]
    FrameTooLarge { size: usize, mtu: usize },

    #[error("send failed: {0}")]
    Send(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid identity length: expected 64, got {0}")]
    InvalidIdentityLength(usize),

    #[error("identity has no private key to persist")]
    NoPrivateKey,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is already running")]
    AlreadyRunning,

    #[error("no async runtime available to run maintenance")]
    NoRuntime,

    #[error("transport has no identity; call start first")]
    NoIdentity,

    #[error("unknown interface: {0}")]
    UnknownInterface(InterfaceId),

    #[error("interface already registered: {0}")]
    DuplicateInterface(InterfaceId),

    #[error("unknown local destination: {0}")]
    UnknownDestination(DestinationHash),

    #[error("destination {0} has no identity to announce with")]
    DestinationWithoutIdentity(DestinationHash),

    #[error("tunnel capacity reached ({max} tunnels)")]
    TunnelCapacity { max: usize },

    #[error("no interface accepted the packet")]
    NotTransmitted,

    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("announce error: {0}")]
    Announce(#[from] AnnounceError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
}
