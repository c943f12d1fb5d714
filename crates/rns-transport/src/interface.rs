//! The capability contract between the engine and link drivers.
//!
//! Drivers own their sockets, devices and retry logic. The engine only asks
//! an interface whether it is usable and hands it finished frames.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rns_core::InvalidLength;
use rns_core::constants::MTU;
use rns_crypto::sha::sha256;

use crate::error::InterfaceError;
use crate::ifac::IfacCredentials;

/// Stable identity of an interface: `sha256(name)`.
///
/// Drivers recreate their interface objects on reconnect; anything keyed by
/// interface survives that because the id is derived from the name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId([u8; 32]);

impl InterfaceId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_name(name: &str) -> Self {
        Self(sha256(name.as_bytes()))
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for InterfaceId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for InterfaceId {
    type Err = InvalidLength;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| InvalidLength {
            expected: 32,
            actual: s.len() / 2,
        })?;
        let actual = bytes.len();
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| InvalidLength {
                expected: 32,
                actual,
            })
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({}..)", hex::encode(&self.0[..4]))
    }
}

/// Implemented by every physical or virtual link.
///
/// `send` must not block on the network: queue the frame and return. Its
/// result only says whether the driver accepted the frame.
pub trait Interface: Send + Sync {
    fn name(&self) -> &str;

    fn id(&self) -> InterfaceId {
        InterfaceId::from_name(self.name())
    }

    fn is_online(&self) -> bool;

    fn can_send(&self) -> bool {
        true
    }

    fn can_receive(&self) -> bool {
        true
    }

    /// Link bitrate in bits per second, used to pace announces. Zero means
    /// unknown and disables pacing.
    fn bitrate(&self) -> u64;

    fn hw_mtu(&self) -> usize {
        MTU
    }

    /// Access-code key material, when this interface is authenticated.
    fn ifac(&self) -> Option<&IfacCredentials> {
        None
    }

    fn send(&self, frame: &[u8]) -> Result<(), InterfaceError>;
}

pub type InterfaceRef = Arc<dyn Interface>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_derived_from_name() {
        assert_eq!(
            InterfaceId::from_name("TCPInterface[peer]"),
            InterfaceId::from_name("TCPInterface[peer]")
        );
        assert_ne!(InterfaceId::from_name("a"), InterfaceId::from_name("b"));
    }

    #[test]
    fn hex_round_trip() {
        let id = InterfaceId::from_name("UDPInterface[0.0.0.0:4242]");
        let parsed: InterfaceId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("abcd".parse::<InterfaceId>().is_err());
    }
}
