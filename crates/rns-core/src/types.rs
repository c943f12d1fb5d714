//! Newtype wrappers for hash-valued protocol fields.
//!
//! Every routing table is keyed by one of these, so equality and hashing are
//! by content. Keeping them distinct types stops a packet hash from being
//! used where a destination hash is expected.

use std::fmt;
use std::str::FromStr;

/// A byte slice or hex string had the wrong length for the target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid length: expected {expected} bytes, got {actual}")]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = InvalidLength;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                bytes.try_into().map(Self).map_err(|_| InvalidLength {
                    expected: $len,
                    actual: bytes.len(),
                })
            }
        }

        impl FromStr for $name {
            type Err = InvalidLength;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s.trim()).map_err(|_| InvalidLength {
                    expected: $len,
                    actual: s.len() / 2,
                })?;
                Self::try_from(bytes.as_slice())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({}..)"), hex::encode(&self.0[..4]))
            }
        }
    };
}

hash_newtype!(
    /// First 16 bytes of a SHA-256 digest. Used for next hops and transport ids.
    TruncatedHash,
    16
);
hash_newtype!(
    /// Address of a destination.
    DestinationHash,
    16
);
hash_newtype!(
    /// `sha256(x25519_pub || ed25519_pub)[..16]`.
    IdentityHash,
    16
);
hash_newtype!(
    /// Identifier of a link, derived from its link-request packet.
    LinkId,
    16
);
hash_newtype!(
    /// Full SHA-256 of a packet's hashable part.
    PacketHash,
    32
);
hash_newtype!(
    /// First 10 bytes of `sha256("app.aspect...")`.
    NameHash,
    10
);

macro_rules! truncated_conversions {
    ($($name:ident),*) => {
        $(
            impl From<$name> for TruncatedHash {
                fn from(value: $name) -> Self {
                    TruncatedHash(value.0)
                }
            }

            impl From<TruncatedHash> for $name {
                fn from(value: TruncatedHash) -> Self {
                    $name(value.0)
                }
            }
        )*
    };
}

truncated_conversions!(DestinationHash, IdentityHash, LinkId);

impl PacketHash {
    /// The 16-byte form used to key reverse entries and receipts.
    pub fn truncated(&self) -> TruncatedHash {
        let mut out = [0u8; 16];
        out.copy_from_slice(&self.0[..16]);
        TruncatedHash(out)
    }
}

impl IdentityHash {
    /// Transport ids on the wire are identity hashes; a destination hash
    /// field may carry one.
    pub fn as_destination(&self) -> DestinationHash {
        DestinationHash(self.0)
    }
}
