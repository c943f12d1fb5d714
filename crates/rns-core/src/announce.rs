//! Announces.
//!
//! Payload layout:
//!
//! ```text
//! public_key(64) name_hash(10) random_hash(10) [ratchet(32)] signature(64) [app_data]
//! ```
//!
//! The ratchet is present when the packet's context flag is set. The
//! signature covers
//! `destination || public_key || name_hash || random_hash || [ratchet] || [app_data]`.
//! `random_hash` is five random bytes followed by the low five bytes of the
//! big-endian emission time in unix seconds.

use rand::RngCore;

use rns_crypto::sha::truncated_hash;

use crate::constants::{
    ANNOUNCE_MIN_PAYLOAD, DestinationType, KEYSIZE, NAME_HASH_LENGTH, PacketType,
    RANDOM_HASH_LENGTH, RATCHETSIZE, SIGLENGTH,
};
use crate::destination::destination_hash;
use crate::error::AnnounceError;
use crate::identity::Identity;
use crate::packet::{ContextType, RawPacket};
use crate::types::{DestinationHash, IdentityHash, NameHash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announce {
    pub destination: DestinationHash,
    pub public_key: [u8; 64],
    pub name_hash: NameHash,
    pub random_hash: [u8; 10],
    pub ratchet: Option<[u8; 32]>,
    pub signature: [u8; 64],
    pub app_data: Option<Vec<u8>>,
}

/// Five random bytes, then the emission time.
pub fn make_random_hash(now_secs: u64) -> [u8; 10] {
    let mut out = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut out[..5]);
    out[5..].copy_from_slice(&now_secs.to_be_bytes()[3..]);
    out
}

impl Announce {
    /// Build and sign an announce for `identity`'s destination named by `name_hash`.
    pub fn create(
        identity: &Identity,
        name_hash: NameHash,
        random_hash: [u8; 10],
        ratchet: Option<[u8; 32]>,
        app_data: Option<&[u8]>,
    ) -> Result<Self, AnnounceError> {
        let mut announce = Self {
            destination: destination_hash(&name_hash, &identity.hash()),
            public_key: identity.public_key_bytes(),
            name_hash,
            random_hash,
            ratchet,
            signature: [0u8; 64],
            app_data: app_data.map(<[u8]>::to_vec),
        };
        announce.signature = identity.sign(&announce.signed_data())?;
        Ok(announce)
    }

    pub fn from_packet(packet: &RawPacket) -> Result<Self, AnnounceError> {
        if packet.flags.packet_type != PacketType::Announce {
            return Err(AnnounceError::NotAnAnnounce);
        }
        let has_ratchet = packet.flags.context_flag;
        let min = ANNOUNCE_MIN_PAYLOAD + if has_ratchet { RATCHETSIZE } else { 0 };
        let payload = packet.data.as_slice();
        if payload.len() < min {
            return Err(AnnounceError::PayloadTooShort {
                min,
                actual: payload.len(),
            });
        }

        let (public_key, rest) = payload.split_at(KEYSIZE);
        let (name_hash, rest) = rest.split_at(NAME_HASH_LENGTH);
        let (random_hash, rest) = rest.split_at(RANDOM_HASH_LENGTH);
        let (ratchet, rest) = if has_ratchet {
            let (r, rest) = rest.split_at(RATCHETSIZE);
            (Some(copy_array::<32>(r)), rest)
        } else {
            (None, rest)
        };
        let (signature, app_data) = rest.split_at(SIGLENGTH);

        Ok(Self {
            destination: packet.destination,
            public_key: copy_array::<64>(public_key),
            name_hash: NameHash::new(copy_array::<10>(name_hash)),
            random_hash: copy_array::<10>(random_hash),
            ratchet,
            signature: copy_array::<64>(signature),
            app_data: (!app_data.is_empty()).then(|| app_data.to_vec()),
        })
    }

    pub fn signed_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            16 + KEYSIZE + NAME_HASH_LENGTH + RANDOM_HASH_LENGTH + RATCHETSIZE,
        );
        data.extend_from_slice(self.destination.as_ref());
        data.extend_from_slice(&self.public_key);
        data.extend_from_slice(self.name_hash.as_ref());
        data.extend_from_slice(&self.random_hash);
        if let Some(ratchet) = &self.ratchet {
            data.extend_from_slice(ratchet);
        }
        if let Some(app_data) = &self.app_data {
            data.extend_from_slice(app_data);
        }
        data
    }

    pub fn identity_hash(&self) -> IdentityHash {
        IdentityHash::new(truncated_hash(&self.public_key))
    }

    /// Check the destination binding and the signature, returning the
    /// announced public identity.
    pub fn validate(&self) -> Result<Identity, AnnounceError> {
        if destination_hash(&self.name_hash, &self.identity_hash()) != self.destination {
            return Err(AnnounceError::InvalidDestinationHash);
        }
        let identity = Identity::from_public_bytes(&self.public_key)?;
        identity
            .verify(&self.signed_data(), &self.signature)
            .map_err(|_| AnnounceError::InvalidSignature)?;
        Ok(identity)
    }

    /// Emission time in unix seconds, taken from the random hash.
    pub fn emitted_at(&self) -> u64 {
        let mut be = [0u8; 8];
        be[3..].copy_from_slice(&self.random_hash[5..]);
        u64::from_be_bytes(be)
    }

    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(ANNOUNCE_MIN_PAYLOAD + RATCHETSIZE);
        payload.extend_from_slice(&self.public_key);
        payload.extend_from_slice(self.name_hash.as_ref());
        payload.extend_from_slice(&self.random_hash);
        if let Some(ratchet) = &self.ratchet {
            payload.extend_from_slice(ratchet);
        }
        payload.extend_from_slice(&self.signature);
        if let Some(app_data) = &self.app_data {
            payload.extend_from_slice(app_data);
        }
        payload
    }

    pub fn to_packet(&self, context: ContextType) -> RawPacket {
        let mut packet = RawPacket::new(
            PacketType::Announce,
            DestinationType::Single,
            self.destination,
            context,
            self.to_payload(),
        );
        packet.flags.context_flag = self.ratchet.is_some();
        packet
    }
}

fn copy_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::name_hash;

    fn signed(app_data: Option<&[u8]>, ratchet: Option<[u8; 32]>) -> (Identity, Announce) {
        let identity = Identity::generate();
        let announce = Announce::create(
            &identity,
            name_hash("test", &["announce"]),
            make_random_hash(1_700_000_000),
            ratchet,
            app_data,
        )
        .unwrap();
        (identity, announce)
    }

    #[test]
    fn create_parse_validate() {
        let (identity, announce) = signed(Some(b"hello"), None);
        let packet = announce.to_packet(ContextType::None);
        let parsed = Announce::from_packet(&packet).unwrap();
        assert_eq!(parsed, announce);
        let announced = parsed.validate().unwrap();
        assert_eq!(announced.hash(), identity.hash());
        assert_eq!(parsed.app_data.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn ratchet_sets_context_flag() {
        let (_, announce) = signed(None, Some([9; 32]));
        let packet = announce.to_packet(ContextType::None);
        assert!(packet.flags.context_flag);
        assert_eq!(packet.data.len(), ANNOUNCE_MIN_PAYLOAD + RATCHETSIZE);
        let parsed = Announce::from_packet(&packet).unwrap();
        assert_eq!(parsed.ratchet, Some([9; 32]));
        parsed.validate().unwrap();
    }

    #[test]
    fn wrong_destination_rejected() {
        let (_, mut announce) = signed(None, None);
        announce.destination = DestinationHash::new([0; 16]);
        assert!(matches!(
            announce.validate(),
            Err(AnnounceError::InvalidDestinationHash)
        ));
    }

    #[test]
    fn altered_app_data_breaks_signature() {
        let (_, mut announce) = signed(Some(b"v1"), None);
        announce.app_data = Some(b"v2".to_vec());
        assert!(matches!(
            announce.validate(),
            Err(AnnounceError::InvalidSignature)
        ));
    }

    #[test]
    fn short_payload_rejected() {
        let (_, announce) = signed(None, None);
        let mut packet = announce.to_packet(ContextType::None);
        packet.data.truncate(100);
        assert!(matches!(
            Announce::from_packet(&packet),
            Err(AnnounceError::PayloadTooShort { min: 148, actual: 100 })
        ));
    }

    #[test]
    fn emission_time_is_recoverable() {
        let (_, announce) = signed(None, None);
        assert_eq!(announce.emitted_at(), 1_700_000_000);
    }
}
