//! Interface Access Codes.
//!
//! An authenticated interface shares a network name and/or passphrase. Both
//! sides derive the same signing identity and key from them. Every outgoing
//! frame is signed, the tail of the signature becomes an access code inserted
//! after the two header bytes, and the rest of the frame is XORed with a
//! keystream seeded by that code. Frames without a valid code are dropped.

use rns_core::Identity;
use rns_crypto::hkdf::hkdf;
use rns_crypto::sha::sha256;

use crate::error::IfacError;

/// Fixed salt for the credential derivation.
pub const IFAC_SALT: [u8; 32] = [
    0xad, 0xf5, 0x4d, 0x88, 0x2c, 0x9a, 0x9b, 0x80, 0x77, 0x1e, 0xb4, 0x99, 0x5d, 0x70, 0x2d, 0x4a,
    0x3e, 0x73, 0x33, 0x91, 0xb2, 0xa0, 0xf5, 0x3f, 0x41, 0x6d, 0x9f, 0x90, 0x7e, 0x55, 0xcf, 0xf8,
];

/// Reserved high bit of the flags byte.
pub const IFAC_FLAG: u8 = 0x80;

pub const DEFAULT_IFAC_SIZE: usize = 8;

/// Derived per-interface key material.
pub struct IfacCredentials {
    key: [u8; 64],
    identity: Identity,
    size: usize,
}

impl std::fmt::Debug for IfacCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfacCredentials")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl IfacCredentials {
    /// `key = hkdf(64, sha256(sha256(netname) || sha256(netkey)), IFAC_SALT)`,
    /// with absent parts left out of the concatenation.
    pub fn new(netname: Option<&str>, netkey: Option<&str>, size: usize) -> Result<Self, IfacError> {
        if !(1..=64).contains(&size) {
            return Err(IfacError::InvalidSize(size));
        }
        if netname.is_none() && netkey.is_none() {
            return Err(IfacError::NoCredentials);
        }
        let mut origin = Vec::with_capacity(64);
        for part in [netname, netkey].into_iter().flatten() {
            origin.extend_from_slice(&sha256(part.as_bytes()));
        }
        let derived = hkdf(64, &sha256(&origin), Some(&IFAC_SALT), None);
        let mut key = [0u8; 64];
        key.copy_from_slice(&derived);
        Ok(Self {
            identity: Identity::from_private_bytes(&key),
            key,
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn access_code(&self, frame: &[u8]) -> Result<Vec<u8>, IfacError> {
        let signature = self.identity.sign(frame)?;
        Ok(signature[64 - self.size..].to_vec())
    }

    fn keystream(&self, code: &[u8], len: usize) -> Vec<u8> {
        hkdf(len, code, Some(&self.key), None)
    }
}

pub fn has_ifac_flag(raw: &[u8]) -> bool {
    raw.first().is_some_and(|b| b & IFAC_FLAG == IFAC_FLAG)
}

/// Mask a frame for transmission on an authenticated interface.
pub fn mask(creds: &IfacCredentials, raw: &[u8]) -> Result<Vec<u8>, IfacError> {
    if raw.len() < 3 {
        return Err(IfacError::PacketTooShort {
            min: 3,
            actual: raw.len(),
        });
    }
    let code = creds.access_code(raw)?;
    let stream = creds.keystream(&code, raw.len() + creds.size);

    let mut out = Vec::with_capacity(raw.len() + creds.size);
    out.push((raw[0] ^ stream[0]) | IFAC_FLAG);
    out.push(raw[1] ^ stream[1]);
    out.extend_from_slice(&code);
    let payload_offset = 2 + creds.size;
    out.extend(
        raw[2..]
            .iter()
            .zip(&stream[payload_offset..])
            .map(|(b, m)| b ^ m),
    );
    Ok(out)
}

/// Authenticate and unmask a received frame, returning the original bytes.
pub fn unmask(creds: &IfacCredentials, masked: &[u8]) -> Result<Vec<u8>, IfacError> {
    let min = 2 + creds.size + 1;
    if masked.len() < min {
        return Err(IfacError::PacketTooShort {
            min,
            actual: masked.len(),
        });
    }
    if !has_ifac_flag(masked) {
        return Err(IfacError::MissingFlag);
    }
    let code = &masked[2..2 + creds.size];
    let stream = creds.keystream(code, masked.len());

    let mut raw = Vec::with_capacity(masked.len() - creds.size);
    raw.push((masked[0] ^ stream[0]) & !IFAC_FLAG);
    raw.push(masked[1] ^ stream[1]);
    let payload_offset = 2 + creds.size;
    raw.extend(
        masked[payload_offset..]
            .iter()
            .zip(&stream[payload_offset..])
            .map(|(b, m)| b ^ m),
    );

    if creds.access_code(&raw)? != code {
        return Err(IfacError::AuthenticationFailed);
    }
    Ok(raw)
}
