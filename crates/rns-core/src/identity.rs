//! Network identities.
//!
//! An identity is an X25519 key pair for encryption and an Ed25519 key pair
//! for signatures. Its hash is `sha256(x25519_pub || ed25519_pub)[..16]`.
//! Public-only identities can verify and encrypt; full identities can also
//! sign and decrypt.

use rns_crypto::ed25519::{SigningKey, VerifyingKey};
use rns_crypto::hkdf::hkdf;
use rns_crypto::sha::truncated_hash;
use rns_crypto::token::{TOKEN_MIN_LEN, Token};
use rns_crypto::x25519::{PrivateKey, PublicKeyBytes};

use crate::error::IdentityError;
use crate::types::IdentityHash;

const EPHEMERAL_LEN: usize = 32;

pub struct Identity {
    encryption_private: Option<PrivateKey>,
    signing_private: Option<SigningKey>,
    encryption_public: PublicKeyBytes,
    signing_public: VerifyingKey,
    hash: IdentityHash,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("hash", &self.hash)
            .field("private", &self.has_private_key())
            .finish()
    }
}

impl Identity {
    pub fn generate() -> Self {
        Self::from_keys(PrivateKey::generate(), SigningKey::generate())
    }

    /// Layout: `x25519_private(32) || ed25519_seed(32)`.
    pub fn from_private_bytes(bytes: &[u8; 64]) -> Self {
        let mut x = [0u8; 32];
        let mut ed = [0u8; 32];
        x.copy_from_slice(&bytes[..32]);
        ed.copy_from_slice(&bytes[32..]);
        Self::from_keys(PrivateKey::from_bytes(x), SigningKey::from_bytes(ed))
    }

    fn from_keys(encryption: PrivateKey, signing: SigningKey) -> Self {
        let encryption_public = encryption.public_key();
        let signing_public = signing.verifying_key();
        let hash = hash_public(&encryption_public, &signing_public);
        Self {
            encryption_private: Some(encryption),
            signing_private: Some(signing),
            encryption_public,
            signing_public,
            hash,
        }
    }

    /// Layout: `x25519_public(32) || ed25519_public(32)`.
    pub fn from_public_bytes(bytes: &[u8; 64]) -> Result<Self, IdentityError> {
        let mut x = [0u8; 32];
        let mut ed = [0u8; 32];
        x.copy_from_slice(&bytes[..32]);
        ed.copy_from_slice(&bytes[32..]);
        let encryption_public = PublicKeyBytes(x);
        let signing_public =
            VerifyingKey::from_bytes(ed).map_err(|_| IdentityError::InvalidPublicKey)?;
        let hash = hash_public(&encryption_public, &signing_public);
        Ok(Self {
            encryption_private: None,
            signing_private: None,
            encryption_public,
            signing_public,
            hash,
        })
    }

    pub fn hash(&self) -> IdentityHash {
        self.hash
    }

    pub fn has_private_key(&self) -> bool {
        self.encryption_private.is_some() && self.signing_private.is_some()
    }

    pub fn public_key_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.encryption_public.0);
        out[32..].copy_from_slice(&self.signing_public.to_bytes());
        out
    }

    pub fn private_key_bytes(&self) -> Option<[u8; 64]> {
        let x = self.encryption_private.as_ref()?;
        let ed = self.signing_private.as_ref()?;
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&x.to_bytes());
        out[32..].copy_from_slice(&ed.to_bytes());
        Some(out)
    }

    pub fn sign(&self, data: &[u8]) -> Result<[u8; 64], IdentityError> {
        self.signing_private
            .as_ref()
            .map(|key| key.sign(data))
            .ok_or(IdentityError::NoPrivateKey)
    }

    pub fn verify(&self, data: &[u8], signature: &[u8; 64]) -> Result<(), IdentityError> {
        self.signing_public
            .verify(data, signature)
            .map_err(|_| IdentityError::SignatureVerificationFailed)
    }

    /// `ephemeral_public(32) || token`, keyed by
    /// `hkdf(64, ecdh(ephemeral, self), salt = identity_hash)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let ephemeral = PrivateKey::generate();
        let shared = ephemeral.diffie_hellman(&self.encryption_public);
        let token = Token::new(&self.token_key(&shared));

        let sealed = token.encrypt(plaintext);
        let mut out = Vec::with_capacity(EPHEMERAL_LEN + sealed.len());
        out.extend_from_slice(&ephemeral.public_key().0);
        out.extend_from_slice(&sealed);
        out
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let private = self
            .encryption_private
            .as_ref()
            .ok_or(IdentityError::NoPrivateKey)?;
        if ciphertext.len() < EPHEMERAL_LEN + TOKEN_MIN_LEN {
            return Err(IdentityError::CiphertextTooShort {
                min: EPHEMERAL_LEN + TOKEN_MIN_LEN,
                actual: ciphertext.len(),
            });
        }
        let (ephemeral, sealed) = ciphertext.split_at(EPHEMERAL_LEN);
        let mut peer = [0u8; 32];
        peer.copy_from_slice(ephemeral);
        let shared = private.diffie_hellman(&PublicKeyBytes(peer));
        Ok(Token::new(&self.token_key(&shared)).decrypt(sealed)?)
    }

    fn token_key(&self, shared: &[u8; 32]) -> [u8; 64] {
        let derived = hkdf(64, shared, Some(self.hash.as_ref()), None);
        let mut key = [0u8; 64];
        key.copy_from_slice(&derived);
        key
    }
}

fn hash_public(encryption: &PublicKeyBytes, signing: &VerifyingKey) -> IdentityHash {
    let mut material = [0u8; 64];
    material[..32].copy_from_slice(&encryption.0);
    material[32..].copy_from_slice(&signing.to_bytes());
    IdentityHash::new(truncated_hash(&material))
}
