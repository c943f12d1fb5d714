//! Error types for packet, identity and announce handling.

use rns_crypto::CryptoError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("packet too short: need at least {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("invalid header type: {0}")]
    InvalidHeaderType(u8),

    #[error("invalid transport type: {0}")]
    InvalidTransportType(u8),

    #[error("invalid destination type: {0}")]
    InvalidDestinationType(u8),

    #[error("invalid packet type: {0}")]
    InvalidPacketType(u8),

    #[error("HEADER_2 packet without transport id")]
    MissingTransportId,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no private key available")]
    NoPrivateKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("ciphertext too short: need at least {min} bytes, got {actual}")]
    CiphertextTooShort { min: usize, actual: usize },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("not an announce packet")]
    NotAnAnnounce,

    #[error("announce payload too short: need at least {min} bytes, got {actual}")]
    PayloadTooShort { min: usize, actual: usize },

    #[error("announce destination hash does not match name hash and identity")]
    InvalidDestinationHash,

    #[error("announce signature does not validate")]
    InvalidSignature,

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}
