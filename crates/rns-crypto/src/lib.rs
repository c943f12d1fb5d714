//! Cryptographic primitives for the rns transport stack.
//!
//! Hashing, HKDF with the reference network's exact semantics, Ed25519
//! signatures, X25519 key agreement and the modified Fernet token used for
//! identity encryption.

pub mod ed25519;
pub mod error;
pub mod hkdf;
pub mod hmac;
pub mod sha;
pub mod token;
pub mod x25519;

pub use error::CryptoError;
