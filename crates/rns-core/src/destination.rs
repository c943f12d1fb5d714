//! Destination addressing.
//!
//! A destination name is `app.aspect1.aspect2...`. Its name hash is the first
//! 10 bytes of the name's SHA-256. SINGLE destinations mix in the owner's
//! identity hash; PLAIN destinations hash the name hash alone.

use rns_crypto::sha::{sha256, sha256_concat, truncated_hash};

use crate::types::{DestinationHash, IdentityHash, NameHash};

/// Join an app name and aspects with dots.
pub fn expand_name(app_name: &str, aspects: &[&str]) -> String {
    let mut name = String::from(app_name);
    for aspect in aspects {
        name.push('.');
        name.push_str(aspect);
    }
    name
}

pub fn name_hash(app_name: &str, aspects: &[&str]) -> NameHash {
    let full = sha256(expand_name(app_name, aspects).as_bytes());
    let mut out = [0u8; 10];
    out.copy_from_slice(&full[..10]);
    NameHash::new(out)
}

/// `sha256(name_hash || identity_hash)[..16]`.
pub fn destination_hash(name_hash: &NameHash, identity_hash: &IdentityHash) -> DestinationHash {
    let full = sha256_concat(&[name_hash.as_ref(), identity_hash.as_ref()]);
    let mut out = [0u8; 16];
    out.copy_from_slice(&full[..16]);
    DestinationHash::new(out)
}

/// `sha256(name_hash)[..16]`.
pub fn plain_destination_hash(name_hash: &NameHash) -> DestinationHash {
    DestinationHash::new(truncated_hash(name_hash.as_ref()))
}
