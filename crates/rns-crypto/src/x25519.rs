//! X25519 key agreement.

use x25519_dalek::{PublicKey, StaticSecret};

pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::rngs::OsRng))
    }

    /// Clamping is applied by the scalar multiplication, not here.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        PublicKeyBytes(PublicKey::from(&self.0).to_bytes())
    }

    pub fn diffie_hellman(&self, peer: &PublicKeyBytes) -> [u8; 32] {
        *self.0.diffie_hellman(&PublicKey::from(peer.0)).as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

/// An X25519 public key in its 32-byte Montgomery form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKeyBytes(pub [u8; 32]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_agree() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        assert_eq!(
            a.diffie_hellman(&b.public_key()),
            b.diffie_hellman(&a.public_key())
        );
    }

    #[test]
    fn rfc7748_alice_public_key() {
        let alice: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        assert_eq!(
            hex::encode(PrivateKey::from_bytes(alice).public_key().0),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }
}
