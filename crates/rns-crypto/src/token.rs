//! Modified Fernet token: `IV(16) || AES-256-CBC(PKCS7) || HMAC-SHA256(32)`.
//!
//! Unlike standard Fernet there is no version byte and no timestamp. The
//! 64-byte key splits into a signing half (`key[..32]`) and an encryption half
//! (`key[32..]`).

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::CryptoError;
use crate::hmac::{hmac_sha256, hmac_sha256_verify};

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;

/// IV, one cipher block and the MAC.
pub const TOKEN_MIN_LEN: usize = IV_LEN + 16 + MAC_LEN;

pub struct Token {
    signing_key: [u8; 32],
    encryption_key: [u8; 32],
}

impl Token {
    pub fn new(key: &[u8; 64]) -> Self {
        let mut signing_key = [0u8; 32];
        let mut encryption_key = [0u8; 32];
        signing_key.copy_from_slice(&key[..32]);
        encryption_key.copy_from_slice(&key[32..]);
        Self {
            signing_key,
            encryption_key,
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; IV_LEN]) -> Vec<u8> {
        let ciphertext = Encryptor::new((&self.encryption_key).into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(IV_LEN + ciphertext.len() + MAC_LEN);
        token.extend_from_slice(iv);
        token.extend_from_slice(&ciphertext);
        let mac = hmac_sha256(&self.signing_key, &token);
        token.extend_from_slice(&mac);
        token
    }

    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if token.len() < TOKEN_MIN_LEN {
            return Err(CryptoError::InvalidLength {
                reason: "token shorter than IV, one block and HMAC",
            });
        }
        let (signed, mac) = token.split_at(token.len() - MAC_LEN);
        hmac_sha256_verify(&self.signing_key, signed, mac)?;

        let (iv, ciphertext) = signed.split_at(IV_LEN);
        if ciphertext.len() % 16 != 0 {
            return Err(CryptoError::DecryptionFailed);
        }
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CryptoError::DecryptionFailed)?;
        Decryptor::new((&self.encryption_key).into(), (&iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
