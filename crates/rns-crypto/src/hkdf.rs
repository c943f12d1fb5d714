//! HKDF-SHA256 with the reference network's exact semantics.
//!
//! Built directly on [`hmac_sha256`] rather than the `hkdf` crate because two
//! details differ from RFC 5869 implementations in practice:
//!
//! - a missing or empty salt becomes 32 zero bytes,
//! - the block counter is `(i + 1) % 256`, so outputs longer than 255 blocks
//!   wrap instead of failing.

use crate::hmac::hmac_sha256;

const HASH_LEN: usize = 32;

/// Derive `length` bytes from `ikm` with an optional salt and info string.
pub fn hkdf(length: usize, ikm: &[u8], salt: Option<&[u8]>, info: Option<&[u8]>) -> Vec<u8> {
    let salt: &[u8] = match salt {
        Some(s) if !s.is_empty() => s,
        _ => &[0u8; HASH_LEN],
    };
    let prk = hmac_sha256(salt, ikm);
    let info = info.unwrap_or_default();

    let mut okm = Vec::with_capacity(length.div_ceil(HASH_LEN) * HASH_LEN);
    let mut previous: Vec<u8> = Vec::new();
    let mut counter: usize = 0;
    while okm.len() < length {
        counter += 1;
        let mut block_input = Vec::with_capacity(previous.len() + info.len() + 1);
        block_input.extend_from_slice(&previous);
        block_input.extend_from_slice(info);
        block_input.push((counter % 256) as u8);
        let block = hmac_sha256(&prk, &block_input);
        okm.extend_from_slice(&block);
        previous = block.to_vec();
    }
    okm.truncate(length);
    okm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc5869_case_1() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let okm = hkdf(42, &ikm, Some(&salt), Some(&info));
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn empty_salt_equals_zero_salt() {
        let a = hkdf(64, b"secret", None, None);
        let b = hkdf(64, b"secret", Some(&[]), None);
        let c = hkdf(64, b"secret", Some(&[0u8; 32]), None);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn odd_lengths_are_prefixes() {
        let long = hkdf(100, b"ikm", Some(b"salt"), None);
        let short = hkdf(37, b"ikm", Some(b"salt"), None);
        assert_eq!(long.len(), 100);
        assert_eq!(&long[..37], short.as_slice());
    }
}
