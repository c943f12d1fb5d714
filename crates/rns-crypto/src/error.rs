//! Error type for cryptographic operations.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("HMAC verification failed")]
    InvalidHmac,

    #[error("invalid length: {reason}")]
    InvalidLength { reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
            .to_string(),
            "invalid key length: expected 32, got 16"
        );
        assert_eq!(CryptoError::InvalidHmac.to_string(), "HMAC verification failed");
        assert_eq!(
            CryptoError::InvalidLength { reason: "short" }.to_string(),
            "invalid length: short"
        );
    }
}
