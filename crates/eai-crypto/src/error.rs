//! # Cryptographic Error Types
//!
//! Structured errors for key handling, signing, and compact JWS parsing.

use eai_core::CanonicalizationError;
use thiserror::Error;

/// Errors from cryptographic operations in the issuer.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Invalid Ed25519 signature length.
    #[error("invalid Ed25519 signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Invalid Ed25519 public key.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid Ed25519 signing key material.
    #[error("invalid Ed25519 signing key: {0}")]
    InvalidSigningKey(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),

    /// Compact JWS could not be parsed.
    #[error("malformed JWS: {0}")]
    MalformedJws(String),

    /// JWS header names an algorithm other than EdDSA.
    #[error("unsupported JWS algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Header or claims could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The signing backend is unavailable.
    #[error("signing backend unavailable: {0}")]
    SignerUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_length_display() {
        let err = CryptoError::InvalidSignatureLength(32);
        let msg = format!("{err}");
        assert!(msg.contains("64 bytes"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn malformed_jws_display() {
        let err = CryptoError::MalformedJws("expected 3 segments".to_string());
        assert!(format!("{err}").contains("expected 3 segments"));
    }

    #[test]
    fn canonicalization_converts() {
        let err: CryptoError = CanonicalizationError::FloatRejected(1.5).into();
        assert!(matches!(err, CryptoError::Canonicalization(_)));
    }
}
