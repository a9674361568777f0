//! # Ed25519 Signing and Verification
//!
//! Key types for the two trust relationships in the issuer: the identity
//! provider's root key (verifies incoming id aliases) and the issuer's own
//! key (signs outgoing credentials).
//!
//! ## Security Invariant
//!
//! - The signing input is `&JwsSigningInput`, which can only be built from
//!   canonical header and claims bytes. Raw `&[u8]` cannot be signed.
//! - `Ed25519KeyPair` does not implement `Serialize`; its `Debug` output
//!   hides the seed, and the dalek key zeroizes on drop.
//!
//! Public keys and signatures serialize as lowercase hex strings.

use ed25519_dalek::Signer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::jws::JwsSigningInput;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; 64]);

/// An Ed25519 key pair for signing operations.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Wrap raw key bytes. Curve-point validity is checked on verification.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_to_bytes(hex.trim())?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Convert to a dalek verifying key.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice of any length, rejecting anything but 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        let bytes = hex_to_bytes(&hex).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_prefix(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a key pair from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Create a key pair from a 64-character hex seed.
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex_to_bytes(hex.trim())?);
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidSigningKey(format!(
                "expected 32 bytes (64 hex chars), got {} bytes",
                bytes.len()
            ))
        })?);
        Ok(Self::from_seed(&seed))
    }

    /// Hex of the 32-byte seed. Only the CLI `keygen` command calls this.
    pub fn seed_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(bytes_to_hex(&self.signing_key.to_bytes()))
    }

    /// Public half of the pair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a JWS signing input.
    pub fn sign(&self, input: &JwsSigningInput) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(input.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify an Ed25519 signature over a JWS signing input.
pub fn verify(
    input: &JwsSigningInput,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(input.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes_to_hex(&bytes[..bytes.len().min(4)])
}

pub(crate) fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CryptoError> {
    if hex.len() % 2 != 0 {
        return Err(CryptoError::HexDecode(
            "hex string must have even length".to_string(),
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CryptoError::HexDecode(format!("invalid hex at position {i}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::{JwsHeader, UnsignedJws};

    fn signing_input(claims: serde_json::Value) -> JwsSigningInput {
        UnsignedJws::new(&JwsHeader::eddsa("test"), &claims)
            .unwrap()
            .signing_input()
            .clone()
    }

    #[test]
    fn sign_and_verify() {
        let kp = Ed25519KeyPair::generate();
        let input = signing_input(serde_json::json!({"sub": "alias-1"}));
        let sig = kp.sign(&input);
        verify(&input, &sig, &kp.public_key()).expect("valid signature should verify");
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = Ed25519KeyPair::generate();
        let kp2 = Ed25519KeyPair::generate();
        let input = signing_input(serde_json::json!({"sub": "alias-1"}));
        let sig = kp1.sign(&input);
        assert!(verify(&input, &sig, &kp2.public_key()).is_err());
    }

    #[test]
    fn tampered_claims_fail() {
        let kp = Ed25519KeyPair::generate();
        let original = signing_input(serde_json::json!({"sub": "alias-1"}));
        let tampered = signing_input(serde_json::json!({"sub": "alias-2"}));
        let sig = kp.sign(&original);
        assert!(verify(&tampered, &sig, &kp.public_key()).is_err());
    }

    #[test]
    fn seed_hex_roundtrip_is_deterministic() {
        let kp = Ed25519KeyPair::from_seed(&[7u8; 32]);
        let restored = Ed25519KeyPair::from_seed_hex(&kp.seed_hex()).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn seed_hex_wrong_length_rejected() {
        assert!(matches!(
            Ed25519KeyPair::from_seed_hex("abcd"),
            Err(CryptoError::InvalidSigningKey(_))
        ));
        assert!(matches!(
            Ed25519KeyPair::from_seed_hex("zz"),
            Err(CryptoError::HexDecode(_))
        ));
    }

    #[test]
    fn public_key_serializes_as_hex() {
        let pk = Ed25519KeyPair::from_seed(&[1u8; 32]).public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: Ed25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn short_public_key_rejected() {
        assert!(Ed25519PublicKey::from_hex("abcd").is_err());
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let kp = Ed25519KeyPair::from_seed(&[9u8; 32]);
        let dbg = format!("{kp:?}");
        assert!(!dbg.contains(kp.seed_hex().as_str()));
    }

    #[test]
    fn signature_from_slice_checks_length() {
        assert!(matches!(
            Ed25519Signature::from_slice(&[0u8; 10]),
            Err(CryptoError::InvalidSignatureLength(10))
        ));
    }
}
