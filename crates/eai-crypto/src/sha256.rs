//! # SHA-256 Digests
//!
//! Digests over JWS signing inputs. The signature map is keyed by the
//! digest of the credential's signing input, so the prepare and get
//! phases agree on a key without sharing memory.

use sha2::{Digest, Sha256};

use crate::jws::JwsSigningInput;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        crate::ed25519::bytes_to_hex(&self.0)
    }
}

impl std::fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sha256Digest({})", self.to_hex())
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest a JWS signing input (`base64url(header) "." base64url(claims)`).
pub fn signing_input_digest(input: &JwsSigningInput) -> Sha256Digest {
    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Sha256Digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::{JwsHeader, UnsignedJws};

    fn input(claims: serde_json::Value) -> JwsSigningInput {
        UnsignedJws::new(&JwsHeader::eddsa("kid"), &claims)
            .unwrap()
            .signing_input()
            .clone()
    }

    #[test]
    fn digest_is_deterministic() {
        let a = signing_input_digest(&input(serde_json::json!({"sub": "a", "n": 1})));
        let b = signing_input_digest(&input(serde_json::json!({"n": 1, "sub": "a"})));
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn different_claims_differ() {
        let a = signing_input_digest(&input(serde_json::json!({"sub": "a"})));
        let b = signing_input_digest(&input(serde_json::json!({"sub": "b"})));
        assert_ne!(a, b);
    }
}
