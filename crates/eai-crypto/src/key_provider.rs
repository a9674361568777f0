//! # Key Provider Abstraction
//!
//! Issuer signing sits behind [`KeyProvider`] so the credential engine does
//! not care where the key lives:
//!
//! - [`LocalKeyProvider`]: in-memory key for development and tests.
//! - [`EnvKeyProvider`]: hex seed from an environment variable, the way
//!   container deployments inject secrets.
//!
//! ## Security Invariants
//!
//! - Key material is zeroized on drop (dalek `zeroize` feature).
//! - `KeyProvider` is `Send + Sync` for use across async tasks.
//! - Signing input is `&JwsSigningInput` (never raw bytes).

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;
use crate::jws::JwsSigningInput;

/// Trait for Ed25519 key storage and signing backends.
pub trait KeyProvider: Send + Sync {
    /// Sign a JWS signing input with the managed key.
    fn sign(&self, input: &JwsSigningInput) -> Result<Ed25519Signature, CryptoError>;

    /// Public key matching the managed signing key.
    fn public_key(&self) -> Ed25519PublicKey;

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;

    /// Key id placed in the `kid` header of issued credentials.
    fn key_id(&self) -> String {
        self.public_key().to_hex()
    }
}

// ─── LocalKeyProvider ────────────────────────────────────────────────────

/// In-memory Ed25519 key provider.
pub struct LocalKeyProvider {
    key: Ed25519KeyPair,
}

impl LocalKeyProvider {
    /// Wrap an existing key pair.
    pub fn new(key: Ed25519KeyPair) -> Self {
        Self { key }
    }

    /// Generate a new random key using the OS CSPRNG.
    pub fn generate() -> Self {
        Self::new(Ed25519KeyPair::generate())
    }

    /// Create from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(Ed25519KeyPair::from_seed(seed))
    }
}

impl KeyProvider for LocalKeyProvider {
    fn sign(&self, input: &JwsSigningInput) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(input))
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.key.public_key()
    }

    fn provider_name(&self) -> &str {
        "LocalKeyProvider"
    }
}

impl std::fmt::Debug for LocalKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyProvider")
            .field("public_key", &self.key.public_key())
            .finish()
    }
}

// ─── EnvKeyProvider ──────────────────────────────────────────────────────

/// Loads an Ed25519 signing key from an environment variable.
///
/// The variable must hold a 64-character hex string encoding the 32-byte
/// seed:
///
/// ```bash
/// export ISSUER_SIGNING_KEY_HEX="deadbeef..."  # 64 hex chars
/// ```
pub struct EnvKeyProvider {
    key: Ed25519KeyPair,
    var_name: String,
}

impl EnvKeyProvider {
    /// Load the signing key from the named environment variable.
    ///
    /// Returns `Ok(None)` when the variable is unset.
    pub fn from_env(var_name: &str) -> Result<Option<Self>, CryptoError> {
        let Ok(hex) = std::env::var(var_name) else {
            return Ok(None);
        };
        Ok(Some(Self::from_hex(var_name, &hex)?))
    }

    /// Build from an already-read hex seed, recording where it came from.
    pub fn from_hex(var_name: &str, hex: &str) -> Result<Self, CryptoError> {
        let key = Ed25519KeyPair::from_seed_hex(hex).map_err(|e| {
            CryptoError::InvalidSigningKey(format!("{var_name}: {e}"))
        })?;
        Ok(Self {
            key,
            var_name: var_name.to_string(),
        })
    }

    /// Environment variable this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl KeyProvider for EnvKeyProvider {
    fn sign(&self, input: &JwsSigningInput) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(input))
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.key.public_key()
    }

    fn provider_name(&self) -> &str {
        "EnvKeyProvider"
    }
}

impl std::fmt::Debug for EnvKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvKeyProvider")
            .field("var_name", &self.var_name)
            .field("public_key", &self.key.public_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::{JwsHeader, UnsignedJws};

    #[test]
    fn local_provider_signs_verifiably() {
        let provider = LocalKeyProvider::generate();
        let unsigned =
            UnsignedJws::new(&JwsHeader::eddsa(provider.key_id()), &serde_json::json!({"a": 1}))
                .unwrap();
        let sig = provider.sign(unsigned.signing_input()).unwrap();
        crate::ed25519::verify(unsigned.signing_input(), &sig, &provider.public_key()).unwrap();
        assert_eq!(provider.key_id().len(), 64);
    }

    #[test]
    fn env_provider_from_hex_matches_seed() {
        let seed = [3u8; 32];
        let hex: String = seed.iter().map(|b| format!("{b:02x}")).collect();
        let provider = EnvKeyProvider::from_hex("ISSUER_SIGNING_KEY_HEX", &hex).unwrap();
        assert_eq!(
            provider.public_key(),
            LocalKeyProvider::from_seed(&seed).public_key()
        );
        assert_eq!(provider.var_name(), "ISSUER_SIGNING_KEY_HEX");
    }

    #[test]
    fn env_provider_bad_hex_names_variable() {
        let err = EnvKeyProvider::from_hex("ISSUER_SIGNING_KEY_HEX", "nothex").unwrap_err();
        assert!(err.to_string().contains("ISSUER_SIGNING_KEY_HEX"));
    }

    #[test]
    fn unset_variable_is_none() {
        let provider = EnvKeyProvider::from_env("EAI_TEST_KEY_THAT_IS_NEVER_SET").unwrap();
        assert!(provider.is_none());
    }

    #[test]
    fn debug_hides_seed() {
        let provider = LocalKeyProvider::from_seed(&[5u8; 32]);
        assert!(!format!("{provider:?}").contains("0505050505"));
    }
}
