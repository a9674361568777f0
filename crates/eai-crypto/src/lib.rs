//! # eai-crypto: Cryptographic Primitives
//!
//! - **Ed25519** keys, signatures and verification.
//! - **Compact JWS** (`alg = EdDSA`) for identity aliases and credentials.
//! - **SHA-256** digests of JWS signing inputs (signature-map keys).
//! - **Key providers** for in-memory and environment-injected issuer keys.
//!
//! ## Crate Policy
//!
//! - Depends only on `eai-core` internally.
//! - Signing input is always `&JwsSigningInput`, built from `CanonicalBytes`
//!   when produced locally.
//! - Private keys are never serialized or logged.

pub mod ed25519;
pub mod error;
pub mod jws;
pub mod key_provider;
pub mod sha256;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use jws::{CompactJws, JwsHeader, JwsSigningInput, UnsignedJws, ALG_EDDSA};
pub use key_provider::{EnvKeyProvider, KeyProvider, LocalKeyProvider};
pub use sha256::{signing_input_digest, Sha256Digest};
