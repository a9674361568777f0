//! # Signature Map
//!
//! Signatures for prepared credentials, keyed by the SHA-256 digest of the
//! credential's JWS signing input. `prepare_credential` inserts a
//! `Pending` entry and hands the input to the signer; the signer fills it
//! in; `get_credential` polls it. Entries expire together with the
//! credential they sign and are pruned on every prepare.

use std::collections::HashMap;

use parking_lot::Mutex;

use eai_core::Timestamp;
use eai_crypto::{Ed25519Signature, Sha256Digest};

#[derive(Debug, Clone, Copy)]
enum SignatureState {
    Pending,
    Ready(Ed25519Signature),
}

#[derive(Debug, Clone, Copy)]
struct SignatureEntry {
    state: SignatureState,
    expires_at: Timestamp,
}

/// Result of polling the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureLookup {
    /// Signature available.
    Ready(Ed25519Signature),
    /// Requested, not signed yet.
    Pending,
    /// Never requested, or expired.
    Missing,
}

/// Thread-safe signature store.
#[derive(Debug, Default)]
pub struct SignatureMap {
    entries: Mutex<HashMap<Sha256Digest, SignatureEntry>>,
}

impl SignatureMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending request. Returns `false` if the digest is already
    /// pending or signed, in which case the signer need not be invoked again.
    pub fn request(&self, digest: Sha256Digest, expires_at: Timestamp) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&digest) {
            return false;
        }
        entries.insert(
            digest,
            SignatureEntry {
                state: SignatureState::Pending,
                expires_at,
            },
        );
        true
    }

    /// Store a finished signature. Ignored if the request was pruned meanwhile.
    pub fn fulfil(&self, digest: &Sha256Digest, signature: Ed25519Signature) -> bool {
        match self.entries.lock().get_mut(digest) {
            Some(entry) => {
                entry.state = SignatureState::Ready(signature);
                true
            }
            None => false,
        }
    }

    /// Drop a pending request after a signer failure so a later prepare
    /// can request it again.
    pub fn abandon(&self, digest: &Sha256Digest) {
        let mut entries = self.entries.lock();
        if matches!(
            entries.get(digest),
            Some(SignatureEntry {
                state: SignatureState::Pending,
                ..
            })
        ) {
            entries.remove(digest);
        }
    }

    /// Poll for a signature at `now`.
    pub fn get(&self, digest: &Sha256Digest, now: Timestamp) -> SignatureLookup {
        match self.entries.lock().get(digest) {
            Some(entry) if entry.expires_at <= now => SignatureLookup::Missing,
            Some(SignatureEntry {
                state: SignatureState::Ready(sig),
                ..
            }) => SignatureLookup::Ready(*sig),
            Some(_) => SignatureLookup::Pending,
            None => SignatureLookup::Missing,
        }
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn prune(&self, now: Timestamp) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
