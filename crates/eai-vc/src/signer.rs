//! # Credential Signer Backends
//!
//! `prepare_credential` never waits for a signature. It hands a
//! [`SigningRequest`] to a [`CredentialSigner`], which eventually writes the
//! result into the shared [`SignatureMap`]:
//!
//! - [`InlineSigner`] signs before `submit` returns.
//! - [`BackgroundSigner`] queues onto a tokio worker; `get_credential` polls.
//! - [`DeferredSigner`] holds requests until [`DeferredSigner::release`],
//!   which lets tests observe the `SignatureNotFound` window.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use eai_crypto::{CryptoError, Ed25519PublicKey, JwsSigningInput, KeyProvider, Sha256Digest};

use crate::signature_map::SignatureMap;

/// Request to sign one credential.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    /// Signature-map key.
    pub digest: Sha256Digest,
    /// Bytes to sign.
    pub input: JwsSigningInput,
}

/// Backend producing credential signatures into a [`SignatureMap`].
pub trait CredentialSigner: Send + Sync + std::fmt::Debug {
    /// Enqueue or perform signing. Must not block on a remote signer.
    fn submit(&self, request: SigningRequest) -> Result<(), CryptoError>;

    /// Issuer public key.
    fn public_key(&self) -> Ed25519PublicKey;

    /// `kid` placed in credential headers.
    fn key_id(&self) -> String {
        self.public_key().to_hex()
    }

    /// Backend name for logs.
    fn mode(&self) -> &'static str;
}

fn sign_into(provider: &dyn KeyProvider, signatures: &SignatureMap, request: &SigningRequest) -> Result<(), CryptoError> {
    match provider.sign(&request.input) {
        Ok(signature) => {
            if !signatures.fulfil(&request.digest, signature) {
                debug!(digest = %request.digest, "signature request expired before signing");
            }
            Ok(())
        }
        Err(e) => {
            signatures.abandon(&request.digest);
            Err(e)
        }
    }
}

// ─── InlineSigner ────────────────────────────────────────────────────────

/// Signs synchronously inside `submit`.
pub struct InlineSigner {
    provider: Arc<dyn KeyProvider>,
    signatures: Arc<SignatureMap>,
}

impl InlineSigner {
    /// Signer writing into `signatures`.
    pub fn new(provider: Arc<dyn KeyProvider>, signatures: Arc<SignatureMap>) -> Self {
        Self {
            provider,
            signatures,
        }
    }
}

impl CredentialSigner for InlineSigner {
    fn submit(&self, request: SigningRequest) -> Result<(), CryptoError> {
        sign_into(self.provider.as_ref(), &self.signatures, &request)
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.provider.public_key()
    }

    fn mode(&self) -> &'static str {
        "inline"
    }
}

impl std::fmt::Debug for InlineSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineSigner")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

// ─── BackgroundSigner ────────────────────────────────────────────────────

/// Queues requests to a tokio worker task.
pub struct BackgroundSigner {
    public_key: Ed25519PublicKey,
    provider_name: String,
    tx: mpsc::UnboundedSender<SigningRequest>,
}

impl BackgroundSigner {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker exits once the signer is dropped and the queue drains.
    pub fn spawn(
        provider: Arc<dyn KeyProvider>,
        signatures: Arc<SignatureMap>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SigningRequest>();
        let public_key = provider.public_key();
        let provider_name = provider.provider_name().to_string();
        let handle = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                if let Err(e) = sign_into(provider.as_ref(), &signatures, &request) {
                    error!(digest = %request.digest, error = %e, "background signing failed");
                }
            }
            debug!("background signer stopped");
        });
        (
            Self {
                public_key,
                provider_name,
                tx,
            },
            handle,
        )
    }
}

impl CredentialSigner for BackgroundSigner {
    fn submit(&self, request: SigningRequest) -> Result<(), CryptoError> {
        self.tx
            .send(request)
            .map_err(|_| CryptoError::SignerUnavailable("background signer stopped".to_string()))
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.public_key
    }

    fn mode(&self) -> &'static str {
        "background"
    }
}

impl std::fmt::Debug for BackgroundSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundSigner")
            .field("provider", &self.provider_name)
            .field("public_key", &self.public_key)
            .finish()
    }
}

// ─── DeferredSigner ──────────────────────────────────────────────────────

/// Holds requests until released.
pub struct DeferredSigner {
    provider: Arc<dyn KeyProvider>,
    signatures: Arc<SignatureMap>,
    queue: Mutex<Vec<SigningRequest>>,
}

impl DeferredSigner {
    /// Deferred signer writing into `signatures`.
    pub fn new(provider: Arc<dyn KeyProvider>, signatures: Arc<SignatureMap>) -> Self {
        Self {
            provider,
            signatures,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Sign everything queued so far. Returns the number signed.
    ///
    /// Every queued request is attempted. Failed requests are dropped from
    /// the signature map so a later prepare re-submits them, and the first
    /// failure is returned after the queue has been drained.
    pub fn release(&self) -> Result<usize, CryptoError> {
        let queued = std::mem::take(&mut *self.queue.lock());
        let mut signed = 0;
        let mut first_error = None;
        for request in &queued {
            match sign_into(self.provider.as_ref(), &self.signatures, request) {
                Ok(()) => signed += 1,
                Err(e) => {
                    error!(digest = %request.digest, error = %e, "deferred signing failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(signed),
        }
    }

    /// Requests waiting for release.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl CredentialSigner for DeferredSigner {
    fn submit(&self, request: SigningRequest) -> Result<(), CryptoError> {
        self.queue.lock().push(request);
        Ok(())
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.provider.public_key()
    }

    fn mode(&self) -> &'static str {
        "deferred"
    }
}

impl std::fmt::Debug for DeferredSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSigner")
            .field("provider", &self.provider.provider_name())
            .field("pending", &self.pending())
            .finish()
    }
}
