//! # Issuer Bootstrap
//!
//! Assembles the application state from process configuration.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load Signing Key**: From `ISSUER_SIGNING_KEY_HEX`, or generate an
//!    ephemeral key (development only).
//! 2. **Open Registry**: In memory, or restored from `ISSUER_STATE_PATH`.
//! 3. **Load Issuer Config**: From `ISSUER_CONFIG` if set; otherwise the
//!    issuer starts unconfigured and waits for `PUT /v1/admin/config`.
//! 4. **Start Signer**: Inline, or a background worker task.
//! 5. **Log Banner**: Structured startup summary.

use std::sync::Arc;

use eai_core::{SharedClock, SystemClock};
use eai_crypto::{CryptoError, EnvKeyProvider, KeyProvider, LocalKeyProvider};
use eai_state::{Registry, SnapshotError, SnapshotStore};
use eai_vc::{
    BackgroundSigner, ConfigError, ConfigManager, CredentialSigner, InlineSigner,
    IssuerConfig, JwsIdAliasVerifier, SignatureMap,
};

use crate::state::{AppConfig, AppState, SignerMode, StateParts};

/// Environment variable holding the hex-encoded issuer signing seed.
pub const SIGNING_KEY_VAR: &str = "ISSUER_SIGNING_KEY_HEX";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors during issuer bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Initial issuer configuration could not be loaded.
    #[error("issuer configuration: {0}")]
    IssuerConfig(#[from] ConfigError),

    /// Signing key could not be loaded.
    #[error("signing key error: {0}")]
    SigningKey(#[from] CryptoError),

    /// Registry snapshot could not be restored.
    #[error("registry snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

// ---------------------------------------------------------------------------
// Internal phase types
// ---------------------------------------------------------------------------

struct SigningConfig {
    provider: Arc<dyn KeyProvider>,
    ephemeral: bool,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Bootstrap the application state, reading the signing key from
/// [`SIGNING_KEY_VAR`].
///
/// `SignerMode::Background` spawns a worker and must run inside a tokio
/// runtime.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let signing = match EnvKeyProvider::from_env(SIGNING_KEY_VAR)? {
        Some(provider) => SigningConfig {
            provider: Arc::new(provider),
            ephemeral: false,
        },
        None => ephemeral_key(),
    };
    assemble(config, signing, SystemClock::shared())
}

/// Bootstrap with an explicit hex seed instead of the environment.
pub fn bootstrap_with_key(
    config: AppConfig,
    seed_hex: Option<&str>,
    clock: SharedClock,
) -> Result<AppState, BootstrapError> {
    let signing = match seed_hex {
        Some(hex) => SigningConfig {
            provider: Arc::new(EnvKeyProvider::from_hex(SIGNING_KEY_VAR, hex)?),
            ephemeral: false,
        },
        None => ephemeral_key(),
    };
    assemble(config, signing, clock)
}

fn ephemeral_key() -> SigningConfig {
    tracing::warn!(
        "{SIGNING_KEY_VAR} not set; generating an ephemeral signing key. \
         Credentials issued by this process cannot be verified after restart."
    );
    SigningConfig {
        provider: Arc::new(LocalKeyProvider::generate()),
        ephemeral: true,
    }
}

fn assemble(
    config: AppConfig,
    signing: SigningConfig,
    clock: SharedClock,
) -> Result<AppState, BootstrapError> {
    let registry = open_registry(&config, clock.clone())?;
    let issuer = load_issuer_config(&config)?;
    let signatures = Arc::new(SignatureMap::new());
    let signer = start_signer(config.signer_mode, signing.provider.clone(), signatures.clone());

    log_banner(&config, &signing, &registry, &issuer, signer.as_ref());

    Ok(AppState::assemble(
        config,
        StateParts {
            issuer: Arc::new(issuer),
            registry: Arc::new(registry),
            verifier: Arc::new(JwsIdAliasVerifier::new(clock.clone())),
            signer,
            signatures,
            clock,
            key_ephemeral: signing.ephemeral,
        },
    ))
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

fn open_registry(config: &AppConfig, clock: SharedClock) -> Result<Registry, BootstrapError> {
    match &config.state_path {
        Some(path) => Ok(Registry::with_snapshot(clock, SnapshotStore::new(path.clone()))?),
        None => {
            tracing::info!("ISSUER_STATE_PATH not set; registry is in-memory only");
            Ok(Registry::new(clock))
        }
    }
}

fn load_issuer_config(config: &AppConfig) -> Result<ConfigManager, BootstrapError> {
    match &config.issuer_config_path {
        Some(path) => Ok(ConfigManager::with_config(IssuerConfig::load(path)?)?),
        None => {
            tracing::warn!("ISSUER_CONFIG not set; issuer awaits PUT /v1/admin/config");
            Ok(ConfigManager::new())
        }
    }
}

fn start_signer(
    mode: SignerMode,
    provider: Arc<dyn KeyProvider>,
    signatures: Arc<SignatureMap>,
) -> Arc<dyn CredentialSigner> {
    match mode {
        SignerMode::Inline => Arc::new(InlineSigner::new(provider, signatures)),
        SignerMode::Background => {
            let (signer, _worker) = BackgroundSigner::spawn(provider, signatures);
            Arc::new(signer)
        }
    }
}

fn log_banner(
    config: &AppConfig,
    signing: &SigningConfig,
    registry: &Registry,
    issuer: &ConfigManager,
    signer: &dyn CredentialSigner,
) {
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set; administrative routes are open to every caller");
    }
    tracing::info!(
        issuer_url = %config.issuer_url,
        signer = signer.mode(),
        key_id = %signer.key_id(),
        key_provider = signing.provider.provider_name(),
        key_ephemeral = signing.ephemeral,
        configured = issuer.is_configured(),
        events = registry.event_count(),
        participants = registry.participant_count(),
        "issuer bootstrapped"
    );
}
