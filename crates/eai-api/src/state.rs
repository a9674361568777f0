//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds the issuer's collaborators, each behind an `Arc` so
//! cloning the state per request is cheap:
//! - **ConfigManager**: trust configuration and derivation origins
//! - **Registry**: events and participants
//! - **IdAliasVerifier**: alias verification for registration
//! - **IssuanceEngine**: two-phase credential issuance
//! - **ApiMetrics**: Prometheus registry

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use eai_core::{SharedClock, SystemClock};
use eai_crypto::{KeyProvider, LocalKeyProvider};
use eai_state::Registry;
use eai_vc::{
    ConfigManager, CredentialSigner, IdAliasVerifier, InlineSigner, IssuanceDeps,
    IssuanceEngine, JwsIdAliasVerifier, SignatureMap, DEFAULT_ISSUER_URL,
};

use crate::middleware::metrics::ApiMetrics;

// -- Process Configuration ----------------------------------------------------

/// How credential signatures are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignerMode {
    /// Sign inside `prepare_credential`.
    #[default]
    Inline,
    /// Sign on a background task; `get_credential` polls.
    Background,
}

impl FromStr for SignerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "background" => Ok(Self::Background),
            other => Err(format!(
                "unknown signer mode '{other}', expected 'inline' or 'background'"
            )),
        }
    }
}

/// Application configuration.
///
/// Custom `Debug` redacts the `admin_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bearer token for administrative operations.
    /// If `None`, administrative auth is disabled.
    pub admin_token: Option<String>,
    /// YAML or JSON file with the initial issuer configuration.
    pub issuer_config_path: Option<PathBuf>,
    /// Snapshot file for events and participants.
    pub state_path: Option<PathBuf>,
    /// `iss` of issued credentials.
    pub issuer_url: String,
    /// Signing backend.
    pub signer_mode: SignerMode,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("issuer_config_path", &self.issuer_config_path)
            .field("state_path", &self.state_path)
            .field("issuer_url", &self.issuer_url)
            .field("signer_mode", &self.signer_mode)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            admin_token: None,
            issuer_config_path: None,
            state_path: None,
            issuer_url: DEFAULT_ISSUER_URL.to_string(),
            signer_mode: SignerMode::Inline,
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `ADMIN_TOKEN`, `ISSUER_CONFIG`, `ISSUER_STATE_PATH`,
    /// `ISSUER_URL` and `SIGNER_MODE`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match non_empty("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|e| format!("PORT is not a valid port: {e}"))?,
            None => defaults.port,
        };
        let signer_mode = match non_empty("SIGNER_MODE") {
            Some(mode) => mode.parse()?,
            None => defaults.signer_mode,
        };

        Ok(Self {
            port,
            admin_token: non_empty("ADMIN_TOKEN"),
            issuer_config_path: non_empty("ISSUER_CONFIG").map(PathBuf::from),
            state_path: non_empty("ISSUER_STATE_PATH").map(PathBuf::from),
            issuer_url: non_empty("ISSUER_URL").unwrap_or(defaults.issuer_url),
            signer_mode,
        })
    }
}

// -- Application State --------------------------------------------------------

/// Collaborators an [`AppState`] is assembled from.
#[derive(Debug)]
pub struct StateParts {
    pub issuer: Arc<ConfigManager>,
    pub registry: Arc<Registry>,
    pub verifier: Arc<dyn IdAliasVerifier>,
    pub signer: Arc<dyn CredentialSigner>,
    pub signatures: Arc<SignatureMap>,
    pub clock: SharedClock,
    /// Whether the signing key was generated at startup.
    pub key_ephemeral: bool,
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub issuer: Arc<ConfigManager>,
    pub registry: Arc<Registry>,
    pub verifier: Arc<dyn IdAliasVerifier>,
    pub engine: Arc<IssuanceEngine>,
    pub clock: SharedClock,
    pub metrics: ApiMetrics,
    pub key_ephemeral: bool,
}

impl AppState {
    /// Unconfigured, in-memory state with an ephemeral inline signing key
    /// and admin auth disabled.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Unconfigured, in-memory state with an ephemeral inline signing key.
    pub fn with_config(config: AppConfig) -> Self {
        let clock = SystemClock::shared();
        let signatures = Arc::new(SignatureMap::new());
        let provider: Arc<dyn KeyProvider> = Arc::new(LocalKeyProvider::generate());
        Self::assemble(
            config,
            StateParts {
                issuer: Arc::new(ConfigManager::new()),
                registry: Arc::new(Registry::new(clock.clone())),
                verifier: Arc::new(JwsIdAliasVerifier::new(clock.clone())),
                signer: Arc::new(InlineSigner::new(provider, signatures.clone())),
                signatures,
                clock,
                key_ephemeral: true,
            },
        )
    }

    /// Wire the collaborators together.
    pub fn assemble(config: AppConfig, parts: StateParts) -> Self {
        let engine = IssuanceEngine::new(
            IssuanceDeps {
                config: parts.issuer.clone(),
                registry: parts.registry.clone(),
                verifier: parts.verifier.clone(),
                signer: parts.signer,
                signatures: parts.signatures,
                clock: parts.clock.clone(),
            },
            config.issuer_url.clone(),
        );
        Self {
            config,
            issuer: parts.issuer,
            registry: parts.registry,
            verifier: parts.verifier,
            engine: Arc::new(engine),
            clock: parts.clock,
            metrics: ApiMetrics::new(),
            key_ephemeral: parts.key_ephemeral,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
