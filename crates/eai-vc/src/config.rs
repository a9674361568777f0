//! # Issuer Configuration
//!
//! The issuer's trust configuration: accepted identity providers and their
//! root key, the derivation origin aliases must be scoped to, and the
//! frontend hostnames entitled to that origin.
//!
//! [`ConfigManager`] holds an explicit [`ConfigState`]. Until `configure`
//! has been called every credential and derivation-origin request fails
//! with an `Internal` error. Readers take an `Arc` snapshot, so a concurrent
//! `configure` is observed either entirely or not at all.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use eai_crypto::Ed25519PublicKey;

use crate::error::DerivationOriginError;

/// Issuer trust configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Origin that identity aliases must be scoped to.
    pub derivation_origin: String,
    /// Trusted identity-provider ids (the `kid`/`iss` of alias JWS).
    pub idp_ids: Vec<String>,
    /// Identity-provider root key used to verify alias signatures.
    pub idp_root_key: Ed25519PublicKey,
    /// Canonical frontend hostname.
    pub frontend_hostname: String,
    /// Further hostnames sharing the same derivation origin.
    #[serde(default)]
    pub alternative_frontend_hostnames: Vec<String>,
}

/// Rejected configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Structurally invalid configuration.
    #[error("invalid issuer configuration: {0}")]
    Invalid(String),
    /// Configuration file could not be read or parsed.
    #[error("failed to load issuer configuration: {0}")]
    Load(String),
}

impl IssuerConfig {
    /// Structural checks: non-empty origin and hostname, at least one idp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.derivation_origin.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "derivation_origin cannot be empty".to_string(),
            ));
        }
        if self.frontend_hostname.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "frontend_hostname cannot be empty".to_string(),
            ));
        }
        if self.idp_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "at least one identity provider id is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `hostname` may use this issuer's derivation origin.
    ///
    /// Exact, case-sensitive match against the configured hostnames.
    pub fn serves_hostname(&self, hostname: &str) -> bool {
        self.frontend_hostname == hostname
            || self
                .alternative_frontend_hostnames
                .iter()
                .any(|h| h == hostname)
    }

    /// Whether `id` is a trusted identity provider.
    pub fn trusts_idp(&self, id: &str) -> bool {
        self.idp_ids.iter().any(|known| known == id)
    }

    /// Load from a YAML or JSON file (chosen by extension, YAML otherwise).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw)
                .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?,
            _ => serde_yaml::from_str(&raw)
                .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration lifecycle.
#[derive(Debug, Clone, Default)]
pub enum ConfigState {
    /// `configure` has not been called yet.
    #[default]
    Unconfigured,
    /// Active configuration.
    Configured(Arc<IssuerConfig>),
}

/// Holder of the process-wide issuer configuration.
#[derive(Debug, Default)]
pub struct ConfigManager {
    state: RwLock<ConfigState>,
}

impl ConfigManager {
    /// Start unconfigured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a configuration already applied.
    pub fn with_config(config: IssuerConfig) -> Result<Self, ConfigError> {
        let manager = Self::new();
        manager.configure(config)?;
        Ok(manager)
    }

    /// Replace the configuration. Idempotent for equal input.
    pub fn configure(&self, config: IssuerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        info!(
            derivation_origin = %config.derivation_origin,
            frontend_hostname = %config.frontend_hostname,
            idp_count = config.idp_ids.len(),
            "issuer configured"
        );
        *self.state.write() = ConfigState::Configured(Arc::new(config));
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConfigState {
        self.state.read().clone()
    }

    /// Consistent snapshot of the active configuration, if any.
    pub fn snapshot(&self) -> Option<Arc<IssuerConfig>> {
        match &*self.state.read() {
            ConfigState::Configured(config) => Some(Arc::clone(config)),
            ConfigState::Unconfigured => None,
        }
    }

    /// Whether `configure` has been called.
    pub fn is_configured(&self) -> bool {
        matches!(&*self.state.read(), ConfigState::Configured(_))
    }

    /// Resolve the derivation origin for a frontend hostname.
    pub fn derivation_origin(&self, frontend_hostname: &str) -> Result<String, DerivationOriginError> {
        let config = self.snapshot().ok_or_else(|| {
            DerivationOriginError::Internal("issuer is not configured".to_string())
        })?;
        if config.serves_hostname(frontend_hostname) {
            Ok(config.derivation_origin.clone())
        } else {
            Err(DerivationOriginError::UnsupportedOrigin(
                frontend_hostname.to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eai_crypto::Ed25519KeyPair;
    use proptest::prelude::*;

    fn sample() -> IssuerConfig {
        IssuerConfig {
            derivation_origin: "https://issuer.example".into(),
            idp_ids: vec!["idp-1".into()],
            idp_root_key: Ed25519KeyPair::from_seed(&[1u8; 32]).public_key(),
            frontend_hostname: "https://issuer.example".into(),
            alternative_frontend_hostnames: vec!["https://staging.issuer.example".into()],
        }
    }

    #[test]
    fn unconfigured_fails_internal() {
        let manager = ConfigManager::new();
        assert!(!manager.is_configured());
        assert!(matches!(
            manager.derivation_origin("https://issuer.example"),
            Err(DerivationOriginError::Internal(_))
        ));
    }

    #[test]
    fn known_hosts_resolve_to_origin() {
        let manager = ConfigManager::with_config(sample()).unwrap();
        for host in ["https://issuer.example", "https://staging.issuer.example"] {
            assert_eq!(
                manager.derivation_origin(host).unwrap(),
                "https://issuer.example"
            );
        }
    }

    #[test]
    fn unknown_host_unsupported() {
        let manager = ConfigManager::with_config(sample()).unwrap();
        assert_eq!(
            manager.derivation_origin("https://evil.example"),
            Err(DerivationOriginError::UnsupportedOrigin(
                "https://evil.example".into()
            ))
        );
    }

    #[test]
    fn configure_rejects_structural_errors() {
        let manager = ConfigManager::new();
        let mut config = sample();
        config.idp_ids.clear();
        assert!(manager.configure(config).is_err());
        let mut config = sample();
        config.derivation_origin = " ".into();
        assert!(manager.configure(config).is_err());
        assert!(!manager.is_configured());
    }

    #[test]
    fn reconfigure_overwrites() {
        let manager = ConfigManager::with_config(sample()).unwrap();
        let before = manager.snapshot().unwrap();
        let mut next = sample();
        next.derivation_origin = "https://other.example".into();
        manager.configure(next).unwrap();
        assert_eq!(before.derivation_origin, "https://issuer.example");
        assert_eq!(
            manager.snapshot().unwrap().derivation_origin,
            "https://other.example"
        );
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample();

        let yaml_path = dir.path().join("issuer.yaml");
        std::fs::write(&yaml_path, serde_yaml::to_string(&config).unwrap()).unwrap();
        assert_eq!(IssuerConfig::load(&yaml_path).unwrap(), config);

        let json_path = dir.path().join("issuer.json");
        std::fs::write(&json_path, serde_json::to_vec(&config).unwrap()).unwrap();
        assert_eq!(IssuerConfig::load(&json_path).unwrap(), config);
    }

    #[test]
    fn alternative_hostnames_default_empty() {
        let json = serde_json::json!({
            "derivation_origin": "https://issuer.example",
            "idp_ids": ["idp-1"],
            "idp_root_key": sample().idp_root_key.to_hex(),
            "frontend_hostname": "https://issuer.example"
        });
        let config: IssuerConfig = serde_json::from_value(json).unwrap();
        assert!(config.alternative_frontend_hostnames.is_empty());
    }

    proptest! {
        #[test]
        fn unlisted_hostnames_always_rejected(host in "[a-z0-9.:/-]{0,40}") {
            let config = sample();
            prop_assume!(!config.serves_hostname(&host));
            let manager = ConfigManager::with_config(config).unwrap();
            prop_assert!(matches!(
                manager.derivation_origin(&host),
                Err(DerivationOriginError::UnsupportedOrigin(h)) if h == host
            ));
        }
    }
}
