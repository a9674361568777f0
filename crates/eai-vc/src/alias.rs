//! # Identity Alias Verification
//!
//! A signed id alias is a compact EdDSA JWS issued by a trusted identity
//! provider. It states "dapp principal `sub`, acting as pseudonym
//! `hasIdAlias`, is authorized for origin `aud`":
//!
//! ```json
//! {
//!   "iss": "<idp id>", "sub": "<id_dapp>", "aud": "<derivation origin>",
//!   "nbf": 1717000000, "exp": 1717000900, "jti": "...",
//!   "vc": { "credentialSubject": { "IdentityIdAlias": { "hasIdAlias": "<id_alias>" } } }
//! }
//! ```
//!
//! The header `kid` names the identity provider and must equal `iss`.
//! Verification is behind [`IdAliasVerifier`] so protocol tests can swap in
//! [`StaticAliasVerifier`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eai_core::{SharedClock, SubjectId};
use eai_crypto::{CompactJws, CryptoError, JwsHeader, UnsignedJws};

use crate::config::IssuerConfig;

/// Alias wrapper as carried in requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIdAlias {
    /// Compact JWS issued by the identity provider.
    pub credential_jws: String,
}

/// Verified alias binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTuple {
    /// Pseudonymous subject of issued credentials.
    pub id_alias: String,
    /// Dapp-scoped principal; the participant key.
    pub id_dapp: SubjectId,
}

/// Why an alias was rejected.
#[derive(Error, Debug)]
pub enum AliasError {
    /// Not a well-formed alias JWS.
    #[error("malformed id alias: {0}")]
    Malformed(String),
    /// Header `kid` or claim `iss` is not a trusted identity provider.
    #[error("untrusted identity provider: {0}")]
    UntrustedIssuer(String),
    /// Signature did not verify against the root key.
    #[error("signature verification failed: {0}")]
    BadSignature(#[source] CryptoError),
    /// Scoped to a different origin.
    #[error("alias audience {found} does not match derivation origin {expected}")]
    WrongAudience {
        /// Configured derivation origin.
        expected: String,
        /// Audience found in the alias.
        found: String,
    },
    /// Past `exp`.
    #[error("id alias expired at {0}")]
    Expired(i64),
    /// Before `nbf`.
    #[error("id alias not valid before {0}")]
    NotYetValid(i64),
}

/// Capability that turns a signed alias into a verified [`AliasTuple`].
///
/// `trust` supplies the idp ids, the root key and the derivation origin the
/// alias must be scoped to, all from one configuration snapshot.
pub trait IdAliasVerifier: Send + Sync + std::fmt::Debug {
    /// Verify `signed_id_alias` for `trust.derivation_origin`.
    fn verify(&self, signed_id_alias: &str, trust: &IssuerConfig) -> Result<AliasTuple, AliasError>;
}

#[derive(Debug, Deserialize)]
struct AliasClaims {
    iss: String,
    sub: String,
    aud: String,
    #[serde(default)]
    nbf: Option<i64>,
    exp: i64,
    vc: AliasVc,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AliasVc {
    credential_subject: AliasSubject,
}

#[derive(Debug, Deserialize)]
struct AliasSubject {
    #[serde(rename = "IdentityIdAlias")]
    identity_id_alias: IdentityIdAlias,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityIdAlias {
    has_id_alias: String,
}

/// Production verifier for EdDSA alias JWS.
#[derive(Debug, Clone)]
pub struct JwsIdAliasVerifier {
    clock: SharedClock,
}

impl JwsIdAliasVerifier {
    /// Verifier checking validity windows against `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }
}

impl IdAliasVerifier for JwsIdAliasVerifier {
    fn verify(&self, signed_id_alias: &str, trust: &IssuerConfig) -> Result<AliasTuple, AliasError> {
        let jws = CompactJws::parse(signed_id_alias).map_err(|e| AliasError::Malformed(e.to_string()))?;

        let kid = &jws.header().kid;
        if !trust.trusts_idp(kid) {
            return Err(AliasError::UntrustedIssuer(kid.clone()));
        }
        jws.verify(&trust.idp_root_key).map_err(AliasError::BadSignature)?;

        let claims: AliasClaims = jws
            .claims_as()
            .map_err(|e| AliasError::Malformed(e.to_string()))?;
        if claims.iss != *kid {
            return Err(AliasError::UntrustedIssuer(claims.iss));
        }
        if claims.aud != trust.derivation_origin {
            return Err(AliasError::WrongAudience {
                expected: trust.derivation_origin.clone(),
                found: claims.aud,
            });
        }
        let now = self.clock.timestamp().epoch_secs();
        if now >= claims.exp {
            return Err(AliasError::Expired(claims.exp));
        }
        if let Some(nbf) = claims.nbf {
            if now < nbf {
                return Err(AliasError::NotYetValid(nbf));
            }
        }

        let id_alias = claims.vc.credential_subject.identity_id_alias.has_id_alias;
        if id_alias.trim().is_empty() {
            return Err(AliasError::Malformed("empty hasIdAlias".to_string()));
        }
        let id_dapp = SubjectId::new(claims.sub).map_err(|e| AliasError::Malformed(e.to_string()))?;
        Ok(AliasTuple { id_alias, id_dapp })
    }
}

/// Parameters for minting an alias JWS (development identity provider).
#[derive(Debug, Clone)]
pub struct AliasGrant {
    /// Identity provider id (`kid` and `iss`).
    pub idp_id: String,
    /// Dapp-scoped principal.
    pub id_dapp: String,
    /// Pseudonymous alias.
    pub id_alias: String,
    /// Origin the alias is scoped to.
    pub audience: String,
    /// `nbf`, Unix seconds.
    pub not_before: i64,
    /// `exp`, Unix seconds.
    pub expires_at: i64,
}

/// Build and sign an alias JWS with an identity-provider key.
///
/// Used by the CLI's development identity provider and by tests.
pub fn mint_id_alias(
    grant: &AliasGrant,
    idp_key: &dyn eai_crypto::KeyProvider,
) -> Result<String, CryptoError> {
    let claims = serde_json::json!({
        "iss": grant.idp_id,
        "sub": grant.id_dapp,
        "aud": grant.audience,
        "nbf": grant.not_before,
        "exp": grant.expires_at,
        "jti": format!("{}:{}:{}", grant.idp_id, grant.id_dapp, grant.not_before),
        "vc": {
            "@context": "https://www.w3.org/2018/credentials/v1",
            "type": ["VerifiableCredential", "InternetIdentityIdAlias"],
            "credentialSubject": {
                "id": grant.id_dapp,
                "IdentityIdAlias": { "hasIdAlias": grant.id_alias }
            }
        }
    });
    let unsigned = UnsignedJws::new(&JwsHeader::eddsa(grant.idp_id.clone()), &claims)?;
    let signature = idp_key.sign(unsigned.signing_input())?;
    Ok(unsigned.attach_signature(&signature))
}

/// Test double mapping alias strings to fixed bindings.
///
/// Each entry records the origin it was "issued" for; verifying against a
/// different derivation origin fails exactly like the real verifier.
#[derive(Debug, Default, Clone)]
pub struct StaticAliasVerifier {
    entries: HashMap<String, (AliasTuple, String)>,
}

impl StaticAliasVerifier {
    /// Empty verifier that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `alias` as `(id_alias, id_dapp)` for `origin`.
    pub fn with_alias(mut self, alias: &str, id_alias: &str, id_dapp: &str, origin: &str) -> Self {
        if let Ok(id_dapp) = SubjectId::new(id_dapp) {
            self.entries.insert(
                alias.to_string(),
                (
                    AliasTuple {
                        id_alias: id_alias.to_string(),
                        id_dapp,
                    },
                    origin.to_string(),
                ),
            );
        }
        self
    }
}

impl IdAliasVerifier for StaticAliasVerifier {
    fn verify(&self, signed_id_alias: &str, trust: &IssuerConfig) -> Result<AliasTuple, AliasError> {
        let (tuple, origin) = self
            .entries
            .get(signed_id_alias)
            .ok_or_else(|| AliasError::Malformed("unknown alias".to_string()))?;
        if *origin != trust.derivation_origin {
            return Err(AliasError::WrongAudience {
                expected: trust.derivation_origin.clone(),
                found: origin.clone(),
            });
        }
        Ok(tuple.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eai_core::ManualClock;
    use eai_crypto::LocalKeyProvider;
    use std::sync::Arc;

    const ORIGIN: &str = "https://issuer.example";
    const NOW: i64 = 1_720_000_000;

    fn idp() -> LocalKeyProvider {
        LocalKeyProvider::from_seed(&[11u8; 32])
    }

    fn trust() -> IssuerConfig {
        use eai_crypto::KeyProvider;
        IssuerConfig {
            derivation_origin: ORIGIN.into(),
            idp_ids: vec!["idp-1".into()],
            idp_root_key: idp().public_key(),
            frontend_hostname: "issuer.example".into(),
            alternative_frontend_hostnames: vec![],
        }
    }

    fn grant() -> AliasGrant {
        AliasGrant {
            idp_id: "idp-1".into(),
            id_dapp: "dapp-principal".into(),
            id_alias: "alias-principal".into(),
            audience: ORIGIN.into(),
            not_before: NOW - 60,
            expires_at: NOW + 900,
        }
    }

    fn verifier() -> JwsIdAliasVerifier {
        JwsIdAliasVerifier::new(Arc::new(ManualClock::at_epoch_secs(NOW)))
    }

    #[test]
    fn valid_alias_verifies() {
        let jws = mint_id_alias(&grant(), &idp()).unwrap();
        let tuple = verifier().verify(&jws, &trust()).unwrap();
        assert_eq!(tuple.id_alias, "alias-principal");
        assert_eq!(tuple.id_dapp.as_str(), "dapp-principal");
    }

    #[test]
    fn alias_for_other_origin_rejected() {
        let mut g = grant();
        g.audience = "https://other.example".into();
        let jws = mint_id_alias(&g, &idp()).unwrap();
        assert!(matches!(
            verifier().verify(&jws, &trust()),
            Err(AliasError::WrongAudience { .. })
        ));
    }

    #[test]
    fn untrusted_idp_rejected() {
        let mut g = grant();
        g.idp_id = "idp-evil".into();
        let jws = mint_id_alias(&g, &idp()).unwrap();
        assert!(matches!(
            verifier().verify(&jws, &trust()),
            Err(AliasError::UntrustedIssuer(_))
        ));
    }

    #[test]
    fn wrong_root_key_rejected() {
        let jws = mint_id_alias(&grant(), &LocalKeyProvider::from_seed(&[12u8; 32])).unwrap();
        assert!(matches!(
            verifier().verify(&jws, &trust()),
            Err(AliasError::BadSignature(_))
        ));
    }

    #[test]
    fn expired_and_premature_rejected() {
        let mut g = grant();
        g.expires_at = NOW;
        let jws = mint_id_alias(&g, &idp()).unwrap();
        assert!(matches!(verifier().verify(&jws, &trust()), Err(AliasError::Expired(_))));

        let mut g = grant();
        g.not_before = NOW + 10;
        let jws = mint_id_alias(&g, &idp()).unwrap();
        assert!(matches!(
            verifier().verify(&jws, &trust()),
            Err(AliasError::NotYetValid(_))
        ));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            verifier().verify("not-a-jws", &trust()),
            Err(AliasError::Malformed(_))
        ));
    }

    #[test]
    fn static_verifier_checks_origin() {
        let v = StaticAliasVerifier::new().with_alias("a1", "alias-1", "U1", "https://other.example");
        assert!(matches!(v.verify("a1", &trust()), Err(AliasError::WrongAudience { .. })));
        let v = StaticAliasVerifier::new().with_alias("a1", "alias-1", "U1", ORIGIN);
        assert_eq!(v.verify("a1", &trust()).unwrap().id_dapp.as_str(), "U1");
        assert!(v.verify("a2", &trust()).is_err());
    }
}
