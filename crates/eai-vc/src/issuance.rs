//! # Two-Phase Credential Issuance
//!
//! ```text
//!   prepare_credential ──▶ Prepared (signature Pending) ──▶ signer ──▶ Ready
//!                                                                       │
//!   get_credential ◀── SignatureNotFound while Pending ◀────────────────┘
//! ```
//!
//! **Prepare** verifies the alias, validates the spec, checks the attested
//! fact, builds the unsigned credential JWT and asks the signer for a
//! signature. The JWT is returned as the prepared context. Repeated
//! prepares for the same `(id_alias, spec)` return the same context until
//! it expires. A signature is requested again only when the previous
//! attempt failed and was dropped from the signature map.
//!
//! **Get** re-verifies the alias and spec, checks the echoed context belongs
//! to this subject and spec, re-checks the fact, and then polls the
//! signature map. A fact that stopped holding since prepare is rejected.
//!
//! Nothing here blocks on the signer. Everything the get phase needs is
//! derivable from the context plus the signature map, so a get may land on
//! an instance other than the one that prepared, as long as they share the
//! signature map.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use eai_core::{SharedClock, Timestamp};
use eai_crypto::{signing_input_digest, UnsignedJws};
use eai_state::{Participant, Registry};

use crate::alias::{AliasTuple, IdAliasVerifier, SignedIdAlias};
use crate::catalog::{verify_credential_spec, CredentialSpec, SupportedCredential};
use crate::config::{ConfigManager, IssuerConfig};
use crate::credential::CredentialClaims;
use crate::error::IssueCredentialError;
use crate::signature_map::{SignatureLookup, SignatureMap};
use crate::signer::{CredentialSigner, SigningRequest};

/// Default `iss` of issued credentials.
pub const DEFAULT_ISSUER_URL: &str = "https://attendance.vc";

/// Opaque continuation returned by prepare and echoed back on get.
///
/// Serialized as standard base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedContext(Vec<u8>);

impl PreparedContext {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for PreparedContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for PreparedContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// `prepare_credential` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareCredentialRequest {
    /// Alias issued by the identity provider.
    pub signed_id_alias: SignedIdAlias,
    /// Requested credential.
    pub credential_spec: CredentialSpec,
}

/// `prepare_credential` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedCredentialData {
    /// Continuation to pass to `get_credential`.
    pub prepared_context: Option<PreparedContext>,
}

/// `get_credential` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCredentialRequest {
    /// Alias issued by the identity provider.
    pub signed_id_alias: SignedIdAlias,
    /// Requested credential.
    pub credential_spec: CredentialSpec,
    /// Context returned by `prepare_credential`.
    #[serde(default)]
    pub prepared_context: Option<PreparedContext>,
}

/// `get_credential` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCredentialData {
    /// Signed credential, compact JWS.
    pub vc_jws: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PreparedKey {
    id_alias: String,
    spec: Vec<u8>,
}

#[derive(Debug, Clone)]
struct PreparedEntry {
    context: String,
    signing: SigningRequest,
    expires_at: Timestamp,
}

/// Collaborators of the engine.
#[derive(Debug, Clone)]
pub struct IssuanceDeps {
    /// Issuer configuration.
    pub config: Arc<ConfigManager>,
    /// Registration state the facts are checked against.
    pub registry: Arc<Registry>,
    /// Alias verification capability.
    pub verifier: Arc<dyn IdAliasVerifier>,
    /// Signing backend.
    pub signer: Arc<dyn CredentialSigner>,
    /// Signature store shared with the signer.
    pub signatures: Arc<SignatureMap>,
    /// Time source.
    pub clock: SharedClock,
}

/// The prepare/get credential engine.
#[derive(Debug)]
pub struct IssuanceEngine {
    deps: IssuanceDeps,
    issuer_url: String,
    prepared: DashMap<PreparedKey, PreparedEntry>,
}

impl IssuanceEngine {
    /// Engine issuing credentials with `iss = issuer_url`.
    pub fn new(deps: IssuanceDeps, issuer_url: impl Into<String>) -> Self {
        Self {
            deps,
            issuer_url: issuer_url.into(),
            prepared: DashMap::new(),
        }
    }

    /// `iss` of issued credentials.
    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Signing backend in use.
    pub fn signer(&self) -> &Arc<dyn CredentialSigner> {
        &self.deps.signer
    }

    /// Phase one: check everything and request a signature.
    pub fn prepare_credential(
        &self,
        request: &PrepareCredentialRequest,
    ) -> Result<PreparedCredentialData, IssueCredentialError> {
        let config = self.config()?;
        let alias = self.authorize(&request.signed_id_alias, &config)?;
        let credential = verify_credential_spec(&request.credential_spec)?;
        self.check_fact(&alias, &credential)?;

        let now = self.deps.clock.timestamp();
        self.prune(now);

        let key = PreparedKey {
            id_alias: alias.id_alias.clone(),
            spec: request.credential_spec.canonical_bytes()?.as_bytes().to_vec(),
        };
        let context = match self.prepared.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                let prepared = entry.get();
                if self.request_signature(&prepared.signing, prepared.expires_at)? {
                    info!(subject = %alias.id_dapp, "signature re-requested after signer failure");
                }
                prepared.context.clone()
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let entry = self.build_prepared(&alias, &credential)?;
                self.request_signature(&entry.signing, entry.expires_at)?;
                slot.insert(entry.clone());
                info!(
                    subject = %alias.id_dapp,
                    credential_type = credential.credential_type(),
                    signer = self.deps.signer.mode(),
                    "credential prepared"
                );
                entry.context
            }
        };

        Ok(PreparedCredentialData {
            prepared_context: Some(PreparedContext::from_bytes(context.into_bytes())),
        })
    }

    /// Phase two: return the signed credential once the signature exists.
    pub fn get_credential(
        &self,
        request: &GetCredentialRequest,
    ) -> Result<IssuedCredentialData, IssueCredentialError> {
        let config = self.config()?;
        let alias = self.authorize(&request.signed_id_alias, &config)?;
        let credential = verify_credential_spec(&request.credential_spec)?;

        let context = request
            .prepared_context
            .as_ref()
            .ok_or_else(|| IssueCredentialError::Internal("missing prepared_context".to_string()))?;
        let jwt = std::str::from_utf8(context.as_bytes())
            .map_err(|_| invalid_context())?;
        let unsigned = UnsignedJws::parse(jwt).map_err(|_| invalid_context())?;
        let claims: CredentialClaims = unsigned.claims_as().map_err(|_| invalid_context())?;

        if claims.sub != alias.id_alias {
            warn!(subject = %alias.id_dapp, "prepared_context belongs to another subject");
            return Err(IssueCredentialError::UnauthorizedSubject(
                "prepared_context was not issued to this subject".to_string(),
            ));
        }
        if !claims.attests(&credential) {
            warn!(subject = %alias.id_dapp, "prepared_context attests a different credential");
            return Err(IssueCredentialError::UnauthorizedSubject(
                "prepared_context does not match credential_spec".to_string(),
            ));
        }

        self.check_fact(&alias, &credential)?;

        let now = self.deps.clock.timestamp();
        let digest = signing_input_digest(unsigned.signing_input());
        match self.deps.signatures.get(&digest, now) {
            SignatureLookup::Ready(signature) => {
                info!(
                    subject = %alias.id_dapp,
                    credential_type = credential.credential_type(),
                    "credential issued"
                );
                Ok(IssuedCredentialData {
                    vc_jws: unsigned.attach_signature(&signature),
                })
            }
            SignatureLookup::Pending => {
                warn!(subject = %alias.id_dapp, "signature pending");
                Err(IssueCredentialError::SignatureNotFound(
                    "signature not prepared yet".to_string(),
                ))
            }
            SignatureLookup::Missing => {
                warn!(subject = %alias.id_dapp, "signature missing or expired");
                Err(IssueCredentialError::SignatureNotFound(
                    "signature not prepared or expired".to_string(),
                ))
            }
        }
    }

    fn config(&self) -> Result<Arc<IssuerConfig>, IssueCredentialError> {
        self.deps
            .config
            .snapshot()
            .ok_or_else(|| IssueCredentialError::Internal("issuer is not configured".to_string()))
    }

    fn authorize(
        &self,
        alias: &SignedIdAlias,
        config: &IssuerConfig,
    ) -> Result<AliasTuple, IssueCredentialError> {
        self.deps
            .verifier
            .verify(&alias.credential_jws, config)
            .map_err(|e| {
                warn!(error = %e, "id alias rejected");
                IssueCredentialError::InvalidIdAlias("id alias could not be verified".to_string())
            })
    }

    fn check_fact(
        &self,
        alias: &AliasTuple,
        credential: &SupportedCredential,
    ) -> Result<(), IssueCredentialError> {
        let subject = &alias.id_dapp;
        let Some(participant) = self.deps.registry.participant(subject) else {
            warn!(subject = %subject, "credential requested by unregistered subject");
            return Err(IssueCredentialError::UnknownSubject(format!(
                "unregistered subject {subject}"
            )));
        };
        if fact_holds(&participant, credential) {
            Ok(())
        } else {
            warn!(
                subject = %subject,
                credential_type = credential.credential_type(),
                "attested fact does not hold"
            );
            Err(IssueCredentialError::UnauthorizedSubject(match credential {
                SupportedCredential::EarlyAdopter { since_year } => {
                    format!("subject {subject} did not join by the end of {since_year}")
                }
                SupportedCredential::EventAttendance { event_name } => {
                    format!("subject {subject} has not attended event {event_name}")
                }
            }))
        }
    }

    fn build_prepared(
        &self,
        alias: &AliasTuple,
        credential: &SupportedCredential,
    ) -> Result<PreparedEntry, IssueCredentialError> {
        let claims = CredentialClaims::new(
            &self.issuer_url,
            &alias.id_alias,
            credential,
            self.deps.clock.now_nanos(),
        );
        let expires_at = Timestamp::from_epoch_secs(claims.exp)
            .map_err(|e| IssueCredentialError::Internal(e.to_string()))?;
        let unsigned = claims
            .to_unsigned_jws(&self.deps.signer.key_id())
            .map_err(|e| IssueCredentialError::Internal(format!("credential encoding: {e}")))?;

        let input = unsigned.signing_input().clone();
        Ok(PreparedEntry {
            context: unsigned.as_str().to_string(),
            signing: SigningRequest {
                digest: signing_input_digest(&input),
                input,
            },
            expires_at,
        })
    }

    /// Hand `signing` to the signer unless the map already tracks it.
    /// Returns whether a new request was submitted.
    fn request_signature(
        &self,
        signing: &SigningRequest,
        expires_at: Timestamp,
    ) -> Result<bool, IssueCredentialError> {
        if !self.deps.signatures.request(signing.digest, expires_at) {
            return Ok(false);
        }
        self.deps.signer.submit(signing.clone()).map_err(|e| {
            self.deps.signatures.abandon(&signing.digest);
            IssueCredentialError::Internal(format!("signer unavailable: {e}"))
        })?;
        Ok(true)
    }

    fn prune(&self, now: Timestamp) {
        self.deps.signatures.prune(now);
        self.prepared.retain(|_, entry| entry.expires_at > now);
    }
}

fn invalid_context() -> IssueCredentialError {
    IssueCredentialError::Internal("invalid prepared_context".to_string())
}

/// Whether `participant` satisfies `credential`.
pub fn fact_holds(participant: &Participant, credential: &SupportedCredential) -> bool {
    match credential {
        SupportedCredential::EarlyAdopter { since_year } => match Timestamp::end_of_year(*since_year) {
            Some(end) => participant.joined_at < end,
            None => true,
        },
        SupportedCredential::EventAttendance { event_name } => participant.attended(event_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::StaticAliasVerifier;
    use crate::signer::{DeferredSigner, InlineSigner};
    use eai_core::{ManualClock, SubjectId};
    use eai_crypto::{
        CryptoError, Ed25519PublicKey, Ed25519Signature, JwsSigningInput, KeyProvider,
        LocalKeyProvider,
    };
    use eai_state::EventData;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ORIGIN: &str = "https://issuer.example";

    /// Key whose first signature attempt fails.
    struct FailsOnce {
        inner: LocalKeyProvider,
        failed: AtomicBool,
    }

    impl KeyProvider for FailsOnce {
        fn sign(&self, input: &JwsSigningInput) -> Result<Ed25519Signature, CryptoError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(CryptoError::SignerUnavailable("transient".into()));
            }
            self.inner.sign(input)
        }

        fn public_key(&self) -> Ed25519PublicKey {
            self.inner.public_key()
        }

        fn provider_name(&self) -> &str {
            "FailsOnce"
        }
    }

    fn fails_once() -> Arc<dyn KeyProvider> {
        Arc::new(FailsOnce {
            inner: LocalKeyProvider::generate(),
            failed: AtomicBool::new(false),
        })
    }

    struct Harness {
        engine: IssuanceEngine,
        registry: Arc<Registry>,
        clock: Arc<ManualClock>,
        config: Arc<ConfigManager>,
    }

    fn config() -> IssuerConfig {
        IssuerConfig {
            derivation_origin: ORIGIN.into(),
            idp_ids: vec!["idp-1".into()],
            idp_root_key: LocalKeyProvider::from_seed(&[1u8; 32]).public_key(),
            frontend_hostname: "issuer.example".into(),
            alternative_frontend_hostnames: vec![],
        }
    }

    fn harness_with(signer: impl FnOnce(Arc<SignatureMap>) -> Arc<dyn CredentialSigner>) -> Harness {
        let clock = Arc::new(ManualClock::at("2024-06-01T00:00:00Z").unwrap());
        let registry = Arc::new(Registry::new(clock.clone()));
        let config = Arc::new(ConfigManager::with_config(config()).unwrap());
        let signatures = Arc::new(SignatureMap::new());
        let verifier = StaticAliasVerifier::new()
            .with_alias("alias-u1", "pseudo-u1", "U1", ORIGIN)
            .with_alias("alias-u2", "pseudo-u2", "U2", ORIGIN)
            .with_alias("alias-elsewhere", "pseudo-u1", "U1", "https://other.example");
        let deps = IssuanceDeps {
            config: config.clone(),
            registry: registry.clone(),
            verifier: Arc::new(verifier),
            signer: signer(signatures.clone()),
            signatures,
            clock: clock.clone(),
        };
        Harness {
            engine: IssuanceEngine::new(deps, DEFAULT_ISSUER_URL),
            registry,
            clock,
            config,
        }
    }

    fn harness() -> Harness {
        harness_with(|map| Arc::new(InlineSigner::new(Arc::new(LocalKeyProvider::generate()), map)))
    }

    fn prepare(alias: &str, spec: CredentialSpec) -> PrepareCredentialRequest {
        PrepareCredentialRequest {
            signed_id_alias: SignedIdAlias {
                credential_jws: alias.into(),
            },
            credential_spec: spec,
        }
    }

    fn get(alias: &str, spec: CredentialSpec, ctx: Option<PreparedContext>) -> GetCredentialRequest {
        GetCredentialRequest {
            signed_id_alias: SignedIdAlias {
                credential_jws: alias.into(),
            },
            credential_spec: spec,
            prepared_context: ctx,
        }
    }

    fn register(h: &Harness, subject: &str, event: Option<(&str, &str)>) {
        h.registry
            .register(
                &SubjectId::new(subject).unwrap(),
                event.map(|(n, c)| EventData {
                    event_name: n.into(),
                    registration_code: c.into(),
                }),
            )
            .unwrap();
    }

    #[test]
    fn unregistered_subject_is_unknown() {
        let h = harness();
        let err = h
            .engine
            .prepare_credential(&prepare("alias-u1", CredentialSpec::early_adopter(2024)))
            .unwrap_err();
        assert!(matches!(err, IssueCredentialError::UnknownSubject(_)));
    }

    #[test]
    fn prepare_then_get_issues() {
        let h = harness();
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        let prepared = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        let issued = h
            .engine
            .get_credential(&get("alias-u1", spec, prepared.prepared_context))
            .unwrap();
        assert_eq!(issued.vc_jws.matches('.').count(), 2);
    }

    #[test]
    fn prepare_is_idempotent() {
        let h = harness();
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        let a = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        h.clock.advance(std::time::Duration::from_secs(5));
        let b = h.engine.prepare_credential(&prepare("alias-u1", spec)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn joined_after_since_year_is_unauthorized() {
        let h = harness();
        h.clock.set_epoch_secs(Timestamp::parse("2025-02-01T00:00:00Z").unwrap().epoch_secs());
        register(&h, "U1", None);
        let err = h
            .engine
            .prepare_credential(&prepare("alias-u1", CredentialSpec::early_adopter(2024)))
            .unwrap_err();
        assert!(matches!(err, IssueCredentialError::UnauthorizedSubject(_)));
        assert!(h
            .engine
            .prepare_credential(&prepare("alias-u1", CredentialSpec::early_adopter(2025)))
            .is_ok());
    }

    #[test]
    fn event_attendance_requires_join() {
        let h = harness();
        h.registry.add_event("launch", Some("ABC123")).unwrap();
        register(&h, "U1", None);
        let spec = CredentialSpec::event_attendance("launch");
        assert!(matches!(
            h.engine.prepare_credential(&prepare("alias-u1", spec.clone())),
            Err(IssueCredentialError::UnauthorizedSubject(_))
        ));
        register(&h, "U1", Some(("launch", "ABC123")));
        assert!(h.engine.prepare_credential(&prepare("alias-u1", spec)).is_ok());
    }

    #[test]
    fn unsupported_spec_rejected() {
        let h = harness();
        register(&h, "U1", None);
        let spec = CredentialSpec {
            credential_type: "Other".into(),
            arguments: None,
        };
        assert!(matches!(
            h.engine.prepare_credential(&prepare("alias-u1", spec)),
            Err(IssueCredentialError::UnsupportedCredentialSpec(_))
        ));
    }

    #[test]
    fn alias_for_other_origin_is_invalid() {
        let h = harness();
        register(&h, "U1", None);
        let err = h
            .engine
            .prepare_credential(&prepare("alias-elsewhere", CredentialSpec::early_adopter(2024)))
            .unwrap_err();
        assert_eq!(
            err,
            IssueCredentialError::InvalidIdAlias("id alias could not be verified".into())
        );
    }

    #[test]
    fn unconfigured_is_internal() {
        let h = harness();
        let fresh = IssuanceEngine::new(
            IssuanceDeps {
                config: Arc::new(ConfigManager::new()),
                ..h.engine.deps.clone()
            },
            DEFAULT_ISSUER_URL,
        );
        assert!(h.config.is_configured());
        assert!(matches!(
            fresh.prepare_credential(&prepare("alias-u1", CredentialSpec::early_adopter(2024))),
            Err(IssueCredentialError::Internal(_))
        ));
    }

    #[test]
    fn missing_and_invalid_context() {
        let h = harness();
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        assert_eq!(
            h.engine.get_credential(&get("alias-u1", spec.clone(), None)).unwrap_err(),
            IssueCredentialError::Internal("missing prepared_context".into())
        );
        assert_eq!(
            h.engine
                .get_credential(&get(
                    "alias-u1",
                    spec.clone(),
                    Some(PreparedContext::from_bytes(vec![0xff, 0xfe]))
                ))
                .unwrap_err(),
            IssueCredentialError::Internal("invalid prepared_context".into())
        );
        assert_eq!(
            h.engine
                .get_credential(&get(
                    "alias-u1",
                    spec,
                    Some(PreparedContext::from_bytes(b"not.a-jwt".to_vec()))
                ))
                .unwrap_err(),
            IssueCredentialError::Internal("invalid prepared_context".into())
        );
    }

    #[test]
    fn context_of_other_subject_rejected() {
        let h = harness();
        register(&h, "U1", None);
        register(&h, "U2", None);
        let spec = CredentialSpec::early_adopter(2024);
        let prepared = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        assert!(matches!(
            h.engine.get_credential(&get("alias-u2", spec, prepared.prepared_context)),
            Err(IssueCredentialError::UnauthorizedSubject(_))
        ));
    }

    #[test]
    fn context_for_other_spec_rejected() {
        let h = harness();
        register(&h, "U1", None);
        let prepared = h
            .engine
            .prepare_credential(&prepare("alias-u1", CredentialSpec::early_adopter(2024)))
            .unwrap();
        assert!(matches!(
            h.engine.get_credential(&get(
                "alias-u1",
                CredentialSpec::early_adopter(2025),
                prepared.prepared_context
            )),
            Err(IssueCredentialError::UnauthorizedSubject(_))
        ));
    }

    #[test]
    fn deferred_signature_is_retryable_then_issued() {
        let provider: Arc<dyn KeyProvider> = Arc::new(LocalKeyProvider::generate());
        let deferred = std::sync::OnceLock::new();
        let h = harness_with(|map| {
            let signer = Arc::new(DeferredSigner::new(provider.clone(), map));
            let _ = deferred.set(signer.clone());
            signer
        });
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        let prepared = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        let request = get("alias-u1", spec, prepared.prepared_context);

        let err = h.engine.get_credential(&request).unwrap_err();
        assert!(err.is_retryable());

        deferred.get().unwrap().release().unwrap();
        let first = h.engine.get_credential(&request).unwrap();
        let second = h.engine.get_credential(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn prepare_after_signer_failure_requests_signature_again() {
        let provider = fails_once();
        let deferred = std::sync::OnceLock::new();
        let h = harness_with(|map| {
            let signer = Arc::new(DeferredSigner::new(provider.clone(), map));
            let _ = deferred.set(signer.clone());
            signer
        });
        let signer = deferred.get().unwrap();
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        let prepared = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        let request = get("alias-u1", spec.clone(), prepared.prepared_context.clone());

        assert!(signer.release().is_err());
        assert!(h.engine.get_credential(&request).unwrap_err().is_retryable());

        h.clock.advance(std::time::Duration::from_secs(60));
        let again = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        assert_eq!(again, prepared);
        assert_eq!(signer.pending(), 1);

        assert_eq!(signer.release().unwrap(), 1);
        assert!(h.engine.get_credential(&request).is_ok());

        h.engine.prepare_credential(&prepare("alias-u1", spec)).unwrap();
        assert_eq!(signer.pending(), 0);
    }

    #[test]
    fn inline_signer_failure_surfaces_then_recovers() {
        let provider = fails_once();
        let h = harness_with(|map| Arc::new(InlineSigner::new(provider.clone(), map)));
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        assert!(matches!(
            h.engine.prepare_credential(&prepare("alias-u1", spec.clone())),
            Err(IssueCredentialError::Internal(_))
        ));
        let prepared = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        assert!(h
            .engine
            .get_credential(&get("alias-u1", spec, prepared.prepared_context))
            .is_ok());
    }

    #[test]
    fn expired_context_needs_new_prepare() {
        let h = harness();
        register(&h, "U1", None);
        let spec = CredentialSpec::early_adopter(2024);
        let prepared = h.engine.prepare_credential(&prepare("alias-u1", spec.clone())).unwrap();
        h.clock.advance(std::time::Duration::from_secs(15 * 60));
        assert!(matches!(
            h.engine
                .get_credential(&get("alias-u1", spec.clone(), prepared.prepared_context.clone())),
            Err(IssueCredentialError::SignatureNotFound(_))
        ));
        let renewed = h.engine.prepare_credential(&prepare("alias-u1", spec)).unwrap();
        assert_ne!(renewed, prepared);
    }

    #[test]
    fn prepared_context_serializes_as_base64() {
        let ctx = PreparedContext::from_bytes(b"abc".to_vec());
        assert_eq!(serde_json::to_value(&ctx).unwrap(), serde_json::json!("YWJj"));
        let back: PreparedContext = serde_json::from_str("\"YWJj\"").unwrap();
        assert_eq!(back, ctx);
    }
}
