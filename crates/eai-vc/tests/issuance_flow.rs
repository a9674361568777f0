//! # End-to-End Issuance Tests
//!
//! Drives the registry and the issuance engine together with real signed
//! id aliases: an identity-provider key mints aliases, the JWS verifier
//! checks them, and issued credentials are verified against the issuer key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eai_core::{Clock, ManualClock, SharedClock, SubjectId, Timestamp};
use eai_crypto::{
    CryptoError, Ed25519PublicKey, Ed25519Signature, JwsSigningInput, KeyProvider,
    LocalKeyProvider,
};
use eai_state::{EventData, Registry};
use eai_vc::{
    mint_id_alias, verify_credential_jws, AliasGrant, ConfigManager, CredentialSigner, CredentialSpec,
    DeferredSigner, GetCredentialRequest, InlineSigner, IssuanceDeps, IssuanceEngine,
    IssueCredentialError, IssuerConfig, JwsIdAliasVerifier, PrepareCredentialRequest,
    SignatureMap, SignedIdAlias, DEFAULT_ISSUER_URL,
};

const ORIGIN: &str = "https://issuer.example";
const IDP: &str = "https://idp.example";

struct World {
    clock: Arc<ManualClock>,
    idp: LocalKeyProvider,
    issuer: Arc<LocalKeyProvider>,
    registry: Arc<Registry>,
    engine: IssuanceEngine,
    deferred: Option<Arc<DeferredSigner>>,
}

/// Issuer key behind a signing backend whose first attempt fails.
struct FlakySigningKey {
    key: Arc<LocalKeyProvider>,
    failed: AtomicBool,
}

impl KeyProvider for FlakySigningKey {
    fn sign(&self, input: &JwsSigningInput) -> Result<Ed25519Signature, CryptoError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(CryptoError::SignerUnavailable("signing backend unreachable".into()));
        }
        self.key.sign(input)
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.key.public_key()
    }

    fn provider_name(&self) -> &str {
        "FlakySigningKey"
    }
}

fn world(deferred: bool) -> World {
    world_with_backend(deferred, |key| key as Arc<dyn KeyProvider>)
}

fn world_with_backend(
    deferred: bool,
    backend: impl FnOnce(Arc<LocalKeyProvider>) -> Arc<dyn KeyProvider>,
) -> World {
    let clock = Arc::new(ManualClock::at("2024-03-01T12:00:00Z").unwrap());
    let shared: SharedClock = clock.clone();
    let idp = LocalKeyProvider::from_seed(&[7u8; 32]);
    let issuer = Arc::new(LocalKeyProvider::from_seed(&[9u8; 32]));
    let config = IssuerConfig {
        derivation_origin: ORIGIN.into(),
        idp_ids: vec![IDP.into()],
        idp_root_key: idp.public_key(),
        frontend_hostname: "issuer.example".into(),
        alternative_frontend_hostnames: vec![],
    };
    let registry = Arc::new(Registry::new(shared.clone()));
    let signatures = Arc::new(SignatureMap::new());
    let provider = backend(issuer.clone());
    let mut held = None;
    let signer: Arc<dyn CredentialSigner> = if deferred {
        let d = Arc::new(DeferredSigner::new(provider, signatures.clone()));
        held = Some(d.clone());
        d
    } else {
        Arc::new(InlineSigner::new(provider, signatures.clone()))
    };
    let engine = IssuanceEngine::new(
        IssuanceDeps {
            config: Arc::new(ConfigManager::with_config(config).unwrap()),
            registry: registry.clone(),
            verifier: Arc::new(JwsIdAliasVerifier::new(shared.clone())),
            signer,
            signatures,
            clock: shared,
        },
        DEFAULT_ISSUER_URL,
    );
    World {
        clock,
        idp,
        issuer,
        registry,
        engine,
        deferred: held,
    }
}

impl World {
    fn alias(&self, subject: &str, audience: &str) -> SignedIdAlias {
        let now = self.clock.timestamp().epoch_secs();
        let jws = mint_id_alias(
            &AliasGrant {
                idp_id: IDP.into(),
                id_dapp: subject.into(),
                id_alias: format!("alias-of-{subject}"),
                audience: audience.into(),
                not_before: now,
                expires_at: now + 3600,
            },
            &self.idp,
        )
        .unwrap();
        SignedIdAlias {
            credential_jws: jws,
        }
    }

    fn prepare(&self, alias: &SignedIdAlias, spec: &CredentialSpec) -> PrepareCredentialRequest {
        PrepareCredentialRequest {
            signed_id_alias: alias.clone(),
            credential_spec: spec.clone(),
        }
    }
}

#[test]
fn launch_attendance_end_to_end() {
    let w = world(false);
    w.registry.add_event("launch", Some("ABC123")).unwrap();
    let u1 = SubjectId::new("U1").unwrap();
    let participant = w
        .registry
        .register(
            &u1,
            Some(EventData {
                event_name: "launch".into(),
                registration_code: "ABC123".into(),
            }),
        )
        .unwrap();
    assert_eq!(participant.joined_events().len(), 1);

    let alias = w.alias("U1", ORIGIN);
    let spec = CredentialSpec::event_attendance("launch");
    let prepared = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    let issued = w
        .engine
        .get_credential(&GetCredentialRequest {
            signed_id_alias: alias,
            credential_spec: spec.clone(),
            prepared_context: prepared.prepared_context,
        })
        .unwrap();

    let claims = verify_credential_jws(
        &issued.vc_jws,
        &w.issuer.public_key(),
        DEFAULT_ISSUER_URL,
        Some(&spec),
        w.clock.timestamp(),
    )
    .unwrap();
    assert_eq!(claims.sub, "alias-of-U1");
    assert_eq!(claims.exp - claims.nbf, 900);
}

#[test]
fn early_adopter_for_registered_subject() {
    let w = world(false);
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let alias = w.alias("U1", ORIGIN);
    let spec = CredentialSpec::early_adopter(2024);
    let prepared = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    let issued = w
        .engine
        .get_credential(&GetCredentialRequest {
            signed_id_alias: alias,
            credential_spec: spec,
            prepared_context: prepared.prepared_context,
        })
        .unwrap();
    assert!(!issued.vc_jws.is_empty());
}

#[test]
fn unregistered_subject_is_unknown() {
    let w = world(false);
    let alias = w.alias("U9", ORIGIN);
    let err = w
        .engine
        .prepare_credential(&w.prepare(&alias, &CredentialSpec::early_adopter(2024)))
        .unwrap_err();
    assert!(matches!(err, IssueCredentialError::UnknownSubject(_)));
}

#[test]
fn alias_for_other_origin_is_rejected() {
    let w = world(false);
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let alias = w.alias("U1", "https://elsewhere.example");
    let err = w
        .engine
        .prepare_credential(&w.prepare(&alias, &CredentialSpec::early_adopter(2024)))
        .unwrap_err();
    assert!(matches!(err, IssueCredentialError::InvalidIdAlias(_)));
}

#[test]
fn alias_signed_by_unknown_key_is_rejected() {
    let w = world(false);
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let now = w.clock.timestamp().epoch_secs();
    let forged = mint_id_alias(
        &AliasGrant {
            idp_id: IDP.into(),
            id_dapp: "U1".into(),
            id_alias: "alias-of-U1".into(),
            audience: ORIGIN.into(),
            not_before: now,
            expires_at: now + 60,
        },
        &LocalKeyProvider::generate(),
    )
    .unwrap();
    let err = w
        .engine
        .prepare_credential(&PrepareCredentialRequest {
            signed_id_alias: SignedIdAlias {
                credential_jws: forged,
            },
            credential_spec: CredentialSpec::early_adopter(2024),
        })
        .unwrap_err();
    assert!(matches!(err, IssueCredentialError::InvalidIdAlias(_)));
}

#[test]
fn pending_signature_then_issued() {
    let w = world(true);
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let alias = w.alias("U1", ORIGIN);
    let spec = CredentialSpec::early_adopter(2024);
    let prepared = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    let again = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    assert_eq!(prepared, again);

    let deferred = w.deferred.as_ref().unwrap();
    assert_eq!(deferred.pending(), 1);

    let get = GetCredentialRequest {
        signed_id_alias: alias,
        credential_spec: spec,
        prepared_context: prepared.prepared_context,
    };
    match w.engine.get_credential(&get) {
        Err(e @ IssueCredentialError::SignatureNotFound(_)) => assert!(e.is_retryable()),
        other => panic!("expected SignatureNotFound, got {other:?}"),
    }

    assert_eq!(deferred.release().unwrap(), 1);
    assert!(w.engine.get_credential(&get).is_ok());
}

#[test]
fn signer_failure_recovers_on_next_prepare() {
    let w = world_with_backend(true, |key| {
        Arc::new(FlakySigningKey {
            key,
            failed: AtomicBool::new(false),
        })
    });
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let alias = w.alias("U1", ORIGIN);
    let spec = CredentialSpec::early_adopter(2024);
    let prepared = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    let deferred = w.deferred.as_ref().unwrap();
    assert!(deferred.release().is_err());

    let get = GetCredentialRequest {
        signed_id_alias: alias.clone(),
        credential_spec: spec.clone(),
        prepared_context: prepared.prepared_context.clone(),
    };
    assert!(w.engine.get_credential(&get).unwrap_err().is_retryable());

    w.clock.advance(Duration::from_secs(60));
    let retried = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    assert_eq!(retried, prepared);
    assert_eq!(deferred.release().unwrap(), 1);

    for _ in 0..3 {
        w.clock.advance(Duration::from_secs(60));
        let issued = w.engine.get_credential(&get).unwrap();
        verify_credential_jws(
            &issued.vc_jws,
            &w.issuer.public_key(),
            DEFAULT_ISSUER_URL,
            Some(&spec),
            w.clock.timestamp(),
        )
        .unwrap();
    }
}

#[test]
fn attendance_requires_joining_the_event() {
    let w = world(false);
    w.registry.add_event("launch", Some("ABC123")).unwrap();
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let alias = w.alias("U1", ORIGIN);
    let spec = CredentialSpec::event_attendance("launch");
    assert!(matches!(
        w.engine.prepare_credential(&w.prepare(&alias, &spec)),
        Err(IssueCredentialError::UnauthorizedSubject(_))
    ));
}

#[test]
fn credential_expires_after_validity_window() {
    let w = world(false);
    w.registry.register(&SubjectId::new("U1").unwrap(), None).unwrap();
    let alias = w.alias("U1", ORIGIN);
    let spec = CredentialSpec::early_adopter(2024);
    let prepared = w.engine.prepare_credential(&w.prepare(&alias, &spec)).unwrap();
    let issued = w
        .engine
        .get_credential(&GetCredentialRequest {
            signed_id_alias: alias,
            credential_spec: spec,
            prepared_context: prepared.prepared_context,
        })
        .unwrap();

    w.clock.advance(Duration::from_secs(15 * 60));
    let later: Timestamp = w.clock.timestamp();
    assert!(verify_credential_jws(
        &issued.vc_jws,
        &w.issuer.public_key(),
        DEFAULT_ISSUER_URL,
        None,
        later
    )
    .is_err());
}
