//! # Issued Credential Format
//!
//! Credentials are JWT-VCs signed as compact EdDSA JWS:
//!
//! ```json
//! {
//!   "iss": "https://attendance.vc",
//!   "sub": "<id_alias>",
//!   "jti": "data:text/plain;charset=UTF-8,issuer:...,timestamp_ns:...,subject:...",
//!   "nbf": 1720000000,
//!   "exp": 1720000900,
//!   "vc": {
//!     "@context": "https://www.w3.org/2018/credentials/v1",
//!     "type": ["VerifiableCredential", "EarlyAdopter"],
//!     "credentialSubject": { "id": "<id_alias>", "EarlyAdopter": { "sinceYear": 2024 } }
//!   }
//! }
//! ```
//!
//! The unsigned JWT doubles as the prepared context handed back by
//! `prepare_credential`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eai_core::Timestamp;
use eai_crypto::{CompactJws, CryptoError, Ed25519PublicKey, JwsHeader, UnsignedJws};

use crate::catalog::{verify_credential_spec, ArgumentValue, CredentialSpec, SupportedCredential};

/// Lifetime of an issued credential.
pub const CREDENTIAL_VALIDITY: Duration = Duration::from_secs(15 * 60);
/// W3C credentials context.
pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Base VC type.
pub const VC_BASE_TYPE: &str = "VerifiableCredential";
/// Prefix of the `jti` data URL.
pub const CREDENTIAL_URL_PREFIX: &str = "data:text/plain;charset=UTF-8,";

/// Claims of an issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Issuer URL.
    pub iss: String,
    /// Credential subject (the id alias).
    pub sub: String,
    /// Unique credential id.
    pub jti: String,
    /// Not valid before, Unix seconds.
    pub nbf: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// VC body.
    pub vc: VcBody,
}

/// `vc` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcBody {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: String,
    /// `["VerifiableCredential", <credential type>]`.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Subject id plus `{ <credential type>: { args } }`.
    pub credential_subject: BTreeMap<String, serde_json::Value>,
}

impl CredentialClaims {
    /// Build claims for `credential` issued to `id_alias` at `now_nanos`.
    pub fn new(
        issuer_url: &str,
        id_alias: &str,
        credential: &SupportedCredential,
        now_nanos: i64,
    ) -> Self {
        let now_secs = now_nanos.div_euclid(1_000_000_000);
        let credential_type = credential.credential_type();
        let mut subject = BTreeMap::new();
        subject.insert("id".to_string(), serde_json::Value::String(id_alias.to_string()));
        let arguments = credential
            .arguments()
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::from(value)))
            .collect::<serde_json::Map<_, _>>();
        subject.insert(credential_type.to_string(), serde_json::Value::Object(arguments));
        Self {
            iss: issuer_url.to_string(),
            sub: id_alias.to_string(),
            jti: credential_id(issuer_url, now_nanos, id_alias),
            nbf: now_secs,
            exp: now_secs.saturating_add(CREDENTIAL_VALIDITY.as_secs() as i64),
            vc: VcBody {
                context: VC_CONTEXT.to_string(),
                types: vec![VC_BASE_TYPE.to_string(), credential_type.to_string()],
                credential_subject: subject,
            },
        }
    }

    /// Reconstruct the credential spec these claims attest.
    pub fn credential_spec(&self) -> Option<CredentialSpec> {
        let [base, credential_type] = self.vc.types.as_slice() else {
            return None;
        };
        if base != VC_BASE_TYPE {
            return None;
        }
        let args = self.vc.credential_subject.get(credential_type)?;
        let arguments: BTreeMap<String, ArgumentValue> = serde_json::from_value(args.clone()).ok()?;
        Some(CredentialSpec {
            credential_type: credential_type.clone(),
            arguments: Some(arguments),
        })
    }

    /// Whether these claims attest exactly `credential`.
    pub fn attests(&self, credential: &SupportedCredential) -> bool {
        self.credential_spec()
            .and_then(|spec| verify_credential_spec(&spec).ok())
            .is_some_and(|c| c == *credential)
    }

    /// Sign-ready JWT with `kid` set to the issuer key id.
    pub fn to_unsigned_jws(&self, key_id: &str) -> Result<UnsignedJws, CryptoError> {
        UnsignedJws::new(&JwsHeader::eddsa(key_id), self)
    }
}

/// `data:` URL identifying one issuance.
pub fn credential_id(issuer_url: &str, timestamp_ns: i64, subject: &str) -> String {
    format!("{CREDENTIAL_URL_PREFIX}issuer:{issuer_url},timestamp_ns:{timestamp_ns},subject:{subject}")
}

/// Why an issued credential failed verification.
#[derive(Error, Debug)]
pub enum CredentialVerificationError {
    /// JWS malformed or signature invalid.
    #[error("credential signature invalid: {0}")]
    Signature(#[from] CryptoError),
    /// `kid` does not name the expected issuer key.
    #[error("credential signed by unexpected key {0}")]
    UnexpectedKey(String),
    /// `iss` differs from the expected issuer URL.
    #[error("credential issued by {found}, expected {expected}")]
    UnexpectedIssuer {
        /// Expected issuer URL.
        expected: String,
        /// `iss` claim.
        found: String,
    },
    /// Outside its `nbf`/`exp` window.
    #[error("credential not valid at {0}")]
    NotValidAt(Timestamp),
    /// Attests a different credential than the one expected.
    #[error("credential does not attest {0}")]
    SpecMismatch(String),
}

/// Verify an issued credential JWS.
///
/// Checks the signature against `issuer_key`, the `kid`, the `iss` claim,
/// the validity window at `now`, and, when given, that the credential
/// attests `expected_spec`.
pub fn verify_credential_jws(
    vc_jws: &str,
    issuer_key: &Ed25519PublicKey,
    issuer_url: &str,
    expected_spec: Option<&CredentialSpec>,
    now: Timestamp,
) -> Result<CredentialClaims, CredentialVerificationError> {
    let jws = CompactJws::parse(vc_jws)?;
    if jws.header().kid != issuer_key.to_hex() {
        return Err(CredentialVerificationError::UnexpectedKey(jws.header().kid.clone()));
    }
    jws.verify(issuer_key)?;
    let claims: CredentialClaims = jws.claims_as()?;
    if claims.iss != issuer_url {
        return Err(CredentialVerificationError::UnexpectedIssuer {
            expected: issuer_url.to_string(),
            found: claims.iss,
        });
    }
    let secs = now.epoch_secs();
    if secs < claims.nbf || secs >= claims.exp {
        return Err(CredentialVerificationError::NotValidAt(now));
    }
    if let Some(spec) = expected_spec {
        let expected = verify_credential_spec(spec)
            .map_err(|e| CredentialVerificationError::SpecMismatch(e.message().to_string()))?;
        if !claims.attests(&expected) {
            return Err(CredentialVerificationError::SpecMismatch(
                spec.credential_type.clone(),
            ));
        }
    }
    Ok(claims)
}
