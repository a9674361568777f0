//! # eai-vc: Credential Issuance
//!
//! Issuing side of the Early Adopter Issuer:
//!
//! - [`catalog`]: the two supported credential types and spec validation.
//! - [`config`]: trust configuration (derivation origin, identity provider
//!   keys, frontend hostnames) and derivation-origin lookup.
//! - [`alias`]: verification of identity-provider-signed id aliases.
//! - [`consent`]: ICRC-21 consent messages.
//! - [`credential`]: JWT-VC claims and verification of issued credentials.
//! - [`issuance`]: the two-phase `prepare_credential` / `get_credential`
//!   engine, backed by a [`SignatureMap`] and a pluggable
//!   [`CredentialSigner`].
//!
//! ## Crate Policy
//!
//! - Facts are read from `eai-state`; this crate never mutates registrations.
//! - No credential is issued without a verified alias and a fact that holds
//!   at both prepare and get time.

pub mod alias;
pub mod catalog;
pub mod config;
pub mod consent;
pub mod credential;
pub mod error;
pub mod issuance;
pub mod signature_map;
pub mod signer;

pub use alias::{
    mint_id_alias, AliasError, AliasGrant, AliasTuple, IdAliasVerifier, JwsIdAliasVerifier,
    SignedIdAlias, StaticAliasVerifier,
};
pub use catalog::{
    verify_credential_spec, ArgumentValue, CredentialSpec, SupportedCredential, EARLY_ADOPTER,
    EVENT_ATTENDANCE, MIN_SINCE_YEAR,
};
pub use config::{ConfigError, ConfigManager, ConfigState, IssuerConfig};
pub use consent::{
    vc_consent_message, ConsentLanguage, Icrc21ConsentInfo, Icrc21ConsentPreferences,
    Icrc21VcConsentMessageRequest,
};
pub use credential::{
    verify_credential_jws, CredentialClaims, CredentialVerificationError, CREDENTIAL_VALIDITY,
};
pub use error::{DerivationOriginError, Icrc21Error, Icrc21ErrorInfo, IssueCredentialError};
pub use issuance::{
    fact_holds, GetCredentialRequest, IssuanceDeps, IssuanceEngine, IssuedCredentialData,
    PrepareCredentialRequest, PreparedContext, PreparedCredentialData, DEFAULT_ISSUER_URL,
};
pub use signature_map::{SignatureLookup, SignatureMap};
pub use signer::{BackgroundSigner, CredentialSigner, DeferredSigner, InlineSigner, SigningRequest};
