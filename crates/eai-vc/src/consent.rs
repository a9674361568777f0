//! # ICRC-21 Consent Messages
//!
//! Human-readable text describing what a credential request attests, shown
//! before the user releases identity data. A pure function of the
//! credential spec and the preferred language; no subject is involved.

use serde::{Deserialize, Serialize};

use crate::catalog::{verify_credential_spec, CredentialSpec, SupportedCredential};
use crate::error::{Icrc21Error, Icrc21ErrorInfo};

/// Caller's display preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icrc21ConsentPreferences {
    /// BCP-47 language tag, e.g. `en-US`.
    pub language: String,
}

/// Consent message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icrc21VcConsentMessageRequest {
    /// Credential being requested.
    pub credential_spec: CredentialSpec,
    /// Display preferences.
    pub preferences: Icrc21ConsentPreferences,
}

/// Rendered consent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icrc21ConsentInfo {
    /// Message text.
    pub consent_message: String,
    /// Language actually used.
    pub language: String,
}

/// Languages with translated messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentLanguage {
    /// English (default).
    En,
    /// German.
    De,
}

impl ConsentLanguage {
    /// Match on the primary subtag, case-insensitively. Falls back to English.
    pub fn negotiate(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        if primary.eq_ignore_ascii_case("de") {
            Self::De
        } else {
            Self::En
        }
    }

    /// Language code reported back to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }

    fn render(&self, credential: &SupportedCredential) -> String {
        match (self, credential) {
            (Self::En, SupportedCredential::EarlyAdopter { since_year }) => {
                format!("You became an early adopter in {since_year}.")
            }
            (Self::De, SupportedCredential::EarlyAdopter { since_year }) => {
                format!("Sie sind seit {since_year} ein Early Adopter.")
            }
            (Self::En, SupportedCredential::EventAttendance { event_name }) => {
                format!("You have attended the event {event_name}.")
            }
            (Self::De, SupportedCredential::EventAttendance { event_name }) => {
                format!("Sie haben an der Veranstaltung {event_name} teilgenommen.")
            }
        }
    }
}

/// Consent message for `spec` in the preferred language.
pub fn vc_consent_message(
    request: &Icrc21VcConsentMessageRequest,
) -> Result<Icrc21ConsentInfo, Icrc21Error> {
    let credential = verify_credential_spec(&request.credential_spec).map_err(|err| {
        Icrc21Error::ConsentMessageUnavailable(Icrc21ErrorInfo {
            description: format!("Credential spec not supported: {}", err.message()),
        })
    })?;
    let language = ConsentLanguage::negotiate(&request.preferences.language);
    Ok(Icrc21ConsentInfo {
        consent_message: language.render(&credential),
        language: language.code().to_string(),
    })
}
