//! # Credential Catalog
//!
//! The issuer supports exactly two credential types:
//!
//! | `credential_type`  | Argument              | Fact attested                                  |
//! |--------------------|-----------------------|------------------------------------------------|
//! | `EarlyAdopter`     | `sinceYear: Int >= 2024` | registered before the end of `sinceYear` (UTC) |
//! | `EventAttendance`  | `eventName: String`   | registered and joined `eventName`              |
//!
//! Any other type, a missing or extra argument, or a wrongly typed value is
//! rejected with `UnsupportedCredentialSpec`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use eai_core::{CanonicalBytes, EventName};

use crate::error::IssueCredentialError;

/// `EarlyAdopter` credential type name.
pub const EARLY_ADOPTER: &str = "EarlyAdopter";
/// `EventAttendance` credential type name.
pub const EVENT_ATTENDANCE: &str = "EventAttendance";
/// Argument of `EarlyAdopter`.
pub const SINCE_YEAR_ARG: &str = "sinceYear";
/// Argument of `EventAttendance`.
pub const EVENT_NAME_ARG: &str = "eventName";
/// Earliest accepted `sinceYear`.
pub const MIN_SINCE_YEAR: i32 = 2024;

/// Value of a credential spec argument.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    /// Integer argument.
    Int(i32),
    /// String argument.
    String(String),
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<ArgumentValue> for serde_json::Value {
    fn from(value: ArgumentValue) -> Self {
        match value {
            ArgumentValue::Int(i) => Self::from(i),
            ArgumentValue::String(s) => Self::String(s),
        }
    }
}

/// Requested credential template and its parameters.
///
/// Arguments are accepted either as an object (`{"sinceYear": 2024}`) or as
/// a list of `[name, value]` pairs (`[["sinceYear", 2024]]`). A name given
/// twice is a parse error. They serialize as an object keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialSpec {
    /// Template name.
    pub credential_type: String,
    /// Named arguments.
    #[serde(
        default,
        deserialize_with = "deserialize_arguments",
        skip_serializing_if = "Option::is_none"
    )]
    pub arguments: Option<BTreeMap<String, ArgumentValue>>,
}

struct Arguments(BTreeMap<String, ArgumentValue>);

struct ArgumentsVisitor;

impl<'de> Visitor<'de> for ArgumentsVisitor {
    type Value = BTreeMap<String, ArgumentValue>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an argument object or a list of [name, value] pairs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut arguments = BTreeMap::new();
        while let Some((name, value)) = map.next_entry::<String, ArgumentValue>()? {
            insert_unique(&mut arguments, name, value)?;
        }
        Ok(arguments)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut arguments = BTreeMap::new();
        while let Some((name, value)) = seq.next_element::<(String, ArgumentValue)>()? {
            insert_unique(&mut arguments, name, value)?;
        }
        Ok(arguments)
    }
}

fn insert_unique<E: de::Error>(
    arguments: &mut BTreeMap<String, ArgumentValue>,
    name: String,
    value: ArgumentValue,
) -> Result<(), E> {
    match arguments.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
        Entry::Occupied(existing) => Err(E::custom(format!(
            "duplicate credential argument {}",
            existing.key()
        ))),
    }
}

impl<'de> Deserialize<'de> for Arguments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ArgumentsVisitor).map(Arguments)
    }
}

fn deserialize_arguments<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, ArgumentValue>>, D::Error> {
    Ok(Option::<Arguments>::deserialize(deserializer)?.map(|a| a.0))
}

impl CredentialSpec {
    /// `EarlyAdopter` spec for `since_year`.
    pub fn early_adopter(since_year: i32) -> Self {
        Self {
            credential_type: EARLY_ADOPTER.to_string(),
            arguments: Some(BTreeMap::from([(
                SINCE_YEAR_ARG.to_string(),
                ArgumentValue::Int(since_year),
            )])),
        }
    }

    /// `EventAttendance` spec for `event_name`.
    pub fn event_attendance(event_name: impl Into<String>) -> Self {
        Self {
            credential_type: EVENT_ATTENDANCE.to_string(),
            arguments: Some(BTreeMap::from([(
                EVENT_NAME_ARG.to_string(),
                ArgumentValue::String(event_name.into()),
            )])),
        }
    }

    /// Canonical bytes, used as part of the prepared-credential cache key.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, IssueCredentialError> {
        CanonicalBytes::new(self)
            .map_err(|e| IssueCredentialError::Internal(format!("credential spec: {e}")))
    }
}

/// A credential spec that passed catalog validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportedCredential {
    /// Registered no later than the end of this year.
    EarlyAdopter {
        /// Year named in the spec.
        since_year: i32,
    },
    /// Joined this event.
    EventAttendance {
        /// Event named in the spec.
        event_name: EventName,
    },
}

impl SupportedCredential {
    /// Type name as it appears in specs and credentials.
    pub fn credential_type(&self) -> &'static str {
        match self {
            Self::EarlyAdopter { .. } => EARLY_ADOPTER,
            Self::EventAttendance { .. } => EVENT_ATTENDANCE,
        }
    }

    /// Arguments as embedded in `credentialSubject`.
    pub fn arguments(&self) -> BTreeMap<String, ArgumentValue> {
        match self {
            Self::EarlyAdopter { since_year } => BTreeMap::from([(
                SINCE_YEAR_ARG.to_string(),
                ArgumentValue::Int(*since_year),
            )]),
            Self::EventAttendance { event_name } => BTreeMap::from([(
                EVENT_NAME_ARG.to_string(),
                ArgumentValue::String(event_name.to_string()),
            )]),
        }
    }
}

/// Validate a spec against the catalog.
pub fn verify_credential_spec(
    spec: &CredentialSpec,
) -> Result<SupportedCredential, IssueCredentialError> {
    match spec.credential_type.as_str() {
        EARLY_ADOPTER => {
            let year = match single_argument(spec, SINCE_YEAR_ARG)? {
                ArgumentValue::Int(year) => *year,
                ArgumentValue::String(_) => return Err(unexpected_value(SINCE_YEAR_ARG)),
            };
            if year < MIN_SINCE_YEAR {
                return Err(IssueCredentialError::UnsupportedCredentialSpec(format!(
                    "Credential spec has unsupported value for {SINCE_YEAR_ARG}-argument"
                )));
            }
            Ok(SupportedCredential::EarlyAdopter { since_year: year })
        }
        EVENT_ATTENDANCE => {
            let name = match single_argument(spec, EVENT_NAME_ARG)? {
                ArgumentValue::String(name) => name,
                ArgumentValue::Int(_) => return Err(unexpected_value(EVENT_NAME_ARG)),
            };
            let event_name = EventName::new(name.as_str())
                .map_err(|e| IssueCredentialError::UnsupportedCredentialSpec(e.to_string()))?;
            Ok(SupportedCredential::EventAttendance { event_name })
        }
        other => Err(IssueCredentialError::UnsupportedCredentialSpec(format!(
            "Credential {other} is not supported"
        ))),
    }
}

fn single_argument<'a>(
    spec: &'a CredentialSpec,
    expected: &str,
) -> Result<&'a ArgumentValue, IssueCredentialError> {
    let Some(arguments) = &spec.arguments else {
        return Err(IssueCredentialError::UnsupportedCredentialSpec(
            "Credential spec has no arguments".to_string(),
        ));
    };
    let Some(value) = arguments.get(expected) else {
        return Err(IssueCredentialError::UnsupportedCredentialSpec(format!(
            "Credential spec has no {expected}-argument"
        )));
    };
    if arguments.len() != 1 {
        return Err(IssueCredentialError::UnsupportedCredentialSpec(
            "Credential spec has unexpected arguments".to_string(),
        ));
    }
    Ok(value)
}

fn unexpected_value(arg: &str) -> IssueCredentialError {
    IssueCredentialError::UnsupportedCredentialSpec(format!(
        "Credential spec has unexpected value for {arg}-argument"
    ))
}
