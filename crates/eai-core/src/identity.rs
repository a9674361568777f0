//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers the issuer keys its state by. You
//! cannot pass an `EventName` where a `SubjectId` is expected, and none of
//! them can be constructed from an empty string.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound on identifier length accepted from callers.
pub const MAX_IDENTIFIER_LEN: usize = 256;

fn validate(field: &'static str, raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if raw.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_IDENTIFIER_LEN,
            actual: raw.len(),
        });
    }
    Ok(())
}

/// Unique name of an event. Primary key of the event registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventName(String);

impl EventName {
    /// Validate and wrap an event name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate("event_name", &name)?;
        Ok(Self(name))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stable identifier of a participant.
///
/// This is the dapp-scoped principal carried in a verified identity alias
/// (`id_dapp`), never the pseudonymous alias itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Validate and wrap a subject identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        validate("subject_id", &id)?;
        Ok(Self(id))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Secret join code attached to an event.
///
/// `Debug` output is redacted; the code is only revealed through
/// [`RegistrationCode::expose`], which the admin listing uses.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistrationCode(String);

impl RegistrationCode {
    /// Validate and wrap a registration code.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        validate("registration_code", &code)?;
        Ok(Self(code))
    }

    /// Reveal the code.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RegistrationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RegistrationCode(<redacted>)")
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident, $accessor:ident) => {
        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                self.$accessor()
            }
        }
    };
}

string_newtype_impls!(EventName, as_str);
string_newtype_impls!(SubjectId, as_str);
string_newtype_impls!(RegistrationCode, expose);

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
