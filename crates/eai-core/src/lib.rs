//! # eai-core: Foundational Types for the Early Adopter Issuer
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on:
//!
//! 1. **`CanonicalBytes` newtype.** Everything that gets signed or hashed
//!    (credential claims, JWS headers, signature-map keys) flows through
//!    `CanonicalBytes::new()`. There is no other constructor.
//!
//! 2. **UTC-only timestamps with an injectable clock.** `Timestamp` is
//!    seconds precision; `Clock` lets the registry and the issuance engine
//!    run against a `ManualClock` in tests.
//!
//! 3. **Validated identifiers.** `EventName`, `SubjectId` and
//!    `RegistrationCode` reject empty input at construction so downstream
//!    code never sees a blank key.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `eai-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use error::{CanonicalizationError, EaiError, ValidationError};
pub use identity::{EventName, RegistrationCode, SubjectId};
pub use temporal::{Clock, ManualClock, SharedClock, SystemClock, Timestamp};
