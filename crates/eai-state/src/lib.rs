//! # eai-state: Event Registry and Participant Store
//!
//! Registration side of the issuer:
//!
//! - [`EventRegistry`]: named events with join codes, in creation order.
//! - [`ParticipantStore`]: append-only participant records keyed by subject.
//! - [`Registry`]: the `add_event` / `list_events` / `register` /
//!   `get_participant` operations over both, with optional
//!   [`SnapshotStore`] persistence across restarts.
//!
//! Registration codes are shared per event: any number of subjects may
//! redeem the same code, and each `(event, subject)` pair is recorded at
//! most once.

pub mod error;
pub mod events;
pub mod participants;
pub mod registry;
pub mod snapshot;

pub use error::{RegisterError, SnapshotError};
pub use events::{Event, EventRegistry, GENERATED_CODE_LEN};
pub use participants::{JoinedEvent, Participant, ParticipantStore, UpsertOutcome};
pub use registry::{EventData, Registry};
pub use snapshot::{Snapshot, SnapshotStore, SNAPSHOT_VERSION};
