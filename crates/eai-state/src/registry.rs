//! # Registration Service
//!
//! Ties the event registry and participant store together behind the four
//! registry operations. Every successful mutation is followed by a snapshot
//! write when persistence is enabled. A failed write is reported as
//! `Internal`; the mutation stays applied in memory and is written out with
//! the next successful snapshot.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use eai_core::{EventName, RegistrationCode, SharedClock, SubjectId};

use crate::error::{RegisterError, SnapshotError};
use crate::events::{Event, EventRegistry};
use crate::participants::{Participant, ParticipantStore};
use crate::snapshot::{Snapshot, SnapshotStore, SNAPSHOT_VERSION};

/// Event join request supplied with `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Event to join.
    pub event_name: String,
    /// Code presented for that event.
    pub registration_code: String,
}

/// Events plus participants, with optional persistence.
#[derive(Debug)]
pub struct Registry {
    events: EventRegistry,
    participants: ParticipantStore,
    clock: SharedClock,
    snapshot: Option<SnapshotStore>,
}

impl Registry {
    /// In-memory registry.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            events: EventRegistry::new(),
            participants: ParticipantStore::new(),
            clock,
            snapshot: None,
        }
    }

    /// Registry persisted to `store`, restoring whatever it already holds.
    pub fn with_snapshot(clock: SharedClock, store: SnapshotStore) -> Result<Self, SnapshotError> {
        let (events, participants) = match store.load()? {
            Some(snapshot) => {
                info!(
                    path = %store.path().display(),
                    events = snapshot.events.len(),
                    participants = snapshot.participants.len(),
                    "restored registry snapshot"
                );
                (
                    EventRegistry::from_events(snapshot.events)?,
                    ParticipantStore::from_records(snapshot.participants),
                )
            }
            None => (EventRegistry::new(), ParticipantStore::new()),
        };
        Ok(Self {
            events,
            participants,
            clock,
            snapshot: Some(store),
        })
    }

    /// Create an event with the given or a generated registration code.
    pub fn add_event(
        &self,
        event_name: &str,
        registration_code: Option<&str>,
    ) -> Result<Event, RegisterError> {
        let name = EventName::new(event_name)?;
        let code = registration_code.map(RegistrationCode::new).transpose()?;
        let event = self.events.add(name, code, self.clock.timestamp())?;
        info!(event = %event.name, "event created");
        self.persist()?;
        Ok(event)
    }

    /// All events in creation order.
    pub fn list_events(&self) -> Vec<Event> {
        self.events.list()
    }

    /// Register `subject`, optionally joining an event.
    ///
    /// The code is checked before anything is written, so a rejected
    /// registration leaves participant state untouched.
    pub fn register(
        &self,
        subject: &SubjectId,
        event: Option<EventData>,
    ) -> Result<Participant, RegisterError> {
        let event_name = match event {
            Some(data) => {
                let name = EventName::new(data.event_name)?;
                if let Err(e) = self.events.check_code(&name, &data.registration_code) {
                    warn!(subject = %subject, event = %name, error = %e, "registration rejected");
                    return Err(e);
                }
                Some(name)
            }
            None => None,
        };

        let (participant, outcome) =
            self.participants
                .upsert(subject.clone(), event_name.clone(), self.clock.timestamp());
        if outcome.created || outcome.joined_event {
            info!(
                subject = %subject,
                event = event_name.as_ref().map(EventName::as_str),
                new_participant = outcome.created,
                "participant registered"
            );
            self.persist()?;
        }
        Ok(participant)
    }

    /// A registered participant, or `External` if the subject never registered.
    pub fn get_participant(&self, subject: &SubjectId) -> Result<Participant, RegisterError> {
        self.participants
            .get(subject)
            .ok_or_else(|| RegisterError::External(format!("Participant {subject} not found")))
    }

    /// Current participant record, if any.
    pub fn participant(&self, subject: &SubjectId) -> Option<Participant> {
        self.participants.get(subject)
    }

    /// Number of registered participants.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Number of events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn capture(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            events: self.events.list(),
            participants: self.participants.all(),
        }
    }

    fn persist(&self) -> Result<(), RegisterError> {
        let Some(store) = &self.snapshot else {
            return Ok(());
        };
        store.save_with(|| self.capture()).map_err(|e| {
            error!(path = %store.path().display(), error = %e, "failed to write registry snapshot");
            RegisterError::Internal(format!("failed to persist registry state: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eai_core::{ManualClock, SystemClock};
    use std::sync::Arc;

    fn registry() -> Registry {
        Registry::new(SystemClock::shared())
    }

    fn subject(s: &str) -> SubjectId {
        SubjectId::new(s).unwrap()
    }

    fn join(event: &str, code: &str) -> Option<EventData> {
        Some(EventData {
            event_name: event.to_string(),
            registration_code: code.to_string(),
        })
    }

    #[test]
    fn launch_scenario() {
        let reg = registry();
        reg.add_event("launch", Some("ABC123")).unwrap();
        reg.register(&subject("U1"), join("launch", "ABC123")).unwrap();

        let p = reg.get_participant(&subject("U1")).unwrap();
        let joined = p.joined_events();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].event_name.as_str(), "launch");

        let err = reg
            .register(&subject("U1"), join("launch", "WRONG"))
            .unwrap_err();
        assert!(matches!(err, RegisterError::External(_)));
        assert_eq!(reg.get_participant(&subject("U1")).unwrap(), p);
    }

    #[test]
    fn wrong_code_does_not_create_participant() {
        let reg = registry();
        reg.add_event("launch", Some("ABC123")).unwrap();
        assert!(reg.register(&subject("U2"), join("launch", "nope")).is_err());
        assert!(matches!(
            reg.get_participant(&subject("U2")),
            Err(RegisterError::External(_))
        ));
    }

    #[test]
    fn unknown_event_is_internal() {
        let reg = registry();
        assert!(matches!(
            reg.register(&subject("U1"), join("ghost", "x")),
            Err(RegisterError::Internal(_))
        ));
        assert_eq!(reg.participant_count(), 0);
    }

    #[test]
    fn empty_event_name_is_external() {
        let reg = registry();
        assert_eq!(
            reg.add_event("", None).unwrap_err(),
            RegisterError::External("event_name cannot be an empty string".to_string())
        );
        assert!(matches!(
            reg.register(&subject("U1"), join("", "x")),
            Err(RegisterError::External(_))
        ));
    }

    #[test]
    fn shared_code_works_for_many_subjects() {
        let reg = registry();
        reg.add_event("launch", Some("ABC123")).unwrap();
        for s in ["U1", "U2", "U3"] {
            reg.register(&subject(s), join("launch", "ABC123")).unwrap();
        }
        assert_eq!(reg.participant_count(), 3);
    }

    #[test]
    fn register_without_event_only_upserts() {
        let clock = Arc::new(ManualClock::at_epoch_secs(1_000));
        let reg = Registry::new(clock.clone());
        let first = reg.register(&subject("U1"), None).unwrap();
        clock.advance(std::time::Duration::from_secs(60));
        let second = reg.register(&subject("U1"), None).unwrap();
        assert_eq!(first.joined_at, second.joined_at);
        assert!(second.events.is_empty());
    }

    #[test]
    fn snapshot_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        {
            let reg = Registry::with_snapshot(SystemClock::shared(), SnapshotStore::new(&path))
                .unwrap();
            reg.add_event("launch", Some("ABC123")).unwrap();
            reg.register(&subject("U1"), join("launch", "ABC123")).unwrap();
        }
        let restored =
            Registry::with_snapshot(SystemClock::shared(), SnapshotStore::new(&path)).unwrap();
        assert_eq!(restored.event_count(), 1);
        let p = restored.get_participant(&subject("U1")).unwrap();
        assert_eq!(p.events.len(), 1);
        assert!(restored.add_event("launch", None).is_err());
    }

    #[test]
    fn snapshot_with_repeated_event_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        let reg = registry();
        reg.add_event("launch", Some("ABC123")).unwrap();
        let event = reg.list_events().remove(0);
        store
            .save_with(|| Snapshot {
                version: SNAPSHOT_VERSION,
                events: vec![event.clone(), event],
                participants: Default::default(),
            })
            .unwrap();
        assert!(matches!(
            Registry::with_snapshot(SystemClock::shared(), store),
            Err(SnapshotError::DuplicateEvent(_))
        ));
    }

    #[test]
    fn failed_snapshot_write_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        let reg = Registry::with_snapshot(
            SystemClock::shared(),
            SnapshotStore::new(blocked.join("state.json")),
        )
        .unwrap();
        std::fs::write(&blocked, b"not a directory").unwrap();

        assert!(matches!(
            reg.add_event("launch", Some("ABC123")),
            Err(RegisterError::Internal(_))
        ));
        assert!(matches!(
            reg.register(&subject("U1"), None),
            Err(RegisterError::Internal(_))
        ));
        assert_eq!(reg.participant_count(), 1);
        assert_eq!(reg.event_count(), 1);
    }
}
