//! # Participant Store
//!
//! Append-only participant records keyed by subject. A record is created on
//! the first successful registration; its `joined_at` never changes, and
//! events are only ever added.
//!
//! The per-subject `DashMap` entry is the unit of atomicity: the
//! "already joined?" check and the insert for an `(event, subject)` pair
//! happen under the same shard lock, so two concurrent registrations of the
//! same subject cannot both observe "not yet joined".

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use eai_core::{EventName, SubjectId, Timestamp};

/// Stored participant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Time of the first successful registration.
    pub joined_at: Timestamp,
    /// Joined events with their join times.
    pub events: BTreeMap<EventName, Timestamp>,
}

impl Participant {
    fn new(joined_at: Timestamp) -> Self {
        Self {
            joined_at,
            events: BTreeMap::new(),
        }
    }

    /// Whether the participant joined `event`.
    pub fn attended(&self, event: &EventName) -> bool {
        self.events.contains_key(event)
    }

    /// Joined events ordered by join time, then name.
    pub fn joined_events(&self) -> Vec<JoinedEvent> {
        let mut out: Vec<_> = self
            .events
            .iter()
            .map(|(name, at)| JoinedEvent {
                event_name: name.clone(),
                joined_at: *at,
            })
            .collect();
        out.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.event_name.cmp(&b.event_name)));
        out
    }
}

/// An event a participant has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedEvent {
    /// Event name.
    pub event_name: EventName,
    /// When the participant joined it.
    pub joined_at: Timestamp,
}

/// Outcome of an upsert, for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// A new participant record was created.
    pub created: bool,
    /// A new event was added to the record.
    pub joined_event: bool,
}

/// Concurrent participant store.
#[derive(Debug, Default)]
pub struct ParticipantStore {
    participants: DashMap<SubjectId, Participant>,
}

impl ParticipantStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records.
    pub fn from_records(records: impl IntoIterator<Item = (SubjectId, Participant)>) -> Self {
        Self {
            participants: records.into_iter().collect(),
        }
    }

    /// Create the participant if needed and optionally join an event.
    ///
    /// Re-joining an already joined event keeps the original join time.
    pub fn upsert(
        &self,
        subject: SubjectId,
        event: Option<EventName>,
        now: Timestamp,
    ) -> (Participant, UpsertOutcome) {
        let mut created = false;
        let mut entry = self.participants.entry(subject).or_insert_with(|| {
            created = true;
            Participant::new(now)
        });
        let participant = entry.value_mut();
        let joined_event = match event {
            Some(name) if !participant.events.contains_key(&name) => {
                participant.events.insert(name, now);
                true
            }
            _ => false,
        };
        (
            participant.clone(),
            UpsertOutcome {
                created,
                joined_event,
            },
        )
    }

    /// Snapshot of one participant.
    pub fn get(&self, subject: &SubjectId) -> Option<Participant> {
        self.participants.get(subject).map(|p| p.value().clone())
    }

    /// Snapshot of all participants, sorted by subject.
    pub fn all(&self) -> BTreeMap<SubjectId, Participant> {
        self.participants
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
