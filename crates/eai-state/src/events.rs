//! # Event Registry
//!
//! Named events with a registration code each. Events are never removed and
//! codes are never regenerated, so a code check done under the read lock
//! stays valid for the rest of a registration.

use std::collections::HashMap;

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use eai_core::{EventName, RegistrationCode, Timestamp};

use crate::error::{RegisterError, SnapshotError};

/// Length of generated registration codes.
pub const GENERATED_CODE_LEN: usize = 24;

/// A registered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event name.
    pub name: EventName,
    /// Join code participants must present.
    pub registration_code: RegistrationCode,
    /// Creation time.
    pub created_at: Timestamp,
}

#[derive(Debug, Default)]
struct EventTable {
    ordered: Vec<Event>,
    index: HashMap<EventName, usize>,
}

/// Thread-safe event registry preserving creation order.
#[derive(Debug, Default)]
pub struct EventRegistry {
    table: RwLock<EventTable>,
}

impl EventRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted events, in their stored order.
    ///
    /// A name stored twice means the snapshot is corrupt.
    pub fn from_events(events: Vec<Event>) -> Result<Self, SnapshotError> {
        let mut index = HashMap::with_capacity(events.len());
        for (position, event) in events.iter().enumerate() {
            if index.insert(event.name.clone(), position).is_some() {
                return Err(SnapshotError::DuplicateEvent(event.name.to_string()));
            }
        }
        Ok(Self {
            table: RwLock::new(EventTable {
                ordered: events,
                index,
            }),
        })
    }

    /// Create an event. Uses `code` if given, otherwise generates one.
    pub fn add(
        &self,
        name: EventName,
        code: Option<RegistrationCode>,
        now: Timestamp,
    ) -> Result<Event, RegisterError> {
        let mut table = self.table.write();
        if table.index.contains_key(&name) {
            return Err(RegisterError::External(format!(
                "Event {name} already exists"
            )));
        }
        let registration_code = match code {
            Some(code) => code,
            None => generate_code()?,
        };
        let event = Event {
            name: name.clone(),
            registration_code,
            created_at: now,
        };
        let position = table.ordered.len();
        table.ordered.push(event.clone());
        table.index.insert(name, position);
        Ok(event)
    }

    /// All events in creation order.
    pub fn list(&self) -> Vec<Event> {
        self.table.read().ordered.clone()
    }

    /// Look up an event by name.
    pub fn get(&self, name: &EventName) -> Option<Event> {
        let table = self.table.read();
        table.index.get(name).map(|&i| table.ordered[i].clone())
    }

    /// Check a presented code against the stored one.
    ///
    /// A missing event is `Internal`: the caller was handed a name the
    /// service does not know. A wrong code is `External`.
    pub fn check_code(&self, name: &EventName, presented: &str) -> Result<(), RegisterError> {
        let table = self.table.read();
        let event = table
            .index
            .get(name)
            .map(|&i| &table.ordered[i])
            .ok_or_else(|| RegisterError::Internal(format!("Event {name} not found")))?;
        let matches: bool = event
            .registration_code
            .expose()
            .as_bytes()
            .ct_eq(presented.as_bytes())
            .into();
        if matches {
            Ok(())
        } else {
            Err(RegisterError::External(format!(
                "Invalid registration code for event {name}"
            )))
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.table.read().ordered.len()
    }

    /// Whether no events exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Random code of lowercase ASCII letters.
fn generate_code() -> Result<RegistrationCode, RegisterError> {
    let mut rng = rand::thread_rng();
    let code: String = (0..GENERATED_CODE_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect();
    RegistrationCode::new(code).map_err(|e| RegisterError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> EventName {
        EventName::new(s).unwrap()
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    #[test]
    fn add_with_explicit_code() {
        let reg = EventRegistry::new();
        let event = reg
            .add(name("launch"), Some(RegistrationCode::new("ABC123").unwrap()), ts(10))
            .unwrap();
        assert_eq!(event.registration_code.expose(), "ABC123");
        assert_eq!(event.created_at, ts(10));
        assert_eq!(reg.get(&name("launch")), Some(event));
    }

    #[test]
    fn generated_code_is_lowercase_letters() {
        let reg = EventRegistry::new();
        let event = reg.add(name("meetup"), None, ts(1)).unwrap();
        let code = event.registration_code.expose();
        assert_eq!(code.len(), GENERATED_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn duplicate_is_external() {
        let reg = EventRegistry::new();
        reg.add(name("launch"), None, ts(1)).unwrap();
        let err = reg.add(name("launch"), None, ts(2)).unwrap_err();
        assert_eq!(
            err,
            RegisterError::External("Event launch already exists".to_string())
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn list_preserves_creation_order() {
        let reg = EventRegistry::new();
        for n in ["zeta", "alpha", "mid"] {
            reg.add(name(n), None, ts(1)).unwrap();
        }
        let names: Vec<_> = reg.list().into_iter().map(|e| e.name.to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn check_code_outcomes() {
        let reg = EventRegistry::new();
        reg.add(name("launch"), Some(RegistrationCode::new("ABC123").unwrap()), ts(1))
            .unwrap();
        assert!(reg.check_code(&name("launch"), "ABC123").is_ok());
        assert!(matches!(
            reg.check_code(&name("launch"), "WRONG"),
            Err(RegisterError::External(_))
        ));
        assert!(matches!(
            reg.check_code(&name("launch"), "ABC1234"),
            Err(RegisterError::External(_))
        ));
        assert!(matches!(
            reg.check_code(&name("missing"), "ABC123"),
            Err(RegisterError::Internal(_))
        ));
    }

    #[test]
    fn from_events_restores_index() {
        let reg = EventRegistry::new();
        reg.add(name("a"), None, ts(1)).unwrap();
        reg.add(name("b"), None, ts(2)).unwrap();
        let restored = EventRegistry::from_events(reg.list()).unwrap();
        assert_eq!(restored.list(), reg.list());
        assert!(restored.get(&name("b")).is_some());
        assert!(restored.add(name("a"), None, ts(3)).is_err());
    }

    #[test]
    fn from_events_rejects_repeated_name() {
        let reg = EventRegistry::new();
        reg.add(name("launch"), Some(RegistrationCode::new("FIRST").unwrap()), ts(1))
            .unwrap();
        let mut events = reg.list();
        let mut copy = events[0].clone();
        copy.registration_code = RegistrationCode::new("SECOND").unwrap();
        events.push(copy);
        assert!(matches!(
            EventRegistry::from_events(events),
            Err(SnapshotError::DuplicateEvent(n)) if n == "launch"
        ));
    }
}
