//! Timeline snapshots: a room's events, receipts and viewer state saved as one JSON document.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    event::{EventRecord, ReceiptRecord},
    identifiers::{OwnedEventId, OwnedRoomId},
    settings::{TimelineSettings, ViewerContext},
    timeline::{ReceiptFallback, RenderPlan, assemble_timeline},
};

/// Everything needed to assemble one room's timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub room_id: OwnedRoomId,
    #[serde(default)]
    pub viewer: ViewerContext,
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub receipts: Vec<ReceiptRecord>,
    /// The receipt fallback table saved by a previous pass, if any.
    #[serde(default)]
    pub receipt_fallback: ReceiptFallback,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read timeline snapshot from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse timeline snapshot in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("event {event_id} belongs to room {found}, not {expected}")]
    ForeignEvent {
        event_id: OwnedEventId,
        expected: OwnedRoomId,
        found: OwnedRoomId,
    },
    #[error("event {0} appears more than once")]
    DuplicateEvent(OwnedEventId),
}

impl TimelineSnapshot {
    /// Checks that every event belongs to the snapshot's room and appears only once.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::with_capacity(self.events.len());
        for event in &self.events {
            if event.room_id != self.room_id {
                return Err(SnapshotError::ForeignEvent {
                    event_id: event.event_id.clone(),
                    expected: self.room_id.clone(),
                    found: event.room_id.clone(),
                });
            }
            if !seen.insert(&event.event_id) {
                return Err(SnapshotError::DuplicateEvent(event.event_id.clone()));
            }
        }
        Ok(())
    }

    /// Assembles this snapshot's timeline with the settings that apply to its room.
    ///
    /// The snapshot's receipt fallback table is updated in place.
    pub fn render(&mut self, settings: &TimelineSettings) -> RenderPlan {
        let room_settings = settings.for_room(&self.room_id);
        let events: Vec<Arc<EventRecord>> = self.events.iter().cloned().map(Arc::new).collect();
        assemble_timeline(&events, &self.receipts, room_settings, &self.viewer, &mut self.receipt_fallback)
    }
}

/// Loads and validates a timeline snapshot from the given JSON file.
pub fn load_snapshot(path: &Path) -> Result<TimelineSnapshot, SnapshotError> {
    let bytes = std::fs::read(path)
        .map_err(|source| SnapshotError::Io { path: path.to_owned(), source })?;
    let snapshot: TimelineSnapshot = serde_json::from_slice(&bytes)
        .map_err(|source| SnapshotError::Parse { path: path.to_owned(), source })?;
    let malformed = snapshot.events.iter().filter(|e| e.is_malformed()).count();
    if malformed > 0 {
        warn!("{malformed} events in {path:?} have no valid sender or timestamp");
    }
    snapshot.validate()?;
    debug!(
        "Loaded {} events and {} receipts for {} from {path:?}",
        snapshot.events.len(),
        snapshot.receipts.len(),
        snapshot.room_id,
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::test_fixtures::*;

    fn snapshot(events: Vec<EventRecord>) -> TimelineSnapshot {
        TimelineSnapshot {
            room_id: ROOM.into(),
            viewer: viewer(ALICE),
            events,
            receipts: Vec::new(),
            receipt_fallback: ReceiptFallback::default(),
        }
    }

    #[test]
    fn duplicate_and_foreign_events_are_rejected() {
        let dup = snapshot(vec![message("$1", BOB, "a", at(0)), message("$1", BOB, "b", at(1))]);
        assert!(matches!(dup.validate(), Err(SnapshotError::DuplicateEvent(id)) if id == "$1"));

        let mut foreign = message("$2", BOB, "elsewhere", at(0));
        foreign.room_id = "!other:example.org".into();
        assert!(matches!(snapshot(vec![foreign]).validate(), Err(SnapshotError::ForeignEvent { .. })));
    }

    #[test]
    fn room_overrides_apply_when_rendering() {
        let mut snap = snapshot(vec![
            message("$1", BOB, "a", at(0)),
            redacted("$2", BOB, at(1)),
        ]);
        let settings: TimelineSettings = serde_json::from_value(json!({
            "room_overrides": { ROOM: { "hide_redactions": true } }
        })).unwrap();
        let plan = snap.render(&settings);
        assert_eq!(plan.event_tiles().count(), 1);

        let plan = snap.render(&TimelineSettings::default());
        assert_eq!(plan.event_tiles().count(), 2);
    }

    #[test]
    fn snapshot_files_round_trip_through_load() {
        let path = std::env::temp_dir().join(format!("tessera-snapshot-{}.json", std::process::id()));
        let snap = snapshot(vec![message("$1", BOB, "a", at(0))]);
        std::fs::write(&path, serde_json::to_vec(&snap).unwrap()).unwrap();
        let loaded = load_snapshot(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.unwrap(), snap);
    }

    #[test]
    fn missing_snapshot_is_an_io_error() {
        let path = std::env::temp_dir().join("tessera-snapshot-that-does-not-exist.json");
        assert!(matches!(load_snapshot(&path), Err(SnapshotError::Io { .. })));
    }
}
