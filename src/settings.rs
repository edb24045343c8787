//! Settings snapshots threaded through one timeline assembly pass.
//!
//! [`TimelineSettings`] is the persisted, user-facing document (global toggles plus
//! per-room overrides). It is resolved into a small [`RoomTimelineSettings`] value
//! for the room being assembled, which every component consults instead of
//! looking anything up globally.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use bitflags::bitflags;
use chrono::{FixedOffset, Local, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    event::Timestamp,
    identifiers::{OwnedEventId, OwnedRoomId, OwnedUserId},
};

bitflags! {
    /// Categories of events that the viewer chose to hide from the timeline.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct HiddenEventCategories: u8 {
        const Redactions          = 0b0000_0001;
        const JoinLeaves          = 0b0000_0010;
        const AvatarChanges       = 0b0000_0100;
        const DisplaynameChanges  = 0b0000_1000;
    }
}

impl Default for HiddenEventCategories {
    fn default() -> Self { HiddenEventCategories::empty() }
}

/// The resolved visibility settings for a single room.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RoomTimelineSettings {
    pub hidden: HiddenEventCategories,
    /// Show every event, including ones without a proper tile (rendered as raw source).
    pub show_hidden_events: bool,
}

impl RoomTimelineSettings {
    pub fn hides(&self, category: HiddenEventCategories) -> bool {
        self.hidden.contains(category)
    }

    /// The same settings as if "show hidden events" were switched off.
    pub fn without_hidden_events(self) -> Self {
        Self { show_hidden_events: false, ..self }
    }
}

/// Per-room overrides of the global [`TimelineSettings`]. `None` means "inherit".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettingsOverride {
    pub hide_redactions: Option<bool>,
    pub hide_join_leaves: Option<bool>,
    pub hide_avatar_changes: Option<bool>,
    pub hide_displayname_changes: Option<bool>,
    pub show_hidden_events_in_timeline: Option<bool>,
}

/// The persisted timeline display settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    pub hide_redactions: bool,
    pub hide_join_leaves: bool,
    pub hide_avatar_changes: bool,
    pub hide_displayname_changes: bool,
    pub show_hidden_events_in_timeline: bool,
    pub room_overrides: HashMap<OwnedRoomId, RoomSettingsOverride>,
}

impl TimelineSettings {
    /// Resolves the settings that apply to the given room.
    pub fn for_room(&self, room_id: &OwnedRoomId) -> RoomTimelineSettings {
        let room = self.room_overrides.get(room_id).cloned().unwrap_or_default();

        let mut hidden = HiddenEventCategories::empty();
        hidden.set(
            HiddenEventCategories::Redactions,
            room.hide_redactions.unwrap_or(self.hide_redactions),
        );
        hidden.set(
            HiddenEventCategories::JoinLeaves,
            room.hide_join_leaves.unwrap_or(self.hide_join_leaves),
        );
        hidden.set(
            HiddenEventCategories::AvatarChanges,
            room.hide_avatar_changes.unwrap_or(self.hide_avatar_changes),
        );
        hidden.set(
            HiddenEventCategories::DisplaynameChanges,
            room.hide_displayname_changes.unwrap_or(self.hide_displayname_changes),
        );
        RoomTimelineSettings {
            hidden,
            show_hidden_events: room.show_hidden_events_in_timeline
                .unwrap_or(self.show_hidden_events_in_timeline),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read timeline settings from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse timeline settings in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the timeline settings from the given JSON file.
///
/// A missing file is not an error: the default settings are returned instead.
pub fn load_settings(path: &Path) -> Result<TimelineSettings, SettingsError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No timeline settings at {path:?}, using defaults.");
            return Ok(TimelineSettings::default());
        }
        Err(source) => return Err(SettingsError::Io { path: path.to_owned(), source }),
    };
    serde_json::from_slice(&bytes).map_err(|source| {
        warn!("Timeline settings at {path:?} are invalid: {source}");
        SettingsError::Parse { path: path.to_owned(), source }
    })
}

/// Everything about the viewer and the surrounding room view that one pass needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerContext {
    /// The viewer's own user ID: their receipts are never shown.
    pub own_user_id: OwnedUserId,
    pub ignored_users: HashSet<OwnedUserId>,
    /// An event that must be shown and marked as selected, e.g. from a permalink.
    pub highlighted_event_id: Option<OwnedEventId>,
    /// The event after which the viewer's read marker sits.
    pub read_marker_event_id: Option<OwnedEventId>,
    pub read_marker_visible: bool,
    /// Set when back-pagination is impossible, so the start of the room already gives context.
    pub suppress_first_date_separator: bool,
    pub show_read_receipts: bool,
    pub is_direct_room: bool,
    /// The event currently open in the message editor, if any.
    pub editing_event_id: Option<OwnedEventId>,
    /// An event with an unsent edit draft stored for this room.
    pub pending_edit_event_id: Option<OwnedEventId>,
    /// The effective timestamp of every local echo.
    pub now: Timestamp,
    /// The viewer's UTC offset, used to decide which weekday an event falls on.
    pub utc_offset_secs: i32,
}

impl Default for ViewerContext {
    fn default() -> Self {
        Self {
            own_user_id: OwnedUserId::from(""),
            ignored_users: HashSet::new(),
            highlighted_event_id: None,
            read_marker_event_id: None,
            read_marker_visible: true,
            suppress_first_date_separator: false,
            show_read_receipts: true,
            is_direct_room: false,
            editing_event_id: None,
            pending_edit_event_id: None,
            now: Timestamp(Utc::now().timestamp_millis()),
            utc_offset_secs: Local::now().offset().fix().local_minus_utc(),
        }
    }
}

impl ViewerContext {
    pub fn new(own_user_id: impl Into<OwnedUserId>) -> Self {
        Self {
            own_user_id: own_user_id.into(),
            ..Default::default()
        }
    }

    pub fn is_user_ignored(&self, user_id: &OwnedUserId) -> bool {
        self.ignored_users.contains(user_id)
    }

    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }
}
