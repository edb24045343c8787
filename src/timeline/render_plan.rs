//! The output of an assembly pass: an ordered list of tile descriptors.

use std::{ops::Range, sync::Arc};

use rangemap::RangeMap;
use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
    event::{EventRecord, ReceiptRecord, SenderProfile, Timestamp},
    identifiers::{OwnedEventId, OwnedRoomId, OwnedUserId},
};

/// How the rendering layer should draw an event tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TileRenderer {
    Message,
    Textual { text: String },
    RoomCreate,
    RoomAvatar,
    /// The raw event source, shown when the viewer asked to see hidden events.
    HiddenEvent,
    /// "This event could not be displayed."
    Unrenderable,
}

/// A single event rendered on its own.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventTile {
    pub event: Arc<EventRecord>,
    pub renderer: TileRenderer,
    /// Whether the sender header should be suppressed.
    pub continuation: bool,
    /// Read receipts to show under this tile, most recent first.
    pub receipts: Vec<ReceiptRecord>,
    pub highlighted: bool,
    /// Whether this is the last shown event of the timeline.
    pub last: bool,
    /// Whether a date separator follows this event.
    pub last_in_section: bool,
    /// Whether this is the viewer's most recent successfully sent event.
    pub last_successful: bool,
    pub is_editing: bool,
    /// Whether this tile is rendered inside a group summary.
    pub grouped: bool,
}

/// The kinds of collapsible groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    RoomCreation,
    Redaction,
    Membership,
}

/// A run of events collapsed into one expandable summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSummary {
    pub kind: GroupKind,
    /// A key that stays stable while more events are appended to the group.
    pub key: String,
    /// The tiles shown when the group is expanded.
    pub tiles: Vec<TileDescriptor>,
    pub summary_members: Vec<SenderProfile>,
    pub summary_text: String,
    /// Runs shorter than this are shown as individual tiles. Zero means always summarize.
    pub threshold: usize,
    pub start_expanded: bool,
}

/// One entry of a [`RenderPlan`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TileDescriptor {
    Event(EventTile),
    GroupSummary(GroupSummary),
    DateSeparator { timestamp: Timestamp },
    /// The viewer's read marker. Always emitted for the marked event so it can be tracked,
    /// even when it should not be drawn.
    ReadMarker { event_id: OwnedEventId, visible: bool },
    /// The banner introducing a newly created room.
    RoomIntro { room_id: OwnedRoomId, creator: Option<OwnedUserId> },
}

impl TileDescriptor {
    pub fn as_event(&self) -> Option<&EventTile> {
        match self {
            TileDescriptor::Event(tile) => Some(tile),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupSummary> {
        match self {
            TileDescriptor::GroupSummary(group) => Some(group),
            _ => None,
        }
    }
}

/// The group that absorbed a range of input indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupSpan {
    pub kind: GroupKind,
    /// The input index the group started at. Keeps adjacent groups of the same kind distinct.
    pub first_index: usize,
}

/// The ordered tiles of one assembly pass.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    pub tiles: Vec<TileDescriptor>,
    /// An event with a stored edit draft that the caller should resume editing.
    pub pending_edit: Option<OwnedEventId>,
    /// The input index ranges absorbed by each group.
    pub group_ranges: RangeMap<usize, GroupSpan>,
}

impl RenderPlan {
    /// Returns the range of input indices and the kind of the group that absorbed `index`.
    pub fn group_at(&self, index: usize) -> Option<(Range<usize>, GroupKind)> {
        self.group_ranges.get_key_value(&index)
            .map(|(range, span)| (range.clone(), span.kind))
    }

    /// Iterates over every event tile, including the ones inside group summaries.
    pub fn event_tiles(&self) -> impl Iterator<Item = &EventTile> {
        fn flatten<'a>(tiles: &'a [TileDescriptor], out: &mut Vec<&'a EventTile>) {
            for tile in tiles {
                match tile {
                    TileDescriptor::Event(event_tile) => out.push(event_tile),
                    TileDescriptor::GroupSummary(group) => flatten(&group.tiles, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        flatten(&self.tiles, &mut out);
        out.into_iter()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupSummary> {
        self.tiles.iter().filter_map(TileDescriptor::as_group)
    }
}

impl PartialEq for RenderPlan {
    fn eq(&self, other: &Self) -> bool {
        self.tiles == other.tiles
            && self.pending_edit == other.pending_edit
            && self.group_ranges.iter().eq(other.group_ranges.iter())
    }
}

#[derive(Serialize)]
struct SerializedGroupRange {
    start: usize,
    end: usize,
    kind: GroupKind,
}

impl Serialize for RenderPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let group_ranges: Vec<SerializedGroupRange> = self.group_ranges.iter()
            .map(|(range, span)| SerializedGroupRange { start: range.start, end: range.end, kind: span.kind })
            .collect();
        let mut state = serializer.serialize_struct("RenderPlan", 3)?;
        state.serialize_field("tiles", &self.tiles)?;
        state.serialize_field("pending_edit", &self.pending_edit)?;
        state.serialize_field("group_ranges", &group_ranges)?;
        state.end()
    }
}
