//! Collapsing runs of low-signal events into expandable summaries.
//!
//! At most one group is open at a time. When no group is open, each grouper is asked
//! in priority order whether it can start a group at the current event; the first one
//! that can wins. An open group absorbs events for as long as it wants them, and is
//! flushed into tiles the moment it doesn't (or when the input ends).

mod membership;
pub mod membership_summary;
mod redaction;
mod room_creation;

use std::ops::Range;

use super::{
    assembler::PassContext,
    render_plan::{GroupKind, GroupSummary, TileDescriptor},
};
use self::{
    membership::MembershipGrouper,
    redaction::RedactionGrouper,
    room_creation::RoomCreationGrouper,
};

/// The tiles of a closed group.
pub(crate) struct FlushedGroup {
    pub kind: GroupKind,
    pub tiles: Vec<TileDescriptor>,
    /// The input indices the group absorbed, including the events it swallowed silently.
    pub span: Range<usize>,
    /// The event that the tiles after this group should treat as their predecessor.
    pub next_prev: usize,
}

/// The built-in groupers, in priority order.
pub(crate) enum Grouper {
    RoomCreation(RoomCreationGrouper),
    Redaction(RedactionGrouper),
    Membership(MembershipGrouper),
}

impl Grouper {
    /// Opens a group at `index` with the first grouper that can start one there.
    pub fn try_start(ctx: &PassContext<'_>, index: usize, prev: Option<usize>) -> Option<Self> {
        if RoomCreationGrouper::can_start(ctx, index) {
            Some(Self::RoomCreation(RoomCreationGrouper::new(ctx, index, prev)))
        } else if RedactionGrouper::can_start(ctx, index) {
            Some(Self::Redaction(RedactionGrouper::new(ctx, index, prev)))
        } else if MembershipGrouper::can_start(ctx, index) {
            Some(Self::Membership(MembershipGrouper::new(ctx, index, prev)))
        } else {
            None
        }
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            Self::RoomCreation(_) => GroupKind::RoomCreation,
            Self::Redaction(_) => GroupKind::Redaction,
            Self::Membership(_) => GroupKind::Membership,
        }
    }

    /// Whether the open group absorbs the event at `index`.
    pub fn should_group(&self, ctx: &PassContext<'_>, index: usize) -> bool {
        match self {
            Self::RoomCreation(g) => g.should_group(ctx, index),
            Self::Redaction(g) => g.should_group(ctx, index),
            Self::Membership(g) => g.should_group(ctx, index),
        }
    }

    pub fn add(&mut self, ctx: &PassContext<'_>, index: usize) {
        match self {
            Self::RoomCreation(g) => g.add(ctx, index),
            Self::Redaction(g) => g.add(ctx, index),
            Self::Membership(g) => g.add(ctx, index),
        }
    }

    /// Closes the group. Consuming `self` makes a second flush impossible.
    pub fn flush(self, ctx: &PassContext<'_>) -> FlushedGroup {
        let kind = self.kind();
        let (state, tiles, next_prev) = match self {
            Self::RoomCreation(g) => {
                let next_prev = g.next_prev_event();
                let (state, tiles) = g.into_tiles(ctx);
                (state, tiles, next_prev)
            }
            Self::Redaction(g) => {
                let next_prev = g.next_prev_event();
                let (state, tiles) = g.into_tiles(ctx);
                (state, tiles, next_prev)
            }
            Self::Membership(g) => {
                let next_prev = g.next_prev_event();
                let (state, tiles) = g.into_tiles(ctx);
                (state, tiles, next_prev)
            }
        };
        FlushedGroup { kind, tiles, span: state.span(), next_prev }
    }
}

/// Bookkeeping shared by every grouper.
#[derive(Debug)]
pub(crate) struct GroupState {
    /// The event shown before the group.
    pub prev: Option<usize>,
    first_index: usize,
    last_index: usize,
    /// The read marker, if it sits on any event the group absorbed.
    read_marker: Option<TileDescriptor>,
    /// Placeholders of malformed events the group absorbed, shown after the group.
    placeholders: Vec<TileDescriptor>,
}

impl GroupState {
    fn new(ctx: &PassContext<'_>, index: usize, prev: Option<usize>) -> Self {
        Self {
            prev,
            first_index: index,
            last_index: index,
            read_marker: ctx.read_marker_for(index),
            placeholders: Vec::new(),
        }
    }

    /// Records that the group absorbed the event at `index`, shown or not.
    fn absorb(&mut self, ctx: &PassContext<'_>, index: usize) {
        debug_assert!(index > self.last_index, "groups absorb events in order");
        self.last_index = index;
        if self.read_marker.is_none() {
            self.read_marker = ctx.read_marker_for(index);
        }
        self.placeholders.extend(ctx.placeholder_for(index));
    }

    fn span(&self) -> Range<usize> {
        self.first_index..self.last_index + 1
    }

    /// The tiles that follow the group itself: malformed-event placeholders, then the read marker.
    fn trailing_tiles(&mut self) -> Vec<TileDescriptor> {
        let mut tiles = std::mem::take(&mut self.placeholders);
        tiles.extend(self.read_marker.take());
        tiles
    }

    /// The date separator to put before a group whose first tile is `first`, if one is wanted.
    fn leading_separator(&self, ctx: &PassContext<'_>, first: usize) -> Option<TileDescriptor> {
        let prev = self.prev.map(|p| ctx.event(p));
        let first = ctx.event(first);
        if !ctx.dates.wants_separator_before(prev, first) {
            return None;
        }
        ctx.dates.effective_timestamp(first)
            .map(|timestamp| TileDescriptor::DateSeparator { timestamp })
    }
}

/// Builds the tiles of grouped events, each continuing from the one before it.
fn grouped_tiles(ctx: &PassContext<'_>, events: &[usize], prev: Option<usize>) -> Vec<TileDescriptor> {
    let mut prev = prev;
    let mut tiles = Vec::with_capacity(events.len());
    for &index in events {
        tiles.extend(ctx.tiles_for_event(index, prev, true));
        prev = Some(index);
    }
    tiles
}

/// Returns the summary tile, or its individual tiles if the run is below the summary's threshold.
fn summary_or_individual_tiles(mut summary: GroupSummary) -> Vec<TileDescriptor> {
    if summary.threshold == 0 || summary.tiles.len() >= summary.threshold {
        return vec![TileDescriptor::GroupSummary(summary)];
    }
    for tile in &mut summary.tiles {
        if let TileDescriptor::Event(event_tile) = tile {
            event_tile.grouped = false;
        }
    }
    summary.tiles
}
