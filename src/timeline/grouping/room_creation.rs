use crate::{
    event::event_type,
    timeline::{
        assembler::PassContext,
        render_plan::{GroupKind, GroupSummary, TileDescriptor},
    },
};
use super::{GroupState, grouped_tiles};

/// Collapses the burst of state events the creator sends while setting up a new room.
pub(crate) struct RoomCreationGrouper {
    state: GroupState,
    create_index: usize,
    events: Vec<usize>,
    /// Events shown on their own above the summary.
    ejected: Vec<usize>,
}

impl RoomCreationGrouper {
    pub fn can_start(ctx: &PassContext<'_>, index: usize) -> bool {
        let event = ctx.event(index);
        event.event_type == event_type::ROOM_CREATE && !event.is_malformed()
    }

    pub fn new(ctx: &PassContext<'_>, index: usize, prev: Option<usize>) -> Self {
        Self {
            state: GroupState::new(ctx, index, prev),
            create_index: index,
            events: Vec::new(),
            ejected: Vec::new(),
        }
    }

    pub fn should_group(&self, ctx: &PassContext<'_>, index: usize) -> bool {
        if !ctx.is_shown(index) {
            return true;
        }
        let event = ctx.event(index);
        let create = ctx.event(self.create_index);
        if ctx.dates.wants_separator_before(Some(create), event) {
            return false;
        }
        let creator = create.sender_id();
        if event.event_type == event_type::ROOM_MEMBER
            && (event.state_key.as_deref() != creator.map(|c| c.as_str()) || event.membership() != Some("join"))
        {
            return false;
        }
        event.is_state() && event.sender_id() == creator
    }

    pub fn add(&mut self, ctx: &PassContext<'_>, index: usize) {
        self.state.absorb(ctx, index);
        if !ctx.is_shown(index) {
            return;
        }
        if ctx.event(index).event_type == event_type::ROOM_ENCRYPTION {
            self.ejected.push(index);
        } else {
            self.events.push(index);
        }
    }

    pub fn next_prev_event(&self) -> usize {
        self.create_index
    }

    pub fn into_tiles(self, ctx: &PassContext<'_>) -> (GroupState, Vec<TileDescriptor>) {
        let create = ctx.event(self.create_index);
        let mut tiles = Vec::new();
        tiles.extend(self.state.leading_separator(ctx, self.create_index));

        // An upgraded room shows its create event, linking to the predecessor.
        if ctx.is_shown(self.create_index) {
            tiles.push(TileDescriptor::Event(ctx.event_tile(self.create_index, false, false)));
        }
        for &index in &self.ejected {
            tiles.push(TileDescriptor::Event(ctx.event_tile(index, false, false)));
        }
        tiles.push(TileDescriptor::RoomIntro {
            room_id: create.room_id.clone(),
            creator: create.sender_id().cloned(),
        });

        if !self.events.is_empty() {
            let creator_name = create.sender_name();
            let summary_text = if ctx.viewer.is_direct_room {
                format!("{creator_name} created this DM.")
            } else {
                format!("{creator_name} created and configured the room.")
            };
            tiles.push(TileDescriptor::GroupSummary(GroupSummary {
                kind: GroupKind::RoomCreation,
                key: "roomcreationsummary".to_owned(),
                tiles: grouped_tiles(ctx, &self.events, Some(self.create_index)),
                summary_members: create.sender.iter().cloned().collect(),
                summary_text,
                threshold: 0,
                start_expanded: false,
            }));
        }
        let mut state = self.state;
        tiles.extend(state.trailing_tiles());
        (state, tiles)
    }
}
