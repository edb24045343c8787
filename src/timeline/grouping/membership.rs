use crate::{
    event::event_type,
    timeline::{
        assembler::PassContext,
        event_text,
        render_plan::{GroupKind, GroupSummary, TileDescriptor},
    },
};
use super::{
    GroupState, grouped_tiles, summary_or_individual_tiles,
    membership_summary::{SUMMARY_LENGTH, generate_summary, summary_members},
};

// Minimum number of sequential membership events to collapse
const MIN_GROUP_SIZE_FOR_COLLAPSE: usize = 3;

/// Collapses a run of joins, leaves, invites and profile changes.
pub(crate) struct MembershipGrouper {
    state: GroupState,
    events: Vec<usize>,
}

impl MembershipGrouper {
    pub fn can_start(ctx: &PassContext<'_>, index: usize) -> bool {
        ctx.is_shown(index)
            && ctx.event(index).is_membership_change()
            && has_text(ctx, index)
    }

    pub fn new(ctx: &PassContext<'_>, index: usize, prev: Option<usize>) -> Self {
        Self {
            state: GroupState::new(ctx, index, prev),
            events: vec![index],
        }
    }

    pub fn should_group(&self, ctx: &PassContext<'_>, index: usize) -> bool {
        let event = ctx.event(index);
        if ctx.dates.wants_separator_before(Some(ctx.event(self.events[0])), event) {
            return false;
        }
        event.is_membership_change()
    }

    pub fn add(&mut self, ctx: &PassContext<'_>, index: usize) {
        self.state.absorb(ctx, index);
        if ctx.is_shown(index) && has_text(ctx, index) {
            self.events.push(index);
        }
    }

    pub fn next_prev_event(&self) -> usize {
        self.events[0]
    }

    pub fn into_tiles(self, ctx: &PassContext<'_>) -> (GroupState, Vec<TileDescriptor>) {
        let first = self.events[0];
        let mut tiles = Vec::new();
        tiles.extend(self.state.leading_separator(ctx, first));

        // The key must not change as more member events are appended to the group.
        let key = match self.state.prev {
            Some(_) => format!("membereventlistsummary-{}", ctx.event(first).event_id),
            None => "membereventlistsummary-initial".to_owned(),
        };
        let start_expanded = self.events.iter().any(|&i| ctx.filter.is_highlighted(ctx.event(i)));
        let events = || self.events.iter().map(|&i| ctx.event(i));

        tiles.extend(summary_or_individual_tiles(GroupSummary {
            kind: GroupKind::Membership,
            key,
            tiles: grouped_tiles(ctx, &self.events, self.state.prev),
            summary_members: summary_members(events()),
            summary_text: generate_summary(events(), SUMMARY_LENGTH),
            threshold: MIN_GROUP_SIZE_FOR_COLLAPSE,
            start_expanded,
        }));
        let mut state = self.state;
        tiles.extend(state.trailing_tiles());
        (state, tiles)
    }
}

/// Member events that don't describe anything (e.g. a no-op rejoin) are left out of the group.
fn has_text(ctx: &PassContext<'_>, index: usize) -> bool {
    let event = ctx.event(index);
    event.event_type != event_type::ROOM_MEMBER
        || !event_text::text_for_event(event, ctx.filter.settings()).is_empty()
}
