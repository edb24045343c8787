use crate::{
    event::{EventRecord, SenderProfile},
    timeline::{
        assembler::PassContext,
        render_plan::{GroupKind, GroupSummary, TileDescriptor},
    },
};
use super::{GroupState, grouped_tiles, summary_or_individual_tiles};

/// Fewer consecutive redactions than this are shown individually.
const REDACTION_GROUP_THRESHOLD: usize = 2;

/// Collapses a run of deleted messages into "N messages deleted."
pub(crate) struct RedactionGrouper {
    state: GroupState,
    events: Vec<usize>,
}

impl RedactionGrouper {
    pub fn can_start(ctx: &PassContext<'_>, index: usize) -> bool {
        ctx.is_shown(index) && ctx.event(index).is_redacted()
    }

    pub fn new(ctx: &PassContext<'_>, index: usize, prev: Option<usize>) -> Self {
        Self {
            state: GroupState::new(ctx, index, prev),
            events: vec![index],
        }
    }

    pub fn should_group(&self, ctx: &PassContext<'_>, index: usize) -> bool {
        // Swallow hidden events so that they don't split up a run of redactions.
        if !ctx.is_shown(index) {
            return true;
        }
        let event = ctx.event(index);
        if ctx.dates.wants_separator_before(Some(ctx.event(self.events[0])), event) {
            return false;
        }
        // In "show hidden events" mode, events without a proper tile ride along inside the group.
        event.is_redacted() || ctx.is_noise(index)
    }

    pub fn add(&mut self, ctx: &PassContext<'_>, index: usize) {
        self.state.absorb(ctx, index);
        if ctx.is_shown(index) {
            self.events.push(index);
        }
    }

    pub fn next_prev_event(&self) -> usize {
        self.events[self.events.len() - 1]
    }

    pub fn into_tiles(self, ctx: &PassContext<'_>) -> (GroupState, Vec<TileDescriptor>) {
        let first = self.events[0];
        let mut tiles = Vec::new();
        tiles.extend(self.state.leading_separator(ctx, first));

        let key = match self.state.prev {
            Some(_) => format!("redactioneventlistsummary-{}", ctx.event(first).event_id),
            None => "redactioneventlistsummary-initial".to_owned(),
        };
        let deleted: Vec<&EventRecord> = self.events.iter()
            .map(|&i| ctx.event(i))
            .filter(|e| e.is_redacted())
            .collect();
        let mut summary_members: Vec<SenderProfile> = Vec::new();
        for event in &deleted {
            if let Some(sender) = &event.sender
                && !summary_members.iter().any(|m| m.user_id == sender.user_id)
            {
                summary_members.push(sender.clone());
            }
        }
        let count = deleted.len();
        let summary_text = if count == 1 {
            "1 message deleted.".to_owned()
        } else {
            format!("{count} messages deleted.")
        };

        tiles.extend(summary_or_individual_tiles(GroupSummary {
            kind: GroupKind::Redaction,
            key,
            tiles: grouped_tiles(ctx, &self.events, self.state.prev),
            summary_members,
            summary_text,
            threshold: REDACTION_GROUP_THRESHOLD,
            start_expanded: false,
        }));
        let mut state = self.state;
        tiles.extend(state.trailing_tiles());
        (state, tiles)
    }
}
