//! The single forward pass that turns a slice of events into a [`RenderPlan`].

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::{
    event::{EventRecord, ReceiptRecord, SendStatus},
    settings::{RoomTimelineSettings, ViewerContext},
};
use super::{
    continuation::ContinuationDetector,
    date_boundary::DateBoundaryPolicy,
    event_text,
    grouping::{FlushedGroup, Grouper},
    receipts::{ReceiptAssembler, ReceiptFallback, ReceiptsByEvent},
    render_plan::{EventTile, GroupSpan, RenderPlan, TileDescriptor},
    visibility::VisibilityFilter,
};

/// Assembles timelines, keeping the receipt fallback table from one pass to the next.
#[derive(Debug, Default)]
pub struct TimelineAssembler {
    receipt_fallback: ReceiptFallback,
}

impl TimelineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a fallback table saved by an earlier assembler.
    pub fn with_receipt_fallback(receipt_fallback: ReceiptFallback) -> Self {
        Self { receipt_fallback }
    }

    pub fn receipt_fallback(&self) -> &ReceiptFallback {
        &self.receipt_fallback
    }

    pub fn assemble(
        &mut self,
        events: &[Arc<EventRecord>],
        receipts: &[ReceiptRecord],
        settings: RoomTimelineSettings,
        viewer: &ViewerContext,
    ) -> RenderPlan {
        assemble_timeline(events, receipts, settings, viewer, &mut self.receipt_fallback)
    }
}

/// Assembles the render plan of the given events.
///
/// `receipt_fallback` is read and updated in place; pass the same table to every
/// pass over the same room.
pub fn assemble_timeline(
    events: &[Arc<EventRecord>],
    receipts: &[ReceiptRecord],
    settings: RoomTimelineSettings,
    viewer: &ViewerContext,
    receipt_fallback: &mut ReceiptFallback,
) -> RenderPlan {
    let filter = VisibilityFilter::new(settings, viewer);
    let receipts_by_event = ReceiptAssembler::new(&filter, viewer)
        .assemble(events, receipts, receipt_fallback);
    let ctx = PassContext::new(events, viewer, &filter, receipts_by_event);

    let mut plan = RenderPlan::default();
    let mut prev: Option<usize> = None;
    let mut grouper: Option<Grouper> = None;

    for index in 0..events.len() {
        if let Some(open) = grouper.as_mut() && open.should_group(&ctx, index) {
            open.add(&ctx, index);
            continue;
        }
        if let Some(open) = grouper.take() {
            prev = Some(emit_group(&mut plan, open.flush(&ctx)));
        }
        if let Some(started) = Grouper::try_start(&ctx, index, prev) {
            trace!("Opening a {:?} group at {}", started.kind(), events[index].event_id);
            grouper = Some(started);
            continue;
        }

        if !ctx.is_shown(index) {
            plan.tiles.extend(ctx.placeholder_for(index));
            plan.tiles.extend(ctx.read_marker_for(index));
            continue;
        }
        plan.tiles.extend(ctx.tiles_for_event(index, prev, false));
        plan.tiles.extend(ctx.read_marker_for(index));
        prev = Some(index);
    }
    if let Some(open) = grouper.take() {
        emit_group(&mut plan, open.flush(&ctx));
    }

    if viewer.editing_event_id.is_none()
        && let Some(pending) = viewer.pending_edit_event_id.as_ref()
        && events.iter().any(|e| &e.event_id == pending)
    {
        plan.pending_edit = Some(pending.clone());
    }

    debug!(
        "Assembled {} tiles ({} groups) from {} events",
        plan.tiles.len(),
        plan.group_ranges.iter().count(),
        events.len(),
    );
    plan
}

/// Appends a flushed group to the plan and returns the index to use as the next previous event.
fn emit_group(plan: &mut RenderPlan, flushed: FlushedGroup) -> usize {
    debug_assert!(flushed.span.start < flushed.span.end, "a group must absorb at least one event");
    trace!("Closing a {:?} group over {:?}", flushed.kind, flushed.span);
    plan.group_ranges.insert(
        flushed.span.clone(),
        GroupSpan { kind: flushed.kind, first_index: flushed.span.start },
    );
    plan.tiles.extend(flushed.tiles);
    flushed.next_prev
}

/// Everything one pass computes up front and shares with the groupers.
pub(crate) struct PassContext<'a> {
    pub events: &'a [Arc<EventRecord>],
    pub viewer: &'a ViewerContext,
    pub filter: &'a VisibilityFilter<'a>,
    pub dates: DateBoundaryPolicy,
    receipts: ReceiptsByEvent,
    shown: Vec<bool>,
    last_shown_index: Option<usize>,
    last_shown_non_local_echo_index: Option<usize>,
}

impl<'a> PassContext<'a> {
    pub fn new(
        events: &'a [Arc<EventRecord>],
        viewer: &'a ViewerContext,
        filter: &'a VisibilityFilter<'a>,
        receipts: ReceiptsByEvent,
    ) -> Self {
        let shown: Vec<bool> = events.iter().map(|e| filter.is_visible(e, false)).collect();
        let last_shown_index = shown.iter().rposition(|&s| s);
        let last_shown_non_local_echo_index = events.iter()
            .zip(&shown)
            .rposition(|(e, &s)| s && !e.is_local_echo());
        Self {
            events,
            viewer,
            filter,
            dates: DateBoundaryPolicy::new(viewer),
            receipts,
            shown,
            last_shown_index,
            last_shown_non_local_echo_index,
        }
    }

    pub fn event(&self, index: usize) -> &'a EventRecord {
        &self.events[index]
    }

    pub fn is_shown(&self, index: usize) -> bool {
        self.shown.get(index).copied().unwrap_or(false)
    }

    /// Whether the event is only shown because the viewer turned on "show hidden events".
    pub fn is_noise(&self, index: usize) -> bool {
        self.filter.settings().show_hidden_events && !self.filter.is_visible(self.event(index), true)
    }

    /// The "could not be displayed" tile of a malformed event that would otherwise have a tile.
    pub fn placeholder_for(&self, index: usize) -> Option<TileDescriptor> {
        let event = self.event(index);
        if !event.is_malformed()
            || event_text::tile_handler(event).is_none()
            || event.sender_id().is_some_and(|sender| self.viewer.is_user_ignored(sender))
        {
            return None;
        }
        warn!("Event {} has no valid sender or timestamp, showing a placeholder", event.event_id);
        Some(TileDescriptor::Event(self.event_tile(index, false, false)))
    }

    /// The read marker placeholder if the viewer's marker sits on this event.
    ///
    /// The marker is hidden when nothing the viewer hasn't seen follows it.
    pub fn read_marker_for(&self, index: usize) -> Option<TileDescriptor> {
        let event = self.event(index);
        if self.viewer.read_marker_event_id.as_ref() != Some(&event.event_id) {
            return None;
        }
        let is_last = self.last_shown_non_local_echo_index.is_none_or(|last| index >= last);
        Some(TileDescriptor::ReadMarker {
            event_id: event.event_id.clone(),
            visible: self.viewer.read_marker_visible && !is_last,
        })
    }

    /// The tiles of one shown event: an optional date separator, then the event tile itself.
    ///
    /// Grouped events never get their own date separator.
    pub fn tiles_for_event(&self, index: usize, prev: Option<usize>, grouped: bool) -> Vec<TileDescriptor> {
        let event = self.event(index);
        let prev_event = prev.map(|p| self.event(p));
        let wants_separator = self.dates.wants_separator_before(prev_event, event);

        let mut tiles = Vec::with_capacity(2);
        if wants_separator && !grouped && let Some(timestamp) = self.dates.effective_timestamp(event) {
            tiles.push(TileDescriptor::DateSeparator { timestamp });
        }
        let continuation = !wants_separator
            && prev_event.is_some_and(|prev| ContinuationDetector::new(self.filter).is_continuation(prev, event));
        tiles.push(TileDescriptor::Event(self.event_tile(index, continuation, grouped)));
        tiles
    }

    pub fn event_tile(&self, index: usize, continuation: bool, grouped: bool) -> EventTile {
        let event = &self.events[index];
        EventTile {
            event: Arc::clone(event),
            renderer: self.filter.renderer_for(event),
            continuation,
            receipts: self.receipts.get(&event.event_id).cloned().unwrap_or_default(),
            highlighted: self.filter.is_highlighted(event),
            last: self.last_shown_index == Some(index),
            last_in_section: self.is_last_in_section(index),
            last_successful: self.is_last_successful(index),
            is_editing: self.viewer.editing_event_id.as_ref() == Some(&event.event_id),
            grouped,
        }
    }

    fn is_last_in_section(&self, index: usize) -> bool {
        match self.events.get(index + 1) {
            Some(next) => self.dates.wants_separator_before(Some(self.event(index)), next),
            None => true,
        }
    }

    fn is_last_successful(&self, index: usize) -> bool {
        fn is_sent(event: &EventRecord) -> bool {
            matches!(event.status, None | Some(SendStatus::Sent))
        }
        let event = self.event(index);
        if event.sender_id() != Some(&self.viewer.own_user_id) || !is_sent(event) {
            return false;
        }
        let next_index = index + 1;
        let next_with_tile = (next_index..self.events.len()).find(|&i| self.is_shown(i));
        let is_last_successful = if self.is_shown(next_index) {
            !is_sent(self.event(next_index))
        } else {
            true
        };
        // A hidden next event doesn't matter if a later shown one was sent.
        if let Some(later) = next_with_tile
            && later != next_index
            && is_sent(self.event(later))
        {
            return false;
        }
        is_last_successful
    }
}
