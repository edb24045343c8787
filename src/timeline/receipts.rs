//! Folding read receipts onto the events that are actually shown.

use std::{cmp::Reverse, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    event::{EventRecord, ReceiptRecord},
    identifiers::{OwnedEventId, OwnedUserId},
    settings::ViewerContext,
};
use super::visibility::VisibilityFilter;

/// Receipts to show under each shown event, most recent first.
pub type ReceiptsByEvent = IndexMap<OwnedEventId, Vec<ReceiptRecord>>;

/// Where a user's receipt was last shown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEntry {
    /// The shown event whose bucket held the receipt.
    pub event_id: OwnedEventId,
    pub receipt: ReceiptRecord,
}

/// The last known receipt bucket of every user, kept across assembly passes.
///
/// A receipt whose event is temporarily outside the timeline window keeps being shown
/// at its last known position instead of vanishing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFallback {
    entries: IndexMap<OwnedUserId, FallbackEntry>,
}

impl ReceiptFallback {
    pub fn get(&self, user_id: &OwnedUserId) -> Option<&FallbackEntry> {
        self.entries.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OwnedUserId, &FallbackEntry)> {
        self.entries.iter()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ReceiptAssembler<'a> {
    filter: &'a VisibilityFilter<'a>,
    viewer: &'a ViewerContext,
}

impl<'a> ReceiptAssembler<'a> {
    pub fn new(filter: &'a VisibilityFilter<'a>, viewer: &'a ViewerContext) -> Self {
        Self { filter, viewer }
    }

    /// Buckets every receipt under the last shown event at or before the event it acknowledges.
    ///
    /// Users without a bucket in this pass fall back to their entry in `fallback`, provided
    /// that entry's event is shown in this pass. Every user with a bucket overwrites their entry.
    pub fn assemble(
        &self,
        events: &[Arc<EventRecord>],
        receipts: &[ReceiptRecord],
        fallback: &mut ReceiptFallback,
    ) -> ReceiptsByEvent {
        if !self.viewer.show_read_receipts {
            return ReceiptsByEvent::new();
        }

        // Keep only the newest receipt per user.
        let mut latest_by_user: IndexMap<&OwnedUserId, &ReceiptRecord> = IndexMap::new();
        for receipt in receipts {
            if receipt.user_id == self.viewer.own_user_id || self.viewer.is_user_ignored(&receipt.user_id) {
                continue;
            }
            let is_newer = latest_by_user.get(&receipt.user_id)
                .is_none_or(|existing| existing.timestamp < receipt.timestamp);
            if is_newer {
                latest_by_user.insert(&receipt.user_id, receipt);
            }
        }
        let mut receipts_by_event_id: IndexMap<&OwnedEventId, Vec<&ReceiptRecord>> = IndexMap::new();
        for receipt in latest_by_user.values() {
            receipts_by_event_id.entry(&receipt.event_id).or_default().push(*receipt);
        }

        let mut buckets = ReceiptsByEvent::new();
        let mut bucketed_users: IndexMap<OwnedUserId, FallbackEntry> = IndexMap::new();
        let mut last_shown_event_id: Option<&OwnedEventId> = None;
        let mut shown_event_ids = Vec::new();

        for event in events {
            if self.filter.is_visible(event, false) {
                last_shown_event_id = Some(&event.event_id);
                shown_event_ids.push(&event.event_id);
            }
            let Some(receipts_here) = receipts_by_event_id.get(&event.event_id) else {
                continue;
            };
            let Some(bucket_id) = last_shown_event_id else {
                trace!("Receipts on {} precede every shown event", event.event_id);
                continue;
            };
            let bucket = buckets.entry(bucket_id.clone()).or_default();
            for receipt in receipts_here {
                bucket.push((*receipt).clone());
                bucketed_users.insert(receipt.user_id.clone(), FallbackEntry {
                    event_id: bucket_id.clone(),
                    receipt: (*receipt).clone(),
                });
            }
        }

        for user_id in latest_by_user.keys() {
            if bucketed_users.contains_key(*user_id) {
                continue;
            }
            let Some(entry) = fallback.entries.get(*user_id) else {
                continue;
            };
            if shown_event_ids.contains(&&entry.event_id) {
                trace!("Showing {user_id}'s receipt at its last known event {}", entry.event_id);
                buckets.entry(entry.event_id.clone()).or_default().push(entry.receipt.clone());
            }
        }

        for bucket in buckets.values_mut() {
            bucket.sort_by(|a, b| {
                Reverse(a.timestamp).cmp(&Reverse(b.timestamp)).then_with(|| a.user_id.cmp(&b.user_id))
            });
        }
        // Update the table in place: users without a bucket keep their previous entry.
        fallback.entries.extend(bucketed_users);
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        settings::{HiddenEventCategories, RoomTimelineSettings},
        test_fixtures::*,
    };

    fn hide_redactions() -> RoomTimelineSettings {
        RoomTimelineSettings { hidden: HiddenEventCategories::Redactions, show_hidden_events: false }
    }

    fn assemble_with(
        settings: RoomTimelineSettings,
        viewer: &ViewerContext,
        events: &[Arc<EventRecord>],
        receipts: &[ReceiptRecord],
        fallback: &mut ReceiptFallback,
    ) -> ReceiptsByEvent {
        let filter = VisibilityFilter::new(settings, viewer);
        ReceiptAssembler::new(&filter, viewer).assemble(events, receipts, fallback)
    }

    fn users(bucket: Option<&Vec<ReceiptRecord>>) -> Vec<&str> {
        bucket.map(|b| b.iter().map(|r| r.user_id.as_str()).collect()).unwrap_or_default()
    }

    #[test]
    fn receipt_on_hidden_event_folds_onto_earlier_shown_event() {
        let viewer = viewer(ALICE);
        let events = timeline(vec![
            message("$1", BOB, "one", at(0)),
            redacted("$2", BOB, at(1)),
            message("$3", BOB, "three", at(2)),
        ]);
        let receipts = [receipt(CAROL, "$2", at(3))];
        let buckets = assemble_with(hide_redactions(), &viewer, &events, &receipts, &mut Default::default());
        assert_eq!(users(buckets.get("$1")), vec![CAROL]);
        assert!(buckets.get("$3").is_none());
    }

    #[test]
    fn own_and_ignored_receipts_are_excluded() {
        let mut viewer = viewer(ALICE);
        viewer.ignored_users.insert(DAVE.into());
        let events = timeline(vec![message("$1", BOB, "one", at(0))]);
        let receipts = [
            receipt(ALICE, "$1", at(1)),
            receipt(DAVE, "$1", at(1)),
            receipt(BOB, "$1", at(1)),
        ];
        let buckets = assemble_with(Default::default(), &viewer, &events, &receipts, &mut Default::default());
        assert_eq!(users(buckets.get("$1")), vec![BOB]);
    }

    #[test]
    fn buckets_are_sorted_newest_first() {
        let viewer = viewer(ALICE);
        let events = timeline(vec![message("$1", BOB, "one", at(0))]);
        let receipts = [
            receipt(BOB, "$1", at(1)),
            receipt(DAVE, "$1", at(3)),
            receipt(CAROL, "$1", at(3)),
        ];
        let buckets = assemble_with(Default::default(), &viewer, &events, &receipts, &mut Default::default());
        assert_eq!(users(buckets.get("$1")), vec![CAROL, DAVE, BOB]);
    }

    #[test]
    fn newest_receipt_per_user_wins() {
        let viewer = viewer(ALICE);
        let events = timeline(vec![
            message("$1", BOB, "one", at(0)),
            message("$2", BOB, "two", at(1)),
        ]);
        let receipts = [receipt(CAROL, "$2", at(5)), receipt(CAROL, "$1", at(2))];
        let buckets = assemble_with(Default::default(), &viewer, &events, &receipts, &mut Default::default());
        assert_eq!(users(buckets.get("$2")), vec![CAROL]);
        assert!(buckets.get("$1").is_none());
    }

    #[test]
    fn fallback_keeps_receipts_whose_event_left_the_window() {
        let viewer = viewer(ALICE);
        let mut fallback = ReceiptFallback::default();
        let events = timeline(vec![
            message("$1", BOB, "one", at(0)),
            message("$2", BOB, "two", at(1)),
        ]);

        let first = assemble_with(Default::default(), &viewer, &events, &[receipt(CAROL, "$2", at(2))], &mut fallback);
        assert_eq!(users(first.get("$2")), vec![CAROL]);
        assert_eq!(fallback.get(&CAROL.into()).map(|e| e.event_id.as_str()), Some("$2"));

        // Carol read a newer event that is not paginated in yet.
        let second = assemble_with(Default::default(), &viewer, &events, &[receipt(CAROL, "$9", at(4))], &mut fallback);
        assert_eq!(users(second.get("$2")), vec![CAROL]);
        assert_eq!(second.get("$2").unwrap()[0].timestamp.as_millis(), at(2));

        // Once the event shows up, the stale entry is overwritten.
        let events = timeline(vec![
            message("$2", BOB, "two", at(1)),
            message("$9", BOB, "nine", at(3)),
        ]);
        let third = assemble_with(Default::default(), &viewer, &events, &[receipt(CAROL, "$9", at(4))], &mut fallback);
        assert_eq!(users(third.get("$9")), vec![CAROL]);
        assert!(third.get("$2").is_none());
        assert_eq!(fallback.get(&CAROL.into()).map(|e| e.event_id.as_str()), Some("$9"));
    }

    #[test]
    fn disabled_receipts_leave_the_fallback_untouched() {
        let mut viewer = viewer(ALICE);
        let mut fallback = ReceiptFallback::default();
        let events = timeline(vec![message("$1", BOB, "one", at(0))]);
        let receipts = [receipt(CAROL, "$1", at(2))];
        assemble_with(Default::default(), &viewer, &events, &receipts, &mut fallback);
        assert_eq!(fallback.len(), 1);

        viewer.show_read_receipts = false;
        let events = timeline(vec![message("$5", BOB, "five", at(0))]);
        let buckets = assemble_with(Default::default(), &viewer, &events, &receipts, &mut fallback);
        assert!(buckets.is_empty());
        assert_eq!(fallback.get(&CAROL.into()).map(|e| e.event_id.as_str()), Some("$1"));
    }

    #[test]
    fn distributed_receipts_are_conserved() {
        let viewer = viewer(ALICE);
        let events = timeline(vec![
            redacted("$0", BOB, at(0)),
            message("$1", BOB, "one", at(1)),
            redacted("$2", BOB, at(2)),
            message("$3", CAROL, "three", at(3)),
        ]);
        let receipts = [
            receipt(ALICE, "$3", at(5)),
            receipt(BOB, "$3", at(5)),
            receipt(CAROL, "$2", at(4)),
            // Precedes every shown event, and has no fallback.
            receipt(DAVE, "$0", at(4)),
        ];
        let buckets = assemble_with(hide_redactions(), &viewer, &events, &receipts, &mut Default::default());
        let distributed: usize = buckets.values().map(Vec::len).sum();
        assert_eq!(distributed, receipts.len() - 1 - 1);
    }
}
