//! Deciding when a tile can drop its sender header because it continues the previous one.

use crate::event::{EventRecord, event_type};
use super::visibility::VisibilityFilter;

/// Events further apart than this always start a new sender block.
pub const CONTINUATION_MAX_INTERVAL_MS: i64 = 5 * 60 * 1000;

#[derive(Clone, Copy, Debug)]
pub struct ContinuationDetector<'a> {
    filter: &'a VisibilityFilter<'a>,
}

impl<'a> ContinuationDetector<'a> {
    pub fn new(filter: &'a VisibilityFilter<'a>) -> Self {
        Self { filter }
    }

    /// Returns whether `curr` continues the sender block started by (or containing) `prev`.
    pub fn is_continuation(&self, prev: &EventRecord, curr: &EventRecord) -> bool {
        let (Some(prev_sender), Some(curr_sender)) = (prev.sender.as_ref(), curr.sender.as_ref()) else {
            return false;
        };
        let (Some(prev_ts), Some(curr_ts)) = (prev.timestamp, curr.timestamp) else {
            return false;
        };
        if curr_ts.as_millis().saturating_sub(prev_ts.as_millis()) > CONTINUATION_MAX_INTERVAL_MS {
            return false;
        }
        if prev.is_redacted() != curr.is_redacted() {
            return false;
        }
        if prev.event_type != curr.event_type
            && !(event_type::CONTINUABLE.contains(&prev.event_type.as_str())
                && event_type::CONTINUABLE.contains(&curr.event_type.as_str()))
        {
            return false;
        }
        // A change of name or avatar must be visible on the next message.
        if prev_sender != curr_sender {
            return false;
        }
        self.filter.has_tile(prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{settings::RoomTimelineSettings, test_fixtures::*};

    fn check(prev: &EventRecord, curr: &EventRecord) -> bool {
        let viewer = viewer(ALICE);
        let filter = VisibilityFilter::new(RoomTimelineSettings::default(), &viewer);
        ContinuationDetector::new(&filter).is_continuation(prev, curr)
    }

    #[test]
    fn messages_within_five_minutes_continue() {
        let first = message("$1", BOB, "hi", at(0));
        assert!(check(&first, &message("$2", BOB, "again", at(0) + 30_000)));
        assert!(check(&first, &message("$3", BOB, "again", at(5))));
        assert!(!check(&first, &message("$4", BOB, "later", at(10))));
    }

    #[test]
    fn different_senders_or_profiles_break_the_block() {
        let first = message("$1", BOB, "hi", at(0));
        assert!(!check(&first, &message("$2", CAROL, "hi", at(1))));

        let mut renamed = message("$3", BOB, "hi", at(1));
        renamed.sender.as_mut().unwrap().display_name = "Robert".into();
        assert!(!check(&first, &renamed));

        let mut new_avatar = message("$4", BOB, "hi", at(1));
        new_avatar.sender.as_mut().unwrap().avatar_url = Some("mxc://example.org/b".into());
        assert!(!check(&first, &new_avatar));
    }

    #[test]
    fn stickers_continue_messages_but_other_types_do_not() {
        let first = message("$1", BOB, "hi", at(0));
        let sticker = event("$2", event_type::STICKER, BOB, at(1));
        assert!(check(&first, &sticker));

        let call = event("$3", event_type::CALL_INVITE, BOB, at(1));
        assert!(!check(&first, &call));
    }

    #[test]
    fn redaction_state_must_match() {
        let first = message("$1", BOB, "hi", at(0));
        assert!(!check(&first, &redacted("$2", BOB, at(1))));
        assert!(check(&redacted("$3", BOB, at(0)), &redacted("$4", BOB, at(1))));
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let ancient = message("$1", BOB, "hi", i64::MIN);
        let far_future = message("$2", BOB, "hi", i64::MAX);
        assert!(!check(&ancient, &far_future));
        assert!(check(&far_future, &ancient));
    }

    #[test]
    fn predecessor_without_a_tile_does_not_count() {
        let custom = event("$1", "org.example.custom", BOB, at(0));
        let again = event("$2", "org.example.custom", BOB, at(1));
        assert!(!check(&custom, &again));
    }
}
