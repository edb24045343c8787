//! Deciding where date separators go.

use chrono::FixedOffset;

use crate::{
    event::{EventRecord, Timestamp},
    settings::ViewerContext,
    utils::{MILLIS_IN_DAY, weekday_of},
};

#[derive(Clone, Copy, Debug)]
pub struct DateBoundaryPolicy {
    timezone: FixedOffset,
    now: Timestamp,
    suppress_first_separator: bool,
}

impl DateBoundaryPolicy {
    pub fn new(viewer: &ViewerContext) -> Self {
        Self {
            timezone: viewer.timezone(),
            now: viewer.now,
            suppress_first_separator: viewer.suppress_first_date_separator,
        }
    }

    /// The timestamp an event is dated by: "now" for local echoes, its own timestamp otherwise.
    pub fn effective_timestamp(&self, event: &EventRecord) -> Option<Timestamp> {
        if event.is_local_echo() {
            Some(self.now)
        } else {
            event.timestamp
        }
    }

    /// Returns whether a date separator belongs between `prev` and an event dated `next_ts`.
    pub fn wants_separator(&self, prev: Option<&EventRecord>, next_ts: Option<Timestamp>) -> bool {
        let Some(next_ts) = next_ts else {
            return false;
        };
        let Some(prev) = prev else {
            return !self.suppress_first_separator;
        };
        let Some(prev_ts) = self.effective_timestamp(prev) else {
            return false;
        };
        if prev_ts.abs_diff(next_ts) > MILLIS_IN_DAY {
            return true;
        }
        // Within a day, only a change of weekday counts.
        match (weekday_of(prev_ts, &self.timezone), weekday_of(next_ts, &self.timezone)) {
            (Some(prev_day), Some(next_day)) => prev_day != next_day,
            _ => false,
        }
    }

    /// Same as [`Self::wants_separator`], dating `next` by its effective timestamp.
    pub fn wants_separator_before(&self, prev: Option<&EventRecord>, next: &EventRecord) -> bool {
        self.wants_separator(prev, self.effective_timestamp(next))
    }
}
