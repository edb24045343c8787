//! Builders for the events, receipts and viewers used throughout the unit tests.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    event::{EventContent, EventRecord, ReceiptRecord, SenderProfile, Timestamp, event_type},
    settings::ViewerContext,
};

pub const ROOM: &str = "!room:example.org";
pub const ALICE: &str = "@alice:example.org";
pub const BOB: &str = "@bob:example.org";
pub const CAROL: &str = "@carol:example.org";
pub const DAVE: &str = "@dave:example.org";

/// 2024-01-01T12:00:00Z, a Monday.
pub const MONDAY_NOON: i64 = 1_704_110_400_000;

/// Milliseconds `minutes` after [`MONDAY_NOON`].
pub fn at(minutes: i64) -> i64 {
    MONDAY_NOON + minutes * 60 * 1000
}

/// "@alice:example.org" -> "Alice"
pub fn display_name_of(user_id: &str) -> String {
    let localpart = user_id
        .trim_start_matches('@')
        .split(':')
        .next()
        .unwrap_or_default();
    let mut chars = localpart.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn profile(user_id: &str) -> SenderProfile {
    SenderProfile::new(user_id, display_name_of(user_id))
}

fn content_of(value: Value) -> EventContent {
    match value {
        Value::Object(map) => map,
        _ => EventContent::new(),
    }
}

/// A bare non-state event of the given type.
pub fn event(id: &str, ty: &str, sender: &str, ts: i64) -> EventRecord {
    EventRecord {
        event_id: id.into(),
        room_id: ROOM.into(),
        event_type: ty.to_owned(),
        state_key: None,
        sender: Some(profile(sender)),
        timestamp: Some(Timestamp(ts)),
        redacted: false,
        content: EventContent::new(),
        prev_content: None,
        relates_to: None,
        status: None,
        txn_id: None,
    }
}

pub fn message(id: &str, sender: &str, body: &str, ts: i64) -> EventRecord {
    EventRecord {
        content: content_of(json!({ "msgtype": "m.text", "body": body })),
        ..event(id, event_type::ROOM_MESSAGE, sender, ts)
    }
}

/// A redacted message: its content has been stripped.
pub fn redacted(id: &str, sender: &str, ts: i64) -> EventRecord {
    EventRecord {
        redacted: true,
        ..event(id, event_type::ROOM_MESSAGE, sender, ts)
    }
}

pub fn state_event(id: &str, ty: &str, sender: &str, content: Value, ts: i64) -> EventRecord {
    EventRecord {
        state_key: Some(String::new()),
        content: content_of(content),
        ..event(id, ty, sender, ts)
    }
}

pub fn create_event(id: &str, creator: &str, ts: i64) -> EventRecord {
    state_event(id, event_type::ROOM_CREATE, creator, json!({ "creator": creator }), ts)
}

/// An `m.room.member` event by `sender` about `state_key`.
///
/// A `prev_membership` of `Some` also gives the event a `prev_content`.
pub fn member_event(
    id: &str,
    sender: &str,
    state_key: &str,
    membership: &str,
    prev_membership: Option<&str>,
    ts: i64,
) -> EventRecord {
    EventRecord {
        state_key: Some(state_key.to_owned()),
        content: content_of(json!({
            "membership": membership,
            "displayname": display_name_of(state_key),
        })),
        prev_content: prev_membership.map(|prev| content_of(json!({
            "membership": prev,
            "displayname": display_name_of(state_key),
        }))),
        ..event(id, event_type::ROOM_MEMBER, sender, ts)
    }
}

/// `user` joining the room on their own.
pub fn join(id: &str, user: &str, ts: i64) -> EventRecord {
    member_event(id, user, user, "join", None, ts)
}

pub fn receipt(user_id: &str, event_id: &str, ts: i64) -> ReceiptRecord {
    ReceiptRecord {
        user_id: user_id.into(),
        event_id: event_id.into(),
        timestamp: Timestamp(ts),
    }
}

/// A viewer in UTC whose "now" is one day after [`MONDAY_NOON`].
pub fn viewer(own_user_id: &str) -> ViewerContext {
    ViewerContext {
        now: Timestamp(at(24 * 60)),
        utc_offset_secs: 0,
        ..ViewerContext::new(own_user_id)
    }
}

pub fn timeline(events: Vec<EventRecord>) -> Vec<Arc<EventRecord>> {
    events.into_iter().map(Arc::new).collect()
}
