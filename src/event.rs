//! The records the timeline engine operates on: room events and read receipts.
//!
//! Both are read-only snapshots owned by the caller's timeline store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::identifiers::{OwnedEventId, OwnedRoomId, OwnedUserId};

/// The opaque `content` (or `prev_content`) object of an event.
pub type EventContent = serde_json::Map<String, Value>;

/// Event type tags the engine cares about.
pub mod event_type {
    pub const ROOM_MESSAGE: &str = "m.room.message";
    pub const STICKER: &str = "m.sticker";
    pub const ROOM_ENCRYPTED: &str = "m.room.encrypted";
    pub const CALL_INVITE: &str = "m.call.invite";
    pub const CALL_ANSWER: &str = "m.call.answer";
    pub const CALL_HANGUP: &str = "m.call.hangup";

    pub const ROOM_CREATE: &str = "m.room.create";
    pub const ROOM_MEMBER: &str = "m.room.member";
    pub const ROOM_THIRD_PARTY_INVITE: &str = "m.room.third_party_invite";
    pub const ROOM_NAME: &str = "m.room.name";
    pub const ROOM_TOPIC: &str = "m.room.topic";
    pub const ROOM_AVATAR: &str = "m.room.avatar";
    pub const ROOM_ALIASES: &str = "m.room.aliases";
    pub const ROOM_CANONICAL_ALIAS: &str = "m.room.canonical_alias";
    pub const ROOM_HISTORY_VISIBILITY: &str = "m.room.history_visibility";
    pub const ROOM_ENCRYPTION: &str = "m.room.encryption";
    pub const ROOM_POWER_LEVELS: &str = "m.room.power_levels";
    pub const ROOM_PINNED_EVENTS: &str = "m.room.pinned_events";
    pub const ROOM_SERVER_ACL: &str = "m.room.server_acl";
    pub const ROOM_JOIN_RULES: &str = "m.room.join_rules";
    pub const ROOM_GUEST_ACCESS: &str = "m.room.guest_access";
    pub const ROOM_TOMBSTONE: &str = "m.room.tombstone";
    pub const WIDGET: &str = "im.vector.modular.widgets";

    /// Types whose events may continue one another even when the types differ.
    pub const CONTINUABLE: [&str; 2] = [STICKER, ROOM_MESSAGE];
}

/// The relation type of an edit.
pub const REL_TYPE_REPLACE: &str = "m.replace";

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// The absolute distance between two timestamps, in milliseconds.
    pub fn abs_diff(self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }
}

/// The resolved profile of an event's sender at the time of the event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderProfile {
    pub user_id: OwnedUserId,
    /// The display name, falling back to the user ID when the member has none.
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl SenderProfile {
    pub fn new(user_id: impl Into<OwnedUserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// A reference from one event to another, e.g. an edit replacing an earlier message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub rel_type: String,
    pub event_id: OwnedEventId,
}

/// The sending state of a local echo.
///
/// Events received from the server have no status at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Encrypting,
    Queued,
    Sending,
    Sent,
    NotSent,
    Cancelled,
}

/// One immutable event of a room's timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: OwnedEventId,
    pub room_id: OwnedRoomId,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Present (possibly empty) for state events only.
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub sender: Option<SenderProfile>,
    /// `None` if the timestamp was missing or could not be parsed.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default)]
    pub content: EventContent,
    #[serde(default)]
    pub prev_content: Option<EventContent>,
    #[serde(default)]
    pub relates_to: Option<Relation>,
    #[serde(default)]
    pub status: Option<SendStatus>,
    #[serde(default)]
    pub txn_id: Option<String>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .filter(|millis| *millis >= 0)
        .map(Timestamp))
}

/// How a membership event changed the member's state, as far as visibility settings care.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub is_join: bool,
    /// The member left on their own, as opposed to being kicked or banned.
    pub is_part: bool,
    pub is_displayname_change: bool,
    pub is_avatar_change: bool,
}

impl EventRecord {
    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    pub fn is_redacted(&self) -> bool {
        self.redacted
    }

    pub fn sender_id(&self) -> Option<&OwnedUserId> {
        self.sender.as_ref().map(|s| &s.user_id)
    }

    /// The sender's display name, or their user ID, or an empty string for sender-less events.
    pub fn sender_name(&self) -> &str {
        self.sender.as_ref().map_or("", |s| s.display_name.as_str())
    }

    /// Whether this event is a local echo that hasn't been confirmed by the server yet.
    pub fn is_local_echo(&self) -> bool {
        self.status.is_some()
    }

    /// Whether this event lacks the sender or timestamp that every renderable event must have.
    pub fn is_malformed(&self) -> bool {
        self.sender.is_none() || self.timestamp.is_none()
    }

    /// Whether this event is an edit of another event.
    pub fn is_replacement(&self) -> bool {
        self.relates_to.as_ref().is_some_and(|r| r.rel_type == REL_TYPE_REPLACE)
    }

    pub fn is_membership_change(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            event_type::ROOM_MEMBER | event_type::ROOM_THIRD_PARTY_INVITE
        )
    }

    /// Messages, stickers and encrypted events: the events that still show a tile once redacted.
    pub fn is_message_like(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            event_type::ROOM_MESSAGE | event_type::STICKER | event_type::ROOM_ENCRYPTED
        )
    }

    /// Returns the string value of the given top-level `content` key.
    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }

    /// Returns the string value of the given top-level `prev_content` key.
    pub fn prev_content_str(&self, key: &str) -> Option<&str> {
        self.prev_content.as_ref()?.get(key).and_then(Value::as_str)
    }

    pub fn membership(&self) -> Option<&str> {
        self.content_str("membership")
    }

    pub fn prev_membership(&self) -> Option<&str> {
        self.prev_content_str("membership")
    }

    /// Computes how this membership event changed its target's membership.
    ///
    /// Returns `None` for anything other than an `m.room.member` event.
    pub fn membership_diff(&self) -> Option<MembershipDiff> {
        if self.event_type != event_type::ROOM_MEMBER {
            return None;
        }
        let membership = self.membership();
        let membership_changed = membership != self.prev_membership();
        let join_to_join = !membership_changed && membership == Some("join");
        let is_self_targeted = self.state_key.as_deref().is_some_and(|key|
            self.sender_id().is_some_and(|sender| sender == key)
        );
        Some(MembershipDiff {
            is_join: membership_changed && membership == Some("join"),
            is_part: membership_changed && membership == Some("leave") && is_self_targeted,
            is_displayname_change: join_to_join
                && self.content_str("displayname") != self.prev_content_str("displayname"),
            is_avatar_change: join_to_join
                && self.content_str("avatar_url") != self.prev_content_str("avatar_url"),
        })
    }
}

/// A user's acknowledgment that they have read up to (and including) `event_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub user_id: OwnedUserId,
    pub event_id: OwnedEventId,
    pub timestamp: Timestamp,
}
