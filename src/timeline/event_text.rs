//! Which kind of tile an event maps to, and the one-line text of textual tiles.

use serde_json::Value;

use crate::{
    event::{EventRecord, event_type},
    settings::RoomTimelineSettings,
};

/// The kind of tile that renders a given event type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileHandler {
    /// Messages, stickers and encrypted events.
    Message,
    /// A single line of text describing the event, e.g. "Alice changed the topic to ...".
    Textual,
    /// The banner linking an upgraded room to its predecessor.
    RoomCreate,
    RoomAvatar,
}

/// Returns the tile handler registered for the given event's type, if any.
pub fn tile_handler(event: &EventRecord) -> Option<TileHandler> {
    use event_type::*;
    let ty = event.event_type.as_str();
    if event.is_state() {
        match ty {
            ROOM_CREATE => Some(TileHandler::RoomCreate),
            ROOM_AVATAR => Some(TileHandler::RoomAvatar),
            ROOM_MEMBER | ROOM_THIRD_PARTY_INVITE | ROOM_NAME | ROOM_TOPIC
            | ROOM_CANONICAL_ALIAS | ROOM_ALIASES | ROOM_HISTORY_VISIBILITY
            | ROOM_ENCRYPTION | ROOM_POWER_LEVELS | ROOM_PINNED_EVENTS
            | ROOM_SERVER_ACL | ROOM_JOIN_RULES | ROOM_GUEST_ACCESS
            | ROOM_TOMBSTONE | WIDGET => Some(TileHandler::Textual),
            _ => None,
        }
    } else {
        match ty {
            ROOM_MESSAGE | STICKER | ROOM_ENCRYPTED => Some(TileHandler::Message),
            CALL_INVITE | CALL_ANSWER | CALL_HANGUP => Some(TileHandler::Textual),
            _ => None,
        }
    }
}

/// Returns whether a proper tile exists for the given event, ignoring the raw-source fallback.
pub fn has_tile(event: &EventRecord, settings: RoomTimelineSettings) -> bool {
    if event.is_replacement() {
        return false;
    }
    if event.is_redacted() && !event.is_message_like() {
        return false;
    }
    match tile_handler(event) {
        None => false,
        Some(TileHandler::Textual) => !text_for_event(event, settings).is_empty(),
        Some(TileHandler::RoomCreate) => event.content.contains_key("predecessor"),
        Some(TileHandler::Message | TileHandler::RoomAvatar) => true,
    }
}

/// Returns the text shown for a textual event, or an empty string if there is nothing to show.
pub fn text_for_event(event: &EventRecord, settings: RoomTimelineSettings) -> String {
    use event_type::*;
    match event.event_type.as_str() {
        ROOM_MEMBER => text_for_member_event(event, settings),
        ROOM_THIRD_PARTY_INVITE => text_for_third_party_invite(event),
        ROOM_NAME => text_for_room_name(event),
        ROOM_TOPIC => text_for_topic(event),
        ROOM_CANONICAL_ALIAS => text_for_canonical_alias(event),
        ROOM_ALIASES => text_for_aliases(event),
        ROOM_HISTORY_VISIBILITY => text_for_history_visibility(event),
        ROOM_ENCRYPTION => text_for_encryption(event),
        ROOM_POWER_LEVELS => text_for_power_levels(event),
        ROOM_PINNED_EVENTS => format!("{} changed the pinned messages for the room.", sender_name(event)),
        ROOM_SERVER_ACL => text_for_server_acl(event),
        ROOM_JOIN_RULES => text_for_join_rules(event),
        ROOM_GUEST_ACCESS => text_for_guest_access(event),
        ROOM_TOMBSTONE => format!("{} upgraded this room.", sender_name(event)),
        WIDGET => text_for_widget(event),
        CALL_INVITE => text_for_call_invite(event),
        CALL_ANSWER => format!("{} answered the call.", sender_name(event)),
        CALL_HANGUP => format!("{} ended the call.", sender_name(event)),
        _ => String::new(),
    }
}

/// The sender's display name, or "Someone" for events without a sender.
fn sender_name(event: &EventRecord) -> &str {
    match event.sender_name() {
        "" => "Someone",
        name => name,
    }
}

/// The display name of a membership event's target, falling back to its user ID.
pub fn target_name(event: &EventRecord) -> &str {
    event.content_str("displayname")
        .filter(|name| !name.is_empty())
        .or(event.state_key.as_deref())
        .unwrap_or_default()
}

fn reason_suffix(event: &EventRecord) -> String {
    event.content_str("reason")
        .filter(|reason| !reason.is_empty())
        .map(|reason| format!(" Reason: {reason}"))
        .unwrap_or_default()
}

fn text_for_member_event(event: &EventRecord, settings: RoomTimelineSettings) -> String {
    let sender = sender_name(event);
    let target = target_name(event);
    let reason = reason_suffix(event);
    let prev_membership = event.prev_membership();

    match event.membership() {
        Some("invite") => {
            match event.content.get("third_party_invite") {
                Some(Value::Object(invite)) => match invite.get("display_name").and_then(Value::as_str) {
                    Some(name) => format!("{target} accepted the invitation for {name}."),
                    None => format!("{target} accepted an invitation."),
                },
                _ => format!("{sender} invited {target}."),
            }
        }
        Some("ban") => format!("{sender} banned {target}.{reason}"),
        Some("join") if prev_membership == Some("join") => {
            let state_key = event.state_key.as_deref().unwrap_or_default();
            let prev_name = event.prev_content_str("displayname").filter(|n| !n.is_empty());
            let new_name = event.content_str("displayname").filter(|n| !n.is_empty());
            let prev_avatar = event.prev_content_str("avatar_url").filter(|a| !a.is_empty());
            let new_avatar = event.content_str("avatar_url").filter(|a| !a.is_empty());
            match (prev_name, new_name) {
                (Some(prev), Some(new)) if prev != new => {
                    return format!("{prev} changed their display name to {new}.");
                }
                (None, Some(new)) => return format!("{state_key} set their display name to {new}."),
                (Some(prev), None) => {
                    return format!("{state_key} removed their display name ({prev}).");
                }
                _ => {}
            }
            match (prev_avatar, new_avatar) {
                (Some(_), None) => format!("{sender} removed their profile picture."),
                (Some(prev), Some(new)) if prev != new => format!("{sender} changed their profile picture."),
                (None, Some(_)) => format!("{sender} set a profile picture."),
                // A rejoin that changed nothing is only worth showing in the raw "hidden events" mode.
                _ if settings.show_hidden_events => format!("{sender} made no change."),
                _ => String::new(),
            }
        }
        Some("join") => format!("{target} joined the room."),
        Some("leave") => {
            let is_self = event.sender_id().is_some_and(|s| Some(s.as_str()) == event.state_key.as_deref());
            match prev_membership {
                _ if is_self && prev_membership == Some("invite") => format!("{target} rejected the invitation."),
                _ if is_self => format!("{target} left the room."),
                Some("ban") => format!("{sender} unbanned {target}."),
                Some("join") => format!("{sender} kicked {target}.{reason}"),
                Some("invite") => format!("{sender} withdrew {target}'s invitation.{reason}"),
                _ => format!("{target} left the room."),
            }
        }
        _ => String::new(),
    }
}

fn text_for_third_party_invite(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("display_name") {
        Some(name) => format!("{sender} sent an invitation to {name} to join the room."),
        None => match event.prev_content_str("display_name") {
            Some(name) => format!("{sender} revoked the invitation for {name} to join the room."),
            None => String::new(),
        },
    }
}

fn text_for_room_name(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("name").filter(|n| !n.is_empty()) {
        Some(name) => format!("{sender} changed the room name to {name}."),
        None => format!("{sender} removed the room name."),
    }
}

fn text_for_topic(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("topic").filter(|t| !t.is_empty()) {
        Some(topic) => format!("{sender} changed the topic to \"{topic}\"."),
        None => format!("{sender} removed the topic."),
    }
}

fn text_for_canonical_alias(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("alias").filter(|a| !a.is_empty()) {
        Some(alias) => format!("{sender} set the main address for this room to {alias}."),
        None if event.prev_content_str("alias").is_some() => {
            format!("{sender} removed the main address for this room.")
        }
        None => String::new(),
    }
}

fn string_array<'a>(value: Option<&'a Value>) -> Vec<&'a str> {
    value.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn text_for_aliases(event: &EventRecord) -> String {
    let sender = sender_name(event);
    let current = string_array(event.content.get("aliases"));
    let previous = string_array(event.prev_content.as_ref().and_then(|p| p.get("aliases")));
    let added: Vec<&str> = current.iter().copied().filter(|a| !previous.contains(a)).collect();
    let removed: Vec<&str> = previous.iter().copied().filter(|a| !current.contains(a)).collect();
    match (added.is_empty(), removed.is_empty()) {
        (false, true) => format!("{sender} added {} as addresses for this room.", added.join(", ")),
        (true, false) => format!("{sender} removed {} as addresses for this room.", removed.join(", ")),
        (false, false) => format!(
            "{sender} added {} and removed {} as addresses for this room.",
            added.join(", "),
            removed.join(", "),
        ),
        (true, true) => String::new(),
    }
}

fn text_for_history_visibility(event: &EventRecord) -> String {
    let sender = sender_name(event);
    let audience = match event.content_str("history_visibility") {
        Some("invited") => "all room members, from the point they are invited.".to_owned(),
        Some("joined") => "all room members, from the point they joined.".to_owned(),
        Some("shared") => "all room members.".to_owned(),
        Some("world_readable") => "anyone.".to_owned(),
        other => format!("unknown ({}).", other.unwrap_or_default()),
    };
    format!("{sender} made future room history visible to {audience}")
}

fn text_for_encryption(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("algorithm") {
        Some("m.megolm.v1.aes-sha2") => format!("{sender} turned on end-to-end encryption."),
        Some(algorithm) => format!("{sender} turned on end-to-end encryption (unrecognised algorithm {algorithm})."),
        None => format!("{sender} turned on end-to-end encryption."),
    }
}

fn power_level_name(level: Option<i64>, users_default: i64) -> String {
    match level.unwrap_or(users_default) {
        100 => "Admin".to_owned(),
        50 => "Moderator".to_owned(),
        l if l == users_default => "Default".to_owned(),
        l => format!("Custom ({l})"),
    }
}

fn text_for_power_levels(event: &EventRecord) -> String {
    let Some(prev_users) = event.prev_content.as_ref()
        .and_then(|p| p.get("users"))
        .and_then(Value::as_object)
    else {
        return String::new();
    };
    let empty = serde_json::Map::new();
    let users = event.content.get("users").and_then(Value::as_object).unwrap_or(&empty);
    let users_default = event.content.get("users_default").and_then(Value::as_i64).unwrap_or(0);

    let mut user_ids: Vec<&String> = users.keys().collect();
    user_ids.extend(prev_users.keys().filter(|id| !users.contains_key(*id)));

    let diffs: Vec<String> = user_ids.into_iter()
        .filter_map(|user_id| {
            let from = prev_users.get(user_id).and_then(Value::as_i64);
            let to = users.get(user_id).and_then(Value::as_i64);
            (from != to).then(|| format!(
                "{user_id} from {} to {}",
                power_level_name(from, users_default),
                power_level_name(to, users_default),
            ))
        })
        .collect();
    if diffs.is_empty() {
        return String::new();
    }
    format!("{} changed the power level of {}.", sender_name(event), diffs.join(", "))
}

fn text_for_server_acl(event: &EventRecord) -> String {
    let sender = sender_name(event);
    if event.prev_content.as_ref().is_none_or(|p| p.is_empty()) {
        format!("{sender} set the server ACLs for this room.")
    } else {
        format!("{sender} changed the server ACLs for this room.")
    }
}

fn text_for_join_rules(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("join_rule") {
        Some("public") => format!("{sender} made the room public to whoever knows the link."),
        Some("invite") => format!("{sender} made the room invite only."),
        Some(rule) => format!("{sender} changed the join rule to {rule}."),
        None => String::new(),
    }
}

fn text_for_guest_access(event: &EventRecord) -> String {
    let sender = sender_name(event);
    match event.content_str("guest_access") {
        Some("can_join") => format!("{sender} has allowed guests to join the room."),
        Some("forbidden") => format!("{sender} has prevented guests from joining the room."),
        Some(access) => format!("{sender} changed guest access to {access}."),
        None => String::new(),
    }
}

fn text_for_widget(event: &EventRecord) -> String {
    let sender = sender_name(event);
    let name = event.content_str("name")
        .or_else(|| event.prev_content_str("name"))
        .unwrap_or("a");
    if event.content_str("url").is_some() {
        if event.prev_content_str("url").is_some() {
            format!("{sender} modified the {name} widget.")
        } else {
            format!("{sender} added the {name} widget.")
        }
    } else if event.prev_content_str("url").is_some() {
        format!("{sender} removed the {name} widget.")
    } else {
        String::new()
    }
}

fn text_for_call_invite(event: &EventRecord) -> String {
    let is_video = event.content.get("offer")
        .and_then(|offer| offer.get("sdp"))
        .and_then(Value::as_str)
        .is_some_and(|sdp| sdp.contains("m=video"));
    let kind = if is_video { "video" } else { "voice" };
    format!("{} placed a {kind} call.", sender_name(event))
}
