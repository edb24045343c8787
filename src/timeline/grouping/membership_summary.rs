//! Summaries of membership groups, e.g. "Alice joined and left, Bob and Carol joined".

use indexmap::IndexMap;

use crate::{
    event::{EventRecord, SenderProfile, event_type},
    identifiers::OwnedUserId,
};

/// Maximum number of user names to display before coalescing.
pub const SUMMARY_LENGTH: usize = 4;

/// What a single membership event did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransitionType {
    Joined,
    Left,
    JoinedAndLeft,
    LeftAndJoined,
    InvitationRejected,
    InvitationRevoked,
    Invited,
    Banned,
    Unbanned,
    Kicked,
    ChangedName,
    ChangedAvatar,
    NoChange,
}

impl TransitionType {
    /// Classifies a membership or third-party invite event. Returns `None` for any other event.
    pub fn of(event: &EventRecord) -> Option<Self> {
        if event.event_type == event_type::ROOM_THIRD_PARTY_INVITE {
            return Some(TransitionType::Invited);
        }
        let diff = event.membership_diff()?;
        let prev = event.prev_membership();
        let is_self = event.sender_id().is_some_and(|s| Some(s.as_str()) == event.state_key.as_deref());
        Some(match event.membership() {
            Some("invite") => TransitionType::Invited,
            Some("ban") => TransitionType::Banned,
            Some("join") if prev == Some("join") => {
                if diff.is_displayname_change {
                    TransitionType::ChangedName
                } else if diff.is_avatar_change {
                    TransitionType::ChangedAvatar
                } else {
                    TransitionType::NoChange
                }
            }
            Some("join") => TransitionType::Joined,
            Some("leave") if is_self && prev == Some("invite") => TransitionType::InvitationRejected,
            Some("leave") if is_self => TransitionType::Left,
            Some("leave") => match prev {
                Some("ban") => TransitionType::Unbanned,
                Some("invite") => TransitionType::InvitationRevoked,
                Some("join") => TransitionType::Kicked,
                _ => TransitionType::Left,
            },
            _ => TransitionType::NoChange,
        })
    }
}

/// Condensed version of a membership event, used for generating summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UserEvent {
    transition: TransitionType,
    /// The user the event is about: the state key, falling back to the sender.
    user_id: OwnedUserId,
    display_name: String,
    avatar_url: Option<String>,
}

impl UserEvent {
    fn from_event(event: &EventRecord) -> Option<Self> {
        let transition = TransitionType::of(event)?;
        let user_id = get_effective_user_id(event)?;
        let display_name = event.content_str("displayname")
            .or_else(|| event.content_str("display_name"))
            .filter(|name| !name.is_empty())
            .map_or_else(|| user_id.to_string(), str::to_owned);
        Some(UserEvent {
            transition,
            avatar_url: event.content_str("avatar_url").map(str::to_owned),
            user_id,
            display_name,
        })
    }
}

/// Gets the effective user ID for an event, preferring the state key over the sender.
/// The state key is the user being affected by a membership change.
fn get_effective_user_id(event: &EventRecord) -> Option<OwnedUserId> {
    match event.state_key.as_deref() {
        Some(state_key) if !state_key.is_empty() => Some(state_key.into()),
        _ => event.sender_id().cloned(),
    }
}

/// Groups each user's events in order of their first appearance.
fn user_events_map<'e>(events: impl IntoIterator<Item = &'e EventRecord>) -> IndexMap<OwnedUserId, Vec<UserEvent>> {
    let mut map: IndexMap<OwnedUserId, Vec<UserEvent>> = IndexMap::new();
    for user_event in events.into_iter().filter_map(UserEvent::from_event) {
        map.entry(user_event.user_id.clone()).or_default().push(user_event);
    }
    map
}

/// Combines neighboring transitions into compound actions, e.g. [Joined, Left] -> [JoinedAndLeft]
fn merge_adjacent_transitions(transitions: &[TransitionType]) -> Vec<TransitionType> {
    let mut res = Vec::new();
    let mut i = 0;
    while i < transitions.len() {
        let t = transitions[i];
        if let Some(&t2) = transitions.get(i + 1) {
            match (t, t2) {
                (TransitionType::Joined, TransitionType::Left) => {
                    res.push(TransitionType::JoinedAndLeft);
                    i += 2;
                    continue;
                }
                (TransitionType::Left, TransitionType::Joined) => {
                    res.push(TransitionType::LeftAndJoined);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        res.push(t);
        i += 1;
    }
    res
}

/// Groups consecutive identical transitions with their count (e.g. [JoinedAndLeft, JoinedAndLeft] -> (JoinedAndLeft, 2))
fn group_repeated_transitions(transitions: &[TransitionType]) -> Vec<(TransitionType, usize)> {
    let mut res: Vec<(TransitionType, usize)> = Vec::new();
    for &t in transitions {
        if let Some((last, count)) = res.last_mut()
            && *last == t
        {
            *count += 1;
            continue;
        }
        res.push((t, 1));
    }
    res
}

/// Creates human-readable text for a transition type with user count and repetition count
fn format_transition_text(
    transition: TransitionType,
    user_count: usize,
    repeat_count: usize,
) -> String {
    let is_plural = user_count > 1;
    let text = match transition {
        TransitionType::Joined if is_plural => "joined",
        TransitionType::Joined => "joined the room",
        TransitionType::Left if is_plural => "left",
        TransitionType::Left => "left the room",
        TransitionType::JoinedAndLeft => "joined and left",
        TransitionType::LeftAndJoined => "left and rejoined",
        TransitionType::ChangedName => "changed their name",
        TransitionType::ChangedAvatar => "changed their profile picture",
        TransitionType::Invited => "was invited",
        TransitionType::Banned => "was banned",
        TransitionType::Unbanned => "was unbanned",
        TransitionType::InvitationRejected => "rejected invite",
        TransitionType::InvitationRevoked => "invite withdrawn",
        TransitionType::Kicked => "was kicked",
        TransitionType::NoChange => "made no changes",
    };
    if repeat_count > 1 {
        format!("{text} (×{repeat_count})")
    } else {
        text.to_owned()
    }
}

/// Produce an English-readable name list, with "and N others"
pub fn format_user_list(user_names: &[String], max_display_count: usize) -> String {
    match user_names.len() {
        0 => "".into(),
        1 => user_names[0].clone(),
        2 => format!("{} and {}", user_names[0], user_names[1]),
        n if n <= max_display_count => {
            let all_but_last = &user_names[..n - 1];
            let last = &user_names[n - 1];
            format!("{}, and {}", all_but_last.join(", "), last)
        }
        n => format!(
            "{}, and {} others",
            user_names[..max_display_count].join(", "),
            n - max_display_count
        ),
    }
}

/// Generates the summary of a membership group.
///
/// Users whose transitions canonicalize to the same sequence share one clause.
pub fn generate_summary<'e>(
    events: impl IntoIterator<Item = &'e EventRecord>,
    summary_length: usize,
) -> String {
    // Aggregate by transition sequence
    let mut aggregates: Vec<(Vec<TransitionType>, Vec<String>)> = Vec::new();

    for (_, user_events) in user_events_map(events) {
        let transitions: Vec<TransitionType> = user_events.iter().map(|e| e.transition).collect();
        let canonical = merge_adjacent_transitions(&transitions);
        let name = user_events[0].display_name.clone();

        if let Some((_, names)) = aggregates.iter_mut().find(|(seq, _)| seq == &canonical) {
            names.push(name);
        } else {
            aggregates.push((canonical, vec![name]));
        }
    }

    let mut summary_parts = Vec::new();
    for (canonical, names) in aggregates {
        let descs: Vec<String> = group_repeated_transitions(&canonical)
            .into_iter()
            .map(|(transition, repeat_count)| format_transition_text(transition, names.len(), repeat_count))
            .collect();
        summary_parts.push(format!("{} {}", format_user_list(&names, summary_length), descs.join(", ")));
    }
    summary_parts.join(", ")
}

/// The distinct users affected by a membership group, in order of first appearance.
pub fn summary_members<'e>(events: impl IntoIterator<Item = &'e EventRecord>) -> Vec<SenderProfile> {
    user_events_map(events)
        .into_values()
        .map(|user_events| {
            let first = &user_events[0];
            SenderProfile {
                user_id: first.user_id.clone(),
                display_name: first.display_name.clone(),
                avatar_url: first.avatar_url.clone(),
            }
        })
        .collect()
}
