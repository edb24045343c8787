//! Deciding whether an event gets a tile at all.

use crate::{
    event::EventRecord,
    settings::{HiddenEventCategories, RoomTimelineSettings, ViewerContext},
};
use super::{
    event_text::{self, TileHandler},
    render_plan::TileRenderer,
};

/// Decides per event whether it is eligible to produce a tile, and which renderer draws it.
#[derive(Clone, Copy, Debug)]
pub struct VisibilityFilter<'a> {
    settings: RoomTimelineSettings,
    viewer: &'a ViewerContext,
}

impl<'a> VisibilityFilter<'a> {
    pub fn new(settings: RoomTimelineSettings, viewer: &'a ViewerContext) -> Self {
        Self { settings, viewer }
    }

    pub fn settings(&self) -> RoomTimelineSettings {
        self.settings
    }

    /// Returns whether the given event should be shown.
    ///
    /// With `force_hidden_override`, the "show hidden events" setting is treated as off.
    pub fn is_visible(&self, event: &EventRecord, force_hidden_override: bool) -> bool {
        if event.is_malformed() {
            return false;
        }
        if event.sender_id().is_some_and(|sender| self.viewer.is_user_ignored(sender)) {
            return false;
        }
        let settings = self.effective_settings(force_hidden_override);
        if settings.show_hidden_events {
            return true;
        }
        if self.is_highlighted(event) {
            return true;
        }
        if !event_text::has_tile(event, settings) {
            return false;
        }
        !should_hide_event(event, settings)
    }

    /// Returns whether a proper tile (not the raw-source fallback) exists for the event.
    pub fn has_tile(&self, event: &EventRecord) -> bool {
        event_text::has_tile(event, self.settings)
    }

    /// Returns whether the event is the one the viewer navigated to.
    pub fn is_highlighted(&self, event: &EventRecord) -> bool {
        self.viewer.highlighted_event_id.as_ref() == Some(&event.event_id)
    }

    /// Picks the renderer for an event that is being emitted as a tile.
    pub fn renderer_for(&self, event: &EventRecord) -> TileRenderer {
        if event.is_malformed() {
            return TileRenderer::Unrenderable;
        }
        if !self.has_tile(event) {
            return if self.settings.show_hidden_events || self.is_highlighted(event) {
                TileRenderer::HiddenEvent
            } else {
                TileRenderer::Unrenderable
            };
        }
        match event_text::tile_handler(event) {
            Some(TileHandler::Message) => TileRenderer::Message,
            Some(TileHandler::Textual) => TileRenderer::Textual {
                text: event_text::text_for_event(event, self.settings),
            },
            Some(TileHandler::RoomCreate) => TileRenderer::RoomCreate,
            Some(TileHandler::RoomAvatar) => TileRenderer::RoomAvatar,
            None => TileRenderer::Unrenderable,
        }
    }

    fn effective_settings(&self, force_hidden_override: bool) -> RoomTimelineSettings {
        if force_hidden_override {
            self.settings.without_hidden_events()
        } else {
            self.settings
        }
    }
}

/// Returns whether the viewer's category settings hide the given event.
pub fn should_hide_event(event: &EventRecord, settings: RoomTimelineSettings) -> bool {
    if event.is_redacted() && settings.hides(HiddenEventCategories::Redactions) {
        return true;
    }
    // Edits are folded into the event they replace.
    if event.is_replacement() {
        return true;
    }
    let Some(diff) = event.membership_diff() else {
        return false;
    };
    ((diff.is_join || diff.is_part) && settings.hides(HiddenEventCategories::JoinLeaves))
        || (diff.is_avatar_change && settings.hides(HiddenEventCategories::AvatarChanges))
        || (diff.is_displayname_change && settings.hides(HiddenEventCategories::DisplaynameChanges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::*;

    fn settings(hidden: HiddenEventCategories) -> RoomTimelineSettings {
        RoomTimelineSettings { hidden, show_hidden_events: false }
    }

    #[test]
    fn ignored_senders_are_never_visible() {
        let mut viewer = viewer(ALICE);
        viewer.ignored_users.insert(BOB.into());
        viewer.highlighted_event_id = Some("$1".into());
        let show_all = RoomTimelineSettings { show_hidden_events: true, ..Default::default() };
        let filter = VisibilityFilter::new(show_all, &viewer);
        assert!(!filter.is_visible(&message("$1", BOB, "hi", 0), false));
        assert!(filter.is_visible(&message("$2", CAROL, "hi", 0), false));
    }

    #[test]
    fn unknown_types_need_show_hidden_events() {
        let viewer = viewer(ALICE);
        let custom = event("$1", "org.example.custom", BOB, 0);

        let filter = VisibilityFilter::new(Default::default(), &viewer);
        assert!(!filter.is_visible(&custom, false));

        let show_all = RoomTimelineSettings { show_hidden_events: true, ..Default::default() };
        let filter = VisibilityFilter::new(show_all, &viewer);
        assert!(filter.is_visible(&custom, false));
        assert!(!filter.is_visible(&custom, true));
        assert_eq!(filter.renderer_for(&custom), TileRenderer::HiddenEvent);
    }

    #[test]
    fn category_settings_hide_matching_membership_changes() {
        let viewer = viewer(ALICE);
        let joined = member_event("$1", BOB, BOB, "join", Some("leave"), 0);
        let kicked = member_event("$2", ALICE, BOB, "leave", Some("join"), 0);
        let mut renamed = member_event("$3", BOB, BOB, "join", Some("join"), 0);
        renamed.content.insert("displayname".into(), "Robert".into());

        let filter = VisibilityFilter::new(settings(HiddenEventCategories::JoinLeaves), &viewer);
        assert!(!filter.is_visible(&joined, false));
        assert!(filter.is_visible(&kicked, false));
        assert!(filter.is_visible(&renamed, false));

        let filter = VisibilityFilter::new(settings(HiddenEventCategories::DisplaynameChanges), &viewer);
        assert!(filter.is_visible(&joined, false));
        assert!(!filter.is_visible(&renamed, false));
    }

    #[test]
    fn highlighted_event_is_always_visible() {
        let mut viewer = viewer(ALICE);
        let deleted = redacted("$1", BOB, 0);
        let filter = VisibilityFilter::new(settings(HiddenEventCategories::Redactions), &viewer);
        assert!(!filter.is_visible(&deleted, false));

        viewer.highlighted_event_id = Some("$1".into());
        let filter = VisibilityFilter::new(settings(HiddenEventCategories::Redactions), &viewer);
        assert!(filter.is_visible(&deleted, false));
    }

    #[test]
    fn malformed_events_are_invisible_and_unrenderable() {
        let viewer = viewer(ALICE);
        let mut broken = message("$1", BOB, "hi", 0);
        broken.timestamp = None;
        let show_all = RoomTimelineSettings { show_hidden_events: true, ..Default::default() };
        let filter = VisibilityFilter::new(show_all, &viewer);
        assert!(!filter.is_visible(&broken, false));
        assert_eq!(filter.renderer_for(&broken), TileRenderer::Unrenderable);
    }
}
