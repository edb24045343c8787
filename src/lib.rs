//! Assembles a Matrix room's timeline into an ordered plan of renderable tiles.
//!
//! The engine is a pure function of its inputs: an ordered slice of events, a snapshot of
//! read receipts, the viewer's settings and the viewer's context. See [`timeline`].

pub mod event;
pub mod identifiers;
pub mod settings;
pub mod snapshot;
pub mod timeline;
pub mod utils;

#[cfg(test)]
mod test_fixtures;

pub use event::{EventRecord, ReceiptRecord};
pub use settings::{RoomTimelineSettings, TimelineSettings, ViewerContext};
pub use timeline::{RenderPlan, TileDescriptor, TimelineAssembler, assemble_timeline};
