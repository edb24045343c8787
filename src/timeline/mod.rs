//! The timeline assembly engine.
//!
//! One call to [`assemble_timeline`] walks an ordered slice of room events exactly once
//! and produces the [`RenderPlan`] the rendering layer draws: event tiles, group summaries,
//! date separators and read marker placeholders.

pub mod assembler;
pub mod continuation;
pub mod date_boundary;
pub mod event_text;
pub mod grouping;
pub mod receipts;
pub mod render_plan;
pub mod visibility;

pub use assembler::{TimelineAssembler, assemble_timeline};
pub use receipts::{ReceiptFallback, ReceiptsByEvent};
pub use render_plan::{
    EventTile, GroupKind, GroupSummary, RenderPlan, TileDescriptor, TileRenderer,
};
