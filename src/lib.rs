//! md-annotate
//!
//! Highlight annotations over rendered Markdown. Highlights decorate the
//! rendered view without touching the source text, survive re-rendering,
//! and are persisted per document across restarts.
//!
//! The host renders a document into a [`RenderedTree`], hands it to an
//! [`AnnotationEngine`], and forwards selections and color picks to it.

pub mod annotations;
pub mod config;
pub mod error;
pub mod string_utils;
pub mod tree;
pub mod view;

pub use annotations::{
    AnnotationEngine, ColorRef, ColorTable, DocumentKey, HighlightSpan, HighlightStorage,
    HostPoint, HostRange, JsonFileStorage, MemoryStorage, PaletteColor, RestoreOutcome,
    RestoreReport, SpanId,
};
pub use config::AnnotationSettings;
pub use error::{Error, Result};
pub use tree::{render_markdown, NodeId, NodeKind, RenderedTree};
pub use view::{build_view, ViewStyle, ViewText};
