//! Highlight annotations over rendered Markdown
//!
//! Highlights decorate the rendered view of a document without touching its
//! source. This module contains:
//! - `indexer`: flattened text offsets over the rendered tree
//! - `segmenter`: cutting ranges at block boundaries
//! - `mutator`: inserting and removing highlight wrappers
//! - `registry`: the non-overlapping span set of one document
//! - `persistence`: saved highlight sets, document keys and storage backends
//! - `restore`: relocating saved spans after a re-render or restart
//! - `selection`: host selection translation
//! - `engine`: the API the host application drives

pub mod color;
pub mod engine;
pub mod indexer;
pub mod mutator;
pub mod persistence;
pub mod registry;
pub mod restore;
pub mod segmenter;
pub mod selection;

pub use color::{parse_rgba, ColorRef, ColorTable, PaletteColor};
pub use engine::AnnotationEngine;
pub use indexer::{TextIndex, TextPosition};
pub use persistence::{
    DocumentKey, HighlightStorage, JsonFileStorage, MemoryStorage, PersistedHighlightSet,
    PersistedSpan,
};
pub use registry::{HighlightSpan, SpanId, SpanRegistry};
pub use restore::{restore_spans, RestoreOutcome, RestoreReport};
pub use segmenter::{segment_by_block, BlockSegment};
pub use selection::{from_host_selection, to_host_selection, HostPoint, HostRange};
