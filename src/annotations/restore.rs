//! Relocating saved spans in a freshly rendered tree
//!
//! A saved span is re-applied at its saved offset when the text there still
//! matches its snapshot. Otherwise the snapshot is searched for near the
//! saved offset, then (if enabled) in the whole document. First occurrence
//! wins in both searches. Spans that cannot be found are dropped with a
//! warning and the rest are restored regardless.

use super::color::ColorTable;
use super::indexer::TextIndex;
use super::persistence::{PersistedHighlightSet, PersistedSpan};
use super::registry::{SpanId, SpanRegistry};
use crate::config::AnnotationSettings;
use crate::string_utils::{char_count, find_in_char_range};
use crate::tree::RenderedTree;
use log::{debug, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to one saved span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Found at its saved offset
    Exact { id: SpanId, offset: usize },
    /// Found by searching around its saved offset
    Windowed { id: SpanId, from: usize, to: usize },
    /// Found by searching the whole document
    FullSearch { id: SpanId, from: usize, to: usize },
    /// Not found, or could not be applied
    Dropped { text: String },
}

impl RestoreOutcome {
    /// Id of the restored span.
    pub fn span_id(&self) -> Option<SpanId> {
        match self {
            RestoreOutcome::Exact { id, .. }
            | RestoreOutcome::Windowed { id, .. }
            | RestoreOutcome::FullSearch { id, .. } => Some(*id),
            RestoreOutcome::Dropped { .. } => None,
        }
    }
}

/// Outcome of restoring one saved set, in saved order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub outcomes: Vec<RestoreOutcome>,
}

impl RestoreReport {
    /// Number of spans placed back in the tree.
    pub fn restored(&self) -> usize {
        self.outcomes.len() - self.dropped()
    }

    /// Number of spans given up on.
    pub fn dropped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RestoreOutcome::Dropped { .. }))
            .count()
    }

    /// Restoring succeeds whenever it runs to completion; drops are partial success.
    pub fn is_success(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Relocation
// ─────────────────────────────────────────────────────────────────────────────

/// How a saved span was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Located {
    Exact,
    Windowed,
    FullSearch,
}

/// Find where `saved` now lives. Returns the start offset, length and how it
/// was found.
fn locate(
    index: &TextIndex,
    saved: &PersistedSpan,
    settings: &AnnotationSettings,
) -> Option<(usize, usize, Located)> {
    if saved.text.is_empty() {
        return None;
    }
    if index
        .slice_text(saved.offset, saved.length)
        .is_ok_and(|text| text == saved.text)
    {
        return Some((saved.offset, saved.length, Located::Exact));
    }

    let len = char_count(&saved.text);
    let window = settings.fuzzy_window;
    let from = saved.offset.saturating_sub(window);
    let to = saved
        .offset
        .saturating_add(saved.length)
        .saturating_add(window)
        .min(index.len());
    if let Some(found) = find_in_char_range(index.text(), &saved.text, from, to) {
        return Some((found, len, Located::Windowed));
    }

    if settings.full_document_fallback {
        if let Some(found) = find_in_char_range(index.text(), &saved.text, 0, index.len()) {
            return Some((found, len, Located::FullSearch));
        }
    }
    None
}

/// Re-apply every span of `set` to `tree` through `registry`, in saved order.
pub fn restore_spans(
    tree: &mut RenderedTree,
    registry: &mut SpanRegistry,
    set: &PersistedHighlightSet,
    colors: &ColorTable,
    settings: &AnnotationSettings,
) -> RestoreReport {
    // Wrapping never changes the flattened text, so one index serves every span
    let index = TextIndex::build(tree);
    let mut report = RestoreReport::default();

    for saved in &set.spans {
        let Some((start, len, located)) = locate(&index, saved, settings) else {
            warn!(
                "Dropping saved highlight {:?} at {}+{}: text not found",
                saved.text, saved.offset, saved.length
            );
            report.outcomes.push(RestoreOutcome::Dropped {
                text: saved.text.clone(),
            });
            continue;
        };

        let color = colors.resolve(&saved.color, settings.default_color);
        let Some(id) = registry.apply(tree, start, len, color) else {
            warn!(
                "Dropping saved highlight {:?}: could not apply at {}+{}",
                saved.text, start, len
            );
            report.outcomes.push(RestoreOutcome::Dropped {
                text: saved.text.clone(),
            });
            continue;
        };

        let outcome = match located {
            Located::Exact => {
                debug!("Restored span {} at saved offset {}", id, start);
                RestoreOutcome::Exact { id, offset: start }
            }
            Located::Windowed => {
                info!(
                    "Relocated highlight {:?} from {} to {} (nearby search)",
                    saved.text, saved.offset, start
                );
                RestoreOutcome::Windowed {
                    id,
                    from: saved.offset,
                    to: start,
                }
            }
            Located::FullSearch => {
                info!(
                    "Relocated highlight {:?} from {} to {} (full document search)",
                    saved.text, saved.offset, start
                );
                RestoreOutcome::FullSearch {
                    id,
                    from: saved.offset,
                    to: start,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    info!(
        "Restored {} of {} highlight(s) for {}",
        report.restored(),
        set.spans.len(),
        set.document_key
    );
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
