//! The set of highlight spans over one open document
//!
//! The registry owns the span records and keeps the tree's wrappers in
//! step with them. Spans never overlap: applying a range that intersects
//! existing spans unwraps them and wraps their union as one new span.

use super::color::ColorRef;
use super::indexer::TextIndex;
use super::mutator;
use super::segmenter::segment_by_block;
use crate::error::Result;
use crate::tree::RenderedTree;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a highlight span, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(u64);

impl SpanId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One highlight over a contiguous document range.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightSpan {
    pub id: SpanId,
    /// Text of the range when the span was last confirmed
    pub text: String,
    pub color: ColorRef,
    pub start: usize,
    pub len: usize,
}

impl HighlightSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether this span shares at least one character with `[start, start + len)`.
    pub fn overlaps(&self, start: usize, len: usize) -> bool {
        self.start < start.saturating_add(len) && start < self.end()
    }

    pub fn contains_range(&self, start: usize, len: usize) -> bool {
        self.start <= start && start.saturating_add(len) <= self.end()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SpanRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Active highlight spans of one document.
#[derive(Debug, Default)]
pub struct SpanRegistry {
    spans: BTreeMap<SpanId, HighlightSpan>,
    next_id: u64,
    last_touched: Option<SpanId>,
}

impl SpanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn get(&self, id: SpanId) -> Option<&HighlightSpan> {
        self.spans.get(&id)
    }

    /// Span most recently created or recolored.
    pub fn last_touched(&self) -> Option<SpanId> {
        self.last_touched
    }

    /// Snapshot of every span in document order.
    pub fn all(&self) -> Vec<HighlightSpan> {
        let mut spans: Vec<HighlightSpan> = self.spans.values().cloned().collect();
        spans.sort_by_key(|s| s.start);
        spans
    }

    /// Span covering the character at `offset`.
    pub fn span_at(&self, offset: usize) -> Option<&HighlightSpan> {
        self.spans.values().find(|s| s.overlaps(offset, 1))
    }

    /// Highlight `[start, start + len)` with `color`.
    ///
    /// Returns `None` for an empty or out-of-range request, or when the tree
    /// could not be changed (logged; tree and registry are left untouched).
    /// A range lying entirely inside one existing span recolors that span and
    /// returns its id. Otherwise every overlapping span is absorbed into one
    /// new span over the union.
    pub fn apply(
        &mut self,
        tree: &mut RenderedTree,
        start: usize,
        len: usize,
        color: ColorRef,
    ) -> Option<SpanId> {
        if len == 0 {
            debug!("Ignoring empty highlight range at {}", start);
            return None;
        }
        let doc_len = TextIndex::build(tree).len();
        if start.checked_add(len).map_or(true, |end| end > doc_len) {
            debug!(
                "Ignoring highlight range {}+{} beyond document length {}",
                start, len, doc_len
            );
            return None;
        }

        let overlapping: Vec<SpanId> = self
            .spans
            .values()
            .filter(|s| s.overlaps(start, len))
            .map(|s| s.id)
            .collect();

        if let [only] = overlapping.as_slice() {
            if self.spans[only].contains_range(start, len) {
                let id = *only;
                self.recolor(tree, id, color);
                return Some(id);
            }
        }

        let union_start = overlapping
            .iter()
            .map(|id| self.spans[id].start)
            .fold(start, usize::min);
        let union_end = overlapping
            .iter()
            .map(|id| self.spans[id].end())
            .fold(start + len, usize::max);
        let union_len = union_end - union_start;

        let id = SpanId(self.next_id + 1);
        let savepoint = tree.savepoint();
        match rewrap(tree, &overlapping, union_start, union_len, id, &color) {
            Ok(text) => {
                tree.commit(savepoint);
                for old in &overlapping {
                    self.spans.remove(old);
                    if self.last_touched == Some(*old) {
                        self.last_touched = None;
                    }
                }
                if !overlapping.is_empty() {
                    debug!(
                        "Span {} absorbed {} overlapping span(s)",
                        id,
                        overlapping.len()
                    );
                }
                self.next_id += 1;
                self.spans.insert(
                    id,
                    HighlightSpan {
                        id,
                        text,
                        color,
                        start: union_start,
                        len: union_len,
                    },
                );
                self.last_touched = Some(id);
                Some(id)
            }
            Err(e) => {
                tree.rollback(savepoint);
                warn!(
                    "Could not highlight {}+{}, leaving it unhighlighted: {}",
                    union_start, union_len, e
                );
                None
            }
        }
    }

    /// Remove a span and its wrappers. Unknown ids are a no-op.
    pub fn remove(&mut self, tree: &mut RenderedTree, id: SpanId) -> bool {
        if !self.spans.contains_key(&id) {
            debug!("Span {} not found for removal", id);
            return false;
        }
        let savepoint = tree.savepoint();
        match unwrap_all(tree, id) {
            Ok(()) => {
                tree.commit(savepoint);
                self.spans.remove(&id);
                if self.last_touched == Some(id) {
                    self.last_touched = None;
                }
                true
            }
            Err(e) => {
                tree.rollback(savepoint);
                warn!("Could not remove span {}: {}", id, e);
                false
            }
        }
    }

    /// Change a span's color in place. Unknown ids are a no-op.
    pub fn recolor(&mut self, tree: &mut RenderedTree, id: SpanId, color: ColorRef) -> bool {
        let Some(span) = self.spans.get_mut(&id) else {
            debug!("Span {} not found for recolor", id);
            return false;
        };

        let savepoint = tree.savepoint();
        let restyled = tree
            .wrappers_of(id)
            .into_iter()
            .try_for_each(|w| mutator::restyle(tree, w, &color));
        if let Err(e) = restyled {
            tree.rollback(savepoint);
            warn!("Could not recolor span {}: {}", id, e);
            return false;
        }
        tree.commit(savepoint);

        span.color = color;
        self.last_touched = Some(id);
        true
    }

    /// Recolor the most recently touched span, for re-coloring without a selection.
    pub fn recolor_last_touched(
        &mut self,
        tree: &mut RenderedTree,
        color: ColorRef,
    ) -> Option<SpanId> {
        let id = self.last_touched?;
        self.recolor(tree, id, color).then_some(id)
    }

    /// Recolor every span painted with the color named `from`. Returns how
    /// many spans changed.
    pub fn reassign_color(&mut self, tree: &mut RenderedTree, from: &str, to: ColorRef) -> usize {
        let ids: Vec<SpanId> = self
            .spans
            .values()
            .filter(|s| s.color.name() == from)
            .map(|s| s.id)
            .collect();
        let last = self.last_touched;
        let changed = ids
            .into_iter()
            .filter(|id| self.recolor(tree, *id, to.clone()))
            .count();
        self.last_touched = last;
        if changed > 0 {
            info!("Reassigned {} span(s) from {} to {}", changed, from, to.name());
        }
        changed
    }

    /// Remove every span and wrapper. Returns how many spans were removed.
    pub fn clear_all(&mut self, tree: &mut RenderedTree) -> usize {
        let ids: Vec<SpanId> = self.spans.keys().copied().collect();
        let removed = ids.into_iter().filter(|id| self.remove(tree, *id)).count();
        self.last_touched = None;
        removed
    }

    /// Forget every span without touching any tree, for when the tree they
    /// were wrapped in has been discarded.
    pub fn reset(&mut self) {
        self.spans.clear();
        self.last_touched = None;
    }
}

fn unwrap_all(tree: &mut RenderedTree, id: SpanId) -> Result<()> {
    for wrapper in tree.wrappers_of(id) {
        mutator::unwrap(tree, wrapper)?;
    }
    Ok(())
}

/// Unwrap `overlapping`, then wrap `[start, start + len)` block by block.
/// Returns the text of the wrapped range.
fn rewrap(
    tree: &mut RenderedTree,
    overlapping: &[SpanId],
    start: usize,
    len: usize,
    id: SpanId,
    color: &ColorRef,
) -> Result<String> {
    for old in overlapping {
        unwrap_all(tree, *old)?;
    }

    let index = TextIndex::build(tree);
    let segments = segment_by_block(tree, &index, start, len)?;
    for segment in &segments {
        mutator::wrap(tree, segment.block, segment.start, segment.len, id, color)?;
    }
    index.slice_text(start, len)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::color::PaletteColor;
    use crate::tree::{render_markdown, BlockKind, NodeKind};

    fn palette(color: PaletteColor) -> ColorRef {
        ColorRef::Palette(color)
    }

    fn assert_no_overlap(registry: &SpanRegistry) {
        let spans = registry.all();
        for pair in spans.windows(2) {
            assert!(
                pair[0].end() <= pair[1].start,
                "{:?} overlaps {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_quick_brown_fox_merge_scenario() {
        let mut tree = render_markdown("The quick brown fox").unwrap();
        let mut registry = SpanRegistry::new();
        let yellow = palette(PaletteColor::Yellow);

        let quick = registry.apply(&mut tree, 4, 5, yellow.clone()).unwrap();
        assert_eq!(registry.get(quick).unwrap().text, "quick");

        registry.apply(&mut tree, 10, 9, yellow.clone()).unwrap();
        assert_eq!(registry.len(), 2);

        let merged = registry.apply(&mut tree, 7, 7, yellow).unwrap();
        assert_eq!(registry.len(), 1);
        let span = registry.get(merged).unwrap();
        assert_eq!((span.start, span.end()), (4, 19));
        assert_eq!(span.text, "quick brown fox");
        assert_eq!(tree.wrappers_of(merged).len(), 1);
    }

    #[test]
    fn test_apply_inside_existing_span_recolors() {
        let mut tree = render_markdown("The quick brown fox").unwrap();
        let mut registry = SpanRegistry::new();
        let id = registry
            .apply(&mut tree, 4, 11, palette(PaletteColor::Yellow))
            .unwrap();

        let again = registry
            .apply(&mut tree, 6, 3, palette(PaletteColor::Green))
            .unwrap();

        assert_eq!(again, id);
        let span = registry.get(id).unwrap();
        assert_eq!((span.start, span.len), (4, 11));
        assert_eq!(span.color, palette(PaletteColor::Green));
    }

    #[test]
    fn test_touching_ranges_do_not_merge() {
        let mut tree = render_markdown("abcdef").unwrap();
        let mut registry = SpanRegistry::new();
        registry.apply(&mut tree, 0, 3, ColorRef::default()).unwrap();
        registry.apply(&mut tree, 3, 3, ColorRef::default()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_no_overlap(&registry);
    }

    #[test]
    fn test_no_overlap_after_many_applies() {
        let mut tree = render_markdown("Alpha *beta* gamma\n\n- delta\n- epsilon zeta").unwrap();
        let mut registry = SpanRegistry::new();
        let ranges = [(0, 3), (2, 6), (10, 4), (16, 6), (1, 1), (20, 8), (5, 12), (28, 2)];
        for (start, len) in ranges {
            registry.apply(&mut tree, start, len, ColorRef::default());
            assert_no_overlap(&registry);
        }
    }

    #[test]
    fn test_apply_across_blocks_creates_one_wrapper_per_block() {
        let mut tree = render_markdown("First\n\nSecond\n\nThird").unwrap();
        let before = tree.outline();
        let mut registry = SpanRegistry::new();

        let id = registry
            .apply(&mut tree, 3, 10, ColorRef::default())
            .unwrap();
        let wrappers = tree.wrappers_of(id);
        assert_eq!(wrappers.len(), 3);
        for wrapper in &wrappers {
            let parent = tree.parent(*wrapper).unwrap();
            assert!(tree.is_block(parent));
            assert!(tree.children(*wrapper).iter().all(|c| !tree.is_block(*c)));
        }
        assert_eq!(registry.get(id).unwrap().text, "stSecondTh");

        assert!(registry.remove(&mut tree, id));
        assert_eq!(tree.outline(), before);
    }

    #[test]
    fn test_empty_and_out_of_range_are_ignored() {
        let mut tree = render_markdown("abc").unwrap();
        let mut registry = SpanRegistry::new();
        assert!(registry.apply(&mut tree, 1, 0, ColorRef::default()).is_none());
        assert!(registry.apply(&mut tree, 2, 5, ColorRef::default()).is_none());
        assert!(registry
            .apply(&mut tree, usize::MAX, 2, ColorRef::default())
            .is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_and_recolor_unknown_ids_are_noops() {
        let mut tree = render_markdown("abc").unwrap();
        let mut registry = SpanRegistry::new();
        assert!(!registry.remove(&mut tree, SpanId::new(42)));
        assert!(!registry.recolor(&mut tree, SpanId::new(42), ColorRef::default()));
    }

    #[test]
    fn test_recolor_is_idempotent() {
        let mut tree = render_markdown("some *styled* words").unwrap();
        let mut registry = SpanRegistry::new();
        let id = registry
            .apply(&mut tree, 2, 10, ColorRef::default())
            .unwrap();

        let blue = palette(PaletteColor::Blue);
        registry.recolor(&mut tree, id, blue.clone());
        let once = tree.outline();
        registry.recolor(&mut tree, id, blue.clone());

        assert_eq!(tree.outline(), once);
        assert_eq!(registry.get(id).unwrap().color, blue);
        for wrapper in tree.wrappers_of(id) {
            assert!(matches!(
                tree.kind(wrapper),
                Some(NodeKind::Highlight { color, .. }) if *color == blue
            ));
        }
    }

    #[test]
    fn test_last_touched_tracking() {
        let mut tree = render_markdown("one two three").unwrap();
        let mut registry = SpanRegistry::new();
        assert!(registry
            .recolor_last_touched(&mut tree, ColorRef::default())
            .is_none());

        let first = registry.apply(&mut tree, 0, 3, ColorRef::default()).unwrap();
        let second = registry.apply(&mut tree, 4, 3, ColorRef::default()).unwrap();
        assert_eq!(registry.last_touched(), Some(second));

        registry.recolor(&mut tree, first, palette(PaletteColor::Pink));
        assert_eq!(registry.last_touched(), Some(first));

        let pink_to_green = registry.recolor_last_touched(&mut tree, palette(PaletteColor::Green));
        assert_eq!(pink_to_green, Some(first));
        assert_eq!(
            registry.get(first).unwrap().color,
            palette(PaletteColor::Green)
        );

        registry.remove(&mut tree, first);
        assert_eq!(registry.last_touched(), None);
    }

    #[test]
    fn test_reassign_color() {
        let mut tree = render_markdown("one two three").unwrap();
        let mut registry = SpanRegistry::new();
        let custom = ColorRef::Custom {
            name: "custom-1".into(),
            rgba: "#112233".into(),
        };
        let a = registry.apply(&mut tree, 0, 3, custom.clone()).unwrap();
        let b = registry.apply(&mut tree, 4, 3, ColorRef::default()).unwrap();
        let c = registry.apply(&mut tree, 8, 5, custom).unwrap();

        let changed = registry.reassign_color(&mut tree, "custom-1", ColorRef::default());
        assert_eq!(changed, 2);
        for id in [a, b, c] {
            assert_eq!(registry.get(id).unwrap().color, ColorRef::default());
        }
        assert_eq!(registry.last_touched(), Some(c));
    }

    #[test]
    fn test_span_at() {
        let mut tree = render_markdown("one two three").unwrap();
        let mut registry = SpanRegistry::new();
        let id = registry.apply(&mut tree, 4, 3, ColorRef::default()).unwrap();
        assert_eq!(registry.span_at(4).map(|s| s.id), Some(id));
        assert_eq!(registry.span_at(6).map(|s| s.id), Some(id));
        assert!(registry.span_at(7).is_none());
        assert!(registry.span_at(3).is_none());
        assert!(registry.span_at(usize::MAX).is_none());
    }

    #[test]
    fn test_range_helpers_saturate() {
        let span = HighlightSpan {
            id: SpanId::new(1),
            text: "abc".into(),
            color: ColorRef::default(),
            start: 4,
            len: 3,
        };
        assert!(!span.overlaps(usize::MAX, 1));
        assert!(span.overlaps(5, usize::MAX));
        assert!(!span.contains_range(5, usize::MAX));
    }

    #[test]
    fn test_failed_apply_keeps_absorbed_span() {
        // item: "ab" [paragraph: "cd"] "ef"
        let mut tree = RenderedTree::new();
        let item = tree
            .append(
                tree.root(),
                NodeKind::Block(BlockKind::ListItem { checked: None }),
            )
            .unwrap();
        tree.append_text(item, "ab").unwrap();
        let nested = tree
            .append(item, NodeKind::Block(BlockKind::Paragraph))
            .unwrap();
        tree.append_text(nested, "cd").unwrap();
        tree.append_text(item, "ef").unwrap();

        let mut registry = SpanRegistry::new();
        let old = registry
            .apply(&mut tree, 0, 2, palette(PaletteColor::Green))
            .unwrap();
        let before = tree.outline();

        // Both ends sit in the item, so the nested paragraph would be enclosed
        assert!(registry
            .apply(&mut tree, 1, 5, ColorRef::default())
            .is_none());

        let spans = registry.all();
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].id, spans[0].start, spans[0].len), (old, 0, 2));
        assert_eq!(spans[0].color, palette(PaletteColor::Green));
        assert_eq!(registry.last_touched(), Some(old));
        assert_eq!(tree.wrappers_of(old).len(), 1);
        assert_eq!(tree.outline(), before);
    }

    #[test]
    fn test_clear_all_restores_tree() {
        let mut tree = render_markdown("# Title\n\nBody **bold** text").unwrap();
        let before = tree.outline();
        let mut registry = SpanRegistry::new();
        registry.apply(&mut tree, 0, 7, ColorRef::default());
        registry.apply(&mut tree, 9, 6, palette(PaletteColor::Orange));

        assert_eq!(registry.clear_all(&mut tree), 2);
        assert!(registry.is_empty());
        assert_eq!(tree.outline(), before);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut tree = render_markdown("abcdef").unwrap();
        let mut registry = SpanRegistry::new();
        let a = registry.apply(&mut tree, 0, 2, ColorRef::default()).unwrap();
        registry.remove(&mut tree, a);
        let b = registry.apply(&mut tree, 0, 2, ColorRef::default()).unwrap();
        assert_ne!(a, b);
    }
}
