//! Inserting and removing highlight wrappers
//!
//! `wrap` puts one highlight wrapper around a single-block document range.
//! Leaves cut by the range edges are split first, and inline containers
//! (emphasis, links...) cut by an edge are split the same way, so the
//! wrapper always takes whole children of the block. `unwrap` dissolves a
//! wrapper and merges the pieces those splits left behind.
//!
//! Both run inside a tree savepoint: on any error the tree is exactly as it
//! was before the call.

use super::color::ColorRef;
use super::indexer::TextIndex;
use super::registry::SpanId;
use crate::error::{Error, Result};
use crate::tree::{NodeId, NodeKind, RenderedTree};
use log::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Wrap
// ─────────────────────────────────────────────────────────────────────────────

/// Wrap `[start, start + len)`, which must lie inside `block`, in a
/// highlight wrapper for `span`. Returns the wrapper.
pub fn wrap(
    tree: &mut RenderedTree,
    block: NodeId,
    start: usize,
    len: usize,
    span: SpanId,
    color: &ColorRef,
) -> Result<NodeId> {
    let savepoint = tree.savepoint();
    match wrap_inner(tree, block, start, len, span, color) {
        Ok(wrapper) => {
            tree.commit(savepoint);
            Ok(wrapper)
        }
        Err(e) => {
            tree.rollback(savepoint);
            Err(e)
        }
    }
}

fn wrap_inner(
    tree: &mut RenderedTree,
    block: NodeId,
    start: usize,
    len: usize,
    span: SpanId,
    color: &ColorRef,
) -> Result<NodeId> {
    if len == 0 {
        return Err(Error::shape("cannot wrap an empty range"));
    }
    if !tree.is_block(block) {
        return Err(Error::shape(format!("node {} is not a block", block.index())));
    }

    let first = start_boundary(tree, block, start)?;
    let last = end_boundary(tree, block, start + len)?;

    let from = tree
        .child_index(first)
        .ok_or_else(|| Error::shape("range start is not a child of the block"))?;
    let to = tree
        .child_index(last)
        .ok_or_else(|| Error::shape("range end is not a child of the block"))?;
    if from > to {
        return Err(Error::shape("range end precedes range start"));
    }

    let covered = tree.children(block)[from..=to].to_vec();
    for child in covered {
        ensure_wrappable(tree, child)?;
    }

    let wrapper = tree.wrap_children(
        block,
        from..to + 1,
        NodeKind::Highlight {
            span,
            color: color.clone(),
        },
    )?;
    debug!(
        "Wrapped {}+{} in block {} for span {}",
        start,
        len,
        block.index(),
        span
    );
    Ok(wrapper)
}

/// Make the character at `offset` begin a child of `block`. Returns that child.
fn start_boundary(tree: &mut RenderedTree, block: NodeId, offset: usize) -> Result<NodeId> {
    let index = TextIndex::build(tree);
    let pos = index.position_at(offset)?;
    if !tree.is_descendant_of(pos.leaf, block) {
        return Err(Error::shape("range start lies outside the block"));
    }

    let mut node = if pos.offset > 0 {
        tree.split_text(pos.leaf, pos.offset)?
    } else {
        pos.leaf
    };

    while let Some(parent) = tree.parent(node) {
        if parent == block {
            return Ok(node);
        }
        check_splittable(tree, parent)?;
        let idx = tree
            .child_index(node)
            .ok_or_else(|| Error::shape("node is not listed under its parent"))?;
        node = if idx > 0 {
            tree.split_container(parent, idx)?
        } else {
            parent
        };
    }
    Err(Error::shape("range start lies outside the block"))
}

/// Make the character before `offset` end a child of `block`. Returns that child.
fn end_boundary(tree: &mut RenderedTree, block: NodeId, offset: usize) -> Result<NodeId> {
    let index = TextIndex::build(tree);
    let pos = index.end_position_at(offset)?;
    if !tree.is_descendant_of(pos.leaf, block) {
        return Err(Error::shape("range end lies outside the block"));
    }

    let leaf_len = tree
        .text(pos.leaf)
        .map(crate::string_utils::char_count)
        .unwrap_or(0);
    if pos.offset < leaf_len {
        tree.split_text(pos.leaf, pos.offset)?;
    }

    let mut node = pos.leaf;
    while let Some(parent) = tree.parent(node) {
        if parent == block {
            return Ok(node);
        }
        check_splittable(tree, parent)?;
        let idx = tree
            .child_index(node)
            .ok_or_else(|| Error::shape("node is not listed under its parent"))?;
        if idx + 1 < tree.children(parent).len() {
            tree.split_container(parent, idx + 1)?;
        }
        node = parent;
    }
    Err(Error::shape("range end lies outside the block"))
}

/// Only inline styling containers may be cut by a range edge.
fn check_splittable(tree: &RenderedTree, node: NodeId) -> Result<()> {
    match tree.kind(node) {
        Some(NodeKind::Inline(_)) => Ok(()),
        Some(NodeKind::Highlight { span, .. }) => Err(Error::shape(format!(
            "range edge falls inside the wrapper of span {}",
            span
        ))),
        _ => Err(Error::shape(format!(
            "range edge falls inside nested block {}",
            node.index()
        ))),
    }
}

/// A wrapper may hold neither blocks nor other wrappers.
fn ensure_wrappable(tree: &RenderedTree, node: NodeId) -> Result<()> {
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        match tree.kind(id) {
            Some(NodeKind::Block(_)) => {
                return Err(Error::shape(format!(
                    "range would enclose block {}",
                    id.index()
                )))
            }
            Some(NodeKind::Highlight { span, .. }) => {
                return Err(Error::shape(format!(
                    "range would enclose the wrapper of span {}",
                    span
                )))
            }
            _ => stack.extend_from_slice(tree.children(id)),
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Unwrap / Restyle
// ─────────────────────────────────────────────────────────────────────────────

/// Replace a highlight wrapper with its children and merge the seams.
pub fn unwrap(tree: &mut RenderedTree, wrapper: NodeId) -> Result<()> {
    let savepoint = tree.savepoint();
    match unwrap_inner(tree, wrapper) {
        Ok(()) => {
            tree.commit(savepoint);
            Ok(())
        }
        Err(e) => {
            tree.rollback(savepoint);
            Err(e)
        }
    }
}

fn unwrap_inner(tree: &mut RenderedTree, wrapper: NodeId) -> Result<()> {
    if !tree.kind(wrapper).is_some_and(NodeKind::is_highlight) {
        return Err(Error::shape(format!(
            "node {} is not a highlight wrapper",
            wrapper.index()
        )));
    }
    let parent = tree
        .parent(wrapper)
        .ok_or_else(|| Error::shape("wrapper is detached"))?;
    let range = tree.dissolve(wrapper)?;

    // Right seam first so the left seam's indices stay valid
    if range.end > range.start {
        merge_at(tree, parent, range.end)?;
    }
    merge_at(tree, parent, range.start)?;
    Ok(())
}

/// Merge the children of `parent` on either side of position `seam`.
fn merge_at(tree: &mut RenderedTree, parent: NodeId, seam: usize) -> Result<()> {
    if seam == 0 {
        return Ok(());
    }
    let children = tree.children(parent);
    if let (Some(left), Some(right)) = (children.get(seam - 1), children.get(seam)) {
        let (left, right) = (*left, *right);
        tree.merge_siblings(left, right)?;
    }
    Ok(())
}

/// Change a wrapper's color without touching the tree's shape.
pub fn restyle(tree: &mut RenderedTree, wrapper: NodeId, color: &ColorRef) -> Result<()> {
    match tree.kind(wrapper) {
        Some(NodeKind::Highlight { span, .. }) => {
            let span = *span;
            tree.set_kind(
                wrapper,
                NodeKind::Highlight {
                    span,
                    color: color.clone(),
                },
            )
        }
        _ => Err(Error::shape(format!(
            "node {} is not a highlight wrapper",
            wrapper.index()
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::color::PaletteColor;
    use crate::tree::render_markdown;

    fn yellow() -> ColorRef {
        ColorRef::Palette(PaletteColor::Yellow)
    }

    fn first_block(tree: &RenderedTree) -> NodeId {
        tree.children(tree.root())[0]
    }

    #[test]
    fn test_wrap_inside_single_leaf() {
        let mut tree = render_markdown("The quick brown fox").unwrap();
        let block = first_block(&tree);
        let wrapper = wrap(&mut tree, block, 4, 5, SpanId::new(1), &yellow()).unwrap();

        assert_eq!(tree.text_content(wrapper), "quick");
        assert_eq!(tree.parent(wrapper), Some(block));
        assert_eq!(tree.text_content(tree.root()), "The quick brown fox");
    }

    #[test]
    fn test_wrap_whole_block() {
        let mut tree = render_markdown("abc").unwrap();
        let block = first_block(&tree);
        let wrapper = wrap(&mut tree, block, 0, 3, SpanId::new(1), &yellow()).unwrap();
        assert_eq!(tree.children(block), &[wrapper]);
    }

    #[test]
    fn test_wrap_splits_inline_containers() {
        let mut tree = render_markdown("a *bcd* e").unwrap();
        let block = first_block(&tree);
        // Covers "cd e"
        let wrapper = wrap(&mut tree, block, 3, 4, SpanId::new(7), &yellow()).unwrap();

        assert_eq!(tree.text_content(wrapper), "cd e");
        assert!(tree.outline().contains("highlight#7(yellow)\n      em\n        \"cd\""));
    }

    #[test]
    fn test_wrap_inside_one_emphasis() {
        let mut tree = render_markdown("*abc*").unwrap();
        let block = first_block(&tree);
        let wrapper = wrap(&mut tree, block, 1, 1, SpanId::new(2), &yellow()).unwrap();

        assert_eq!(tree.text_content(wrapper), "b");
        // em("a"), highlight(em("b")), em("c")
        assert_eq!(tree.children(block).len(), 3);
    }

    #[test]
    fn test_unwrap_restores_outline() {
        let mut tree = render_markdown("one **two three** four").unwrap();
        let before = tree.outline();
        let block = first_block(&tree);

        let wrapper = wrap(&mut tree, block, 6, 9, SpanId::new(1), &yellow()).unwrap();
        assert_ne!(tree.outline(), before);
        unwrap(&mut tree, wrapper).unwrap();

        assert_eq!(tree.outline(), before);
        assert!(tree.wrappers_of(SpanId::new(1)).is_empty());
    }

    #[test]
    fn test_unwrap_merges_text_leaves() {
        let mut tree = render_markdown("hello world").unwrap();
        let block = first_block(&tree);
        let wrapper = wrap(&mut tree, block, 3, 4, SpanId::new(1), &yellow()).unwrap();
        unwrap(&mut tree, wrapper).unwrap();

        assert_eq!(tree.children(block).len(), 1);
        assert_eq!(tree.leaves().len(), 1);
    }

    #[test]
    fn test_wrap_outside_block_fails_closed() {
        let mut tree = render_markdown("first\n\nsecond").unwrap();
        let before = tree.outline();
        let block = first_block(&tree);

        let result = wrap(&mut tree, block, 3, 5, SpanId::new(1), &yellow());
        assert!(matches!(result, Err(Error::TreeShape(_))));
        assert_eq!(tree.outline(), before);
        assert_eq!(tree.leaves().len(), 2);
    }

    #[test]
    fn test_wrap_over_existing_wrapper_fails_closed() {
        let mut tree = render_markdown("abcdef").unwrap();
        let block = first_block(&tree);
        wrap(&mut tree, block, 2, 2, SpanId::new(1), &yellow()).unwrap();
        let before = tree.outline();

        assert!(wrap(&mut tree, block, 0, 6, SpanId::new(2), &yellow()).is_err());
        assert!(wrap(&mut tree, block, 3, 2, SpanId::new(2), &yellow()).is_err());
        assert_eq!(tree.outline(), before);
    }

    #[test]
    fn test_wrap_adjacent_to_existing_wrapper() {
        let mut tree = render_markdown("abcdef").unwrap();
        let block = first_block(&tree);
        wrap(&mut tree, block, 0, 3, SpanId::new(1), &yellow()).unwrap();
        let second = wrap(&mut tree, block, 3, 3, SpanId::new(2), &yellow()).unwrap();
        assert_eq!(tree.text_content(second), "def");
    }

    #[test]
    fn test_unwrap_rejects_non_wrapper() {
        let mut tree = render_markdown("abc").unwrap();
        let block = first_block(&tree);
        assert!(unwrap(&mut tree, block).is_err());
    }

    #[test]
    fn test_restyle() {
        let mut tree = render_markdown("abc").unwrap();
        let block = first_block(&tree);
        let wrapper = wrap(&mut tree, block, 0, 2, SpanId::new(1), &yellow()).unwrap();
        let before = tree.outline();

        let green = ColorRef::Palette(PaletteColor::Green);
        restyle(&mut tree, wrapper, &green).unwrap();
        restyle(&mut tree, wrapper, &green).unwrap();
        assert_eq!(tree.outline(), before.replace("yellow", "green"));
    }
}
