//! Translating host selections to document ranges and back
//!
//! The rendering surface reports a selection as two points in the tree. A
//! point in a text leaf counts characters into the leaf; a point in a
//! container counts children, so `{ node: paragraph, offset: 2 }` is the
//! boundary before the paragraph's third child.

use super::indexer::TextIndex;
use crate::string_utils::char_count;
use crate::tree::{NodeId, RenderedTree};
use log::debug;

/// A selection endpoint in the rendered tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl HostPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A host selection. The focus may precede the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRange {
    pub anchor: HostPoint,
    pub focus: HostPoint,
}

impl HostRange {
    pub fn new(anchor: HostPoint, focus: HostPoint) -> Self {
        Self { anchor, focus }
    }
}

/// Document range `(start, len)` of a host selection.
///
/// Returns `None` for a collapsed selection or when either endpoint is not
/// inside the tree's content.
pub fn from_host_selection(tree: &RenderedTree, range: &HostRange) -> Option<(usize, usize)> {
    let Some(anchor) = point_offset(tree, range.anchor) else {
        debug!("Selection anchor {:?} is outside the content", range.anchor);
        return None;
    };
    let Some(focus) = point_offset(tree, range.focus) else {
        debug!("Selection focus {:?} is outside the content", range.focus);
        return None;
    };

    let (start, end) = (anchor.min(focus), anchor.max(focus));
    if start == end {
        return None;
    }
    Some((start, end - start))
}

/// Host selection covering `[start, start + len)`, for placing UI next to
/// a range. The anchor sits in the leaf holding the first character, the
/// focus in the leaf holding the last.
pub fn to_host_selection(tree: &RenderedTree, start: usize, len: usize) -> Option<HostRange> {
    if len == 0 {
        return None;
    }
    let index = TextIndex::build(tree);
    let first = index.position_at(start).ok()?;
    let last = index.end_position_at(start.checked_add(len)?).ok()?;
    Some(HostRange {
        anchor: HostPoint::new(first.leaf, first.offset),
        focus: HostPoint::new(last.leaf, last.offset),
    })
}

/// Document offset of a host point, `None` if the point is invalid.
fn point_offset(tree: &RenderedTree, point: HostPoint) -> Option<usize> {
    if !tree.is_descendant_of(point.node, tree.root()) {
        return None;
    }
    let limit = match tree.text(point.node) {
        Some(text) => char_count(text),
        None => tree.children(point.node).len(),
    };
    if point.offset > limit {
        return None;
    }

    let mut acc = 0;
    chars_before(tree, tree.root(), point, &mut acc).then_some(acc)
}

/// Pre-order walk adding up leaf text until `point` is reached.
fn chars_before(tree: &RenderedTree, current: NodeId, point: HostPoint, acc: &mut usize) -> bool {
    if current == point.node {
        match tree.text(current) {
            Some(_) => *acc += point.offset,
            None => {
                for child in &tree.children(current)[..point.offset] {
                    *acc += char_count(&tree.text_content(*child));
                }
            }
        }
        return true;
    }
    if let Some(text) = tree.text(current) {
        *acc += char_count(text);
        return false;
    }
    tree.children(current)
        .iter()
        .any(|child| chars_before(tree, *child, point, acc))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::render_markdown;

    fn leaf_with(tree: &RenderedTree, text: &str) -> NodeId {
        tree.leaves()
            .into_iter()
            .find(|l| tree.text(*l) == Some(text))
            .unwrap()
    }

    #[test]
    fn test_leaf_points() {
        let tree = render_markdown("The *quick* fox").unwrap();
        let quick = leaf_with(&tree, "quick");
        let range = HostRange::new(HostPoint::new(quick, 0), HostPoint::new(quick, 5));
        assert_eq!(from_host_selection(&tree, &range), Some((4, 5)));
    }

    #[test]
    fn test_backwards_selection() {
        let tree = render_markdown("The *quick* fox").unwrap();
        let head = leaf_with(&tree, "The ");
        let tail = leaf_with(&tree, " fox");
        let range = HostRange::new(HostPoint::new(tail, 2), HostPoint::new(head, 1));
        // " fox" starts at 9
        assert_eq!(from_host_selection(&tree, &range), Some((1, 10)));
    }

    #[test]
    fn test_container_points() {
        let tree = render_markdown("First\n\nSecond").unwrap();
        let root = tree.root();
        // Before the second paragraph through the end of the document
        let range = HostRange::new(HostPoint::new(root, 1), HostPoint::new(root, 2));
        assert_eq!(from_host_selection(&tree, &range), Some((5, 6)));
    }

    #[test]
    fn test_collapsed_selection_is_none() {
        let tree = render_markdown("abc").unwrap();
        let leaf = tree.leaves()[0];
        let range = HostRange::new(HostPoint::new(leaf, 1), HostPoint::new(leaf, 1));
        assert_eq!(from_host_selection(&tree, &range), None);
    }

    #[test]
    fn test_invalid_points_are_none() {
        let tree = render_markdown("abc").unwrap();
        let leaf = tree.leaves()[0];

        let past_end = HostRange::new(HostPoint::new(leaf, 0), HostPoint::new(leaf, 4));
        assert_eq!(from_host_selection(&tree, &past_end), None);

        let other = render_markdown("one\n\ntwo\n\nthree\n\nfour").unwrap();
        let foreign = *other.leaves().last().unwrap();
        let outside = HostRange::new(HostPoint::new(leaf, 0), HostPoint::new(foreign, 1));
        assert_eq!(from_host_selection(&tree, &outside), None);
    }

    #[test]
    fn test_to_host_selection_roundtrip() {
        let tree = render_markdown("Alpha **beta** gamma\n\ndelta").unwrap();
        let host = to_host_selection(&tree, 3, 15).unwrap();
        assert_eq!(from_host_selection(&tree, &host), Some((3, 15)));

        assert!(to_host_selection(&tree, 3, 0).is_none());
        assert!(to_host_selection(&tree, 20, 50).is_none());
    }
}
