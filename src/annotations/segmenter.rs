//! Splitting document ranges at block boundaries
//!
//! A highlight wrapper may never contain a block, so a range that crosses
//! paragraphs, headings or list items is cut into one piece per block.

use super::indexer::TextIndex;
use crate::error::{Error, Result};
use crate::tree::{NodeId, RenderedTree};
use log::debug;

/// One single-block piece of a document range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSegment {
    /// Nearest block enclosing every leaf of the piece
    pub block: NodeId,
    pub start: usize,
    pub len: usize,
}

impl BlockSegment {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Cut `[start, start + len)` into per-block segments in document order.
///
/// `index` must be current for `tree`. An empty range yields no segments.
pub fn segment_by_block(
    tree: &RenderedTree,
    index: &TextIndex,
    start: usize,
    len: usize,
) -> Result<Vec<BlockSegment>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if !index.is_current(tree) {
        return Err(Error::shape("text index is stale"));
    }

    let end = start.checked_add(len).ok_or(Error::OffsetOutOfRange {
        offset: start,
        len: index.len(),
    })?;
    let first = index.position_at(start)?;
    let last = index.end_position_at(end)?;
    let first_block = block_of(tree, first.leaf)?;
    let last_block = block_of(tree, last.leaf)?;

    if first_block == last_block {
        return Ok(vec![BlockSegment {
            block: first_block,
            start,
            len,
        }]);
    }

    let mut segments: Vec<BlockSegment> = Vec::new();
    for (leaf, leaf_start, leaf_len) in index.leaves_in(start, len) {
        let block = block_of(tree, leaf)?;
        match segments.last_mut() {
            Some(seg) if seg.block == block && seg.end() == leaf_start => seg.len += leaf_len,
            _ => segments.push(BlockSegment {
                block,
                start: leaf_start,
                len: leaf_len,
            }),
        }
    }

    debug!(
        "Range {}+{} crosses {} blocks",
        start,
        len,
        segments.len()
    );
    Ok(segments)
}

fn block_of(tree: &RenderedTree, leaf: NodeId) -> Result<NodeId> {
    tree.enclosing_block(leaf)
        .ok_or_else(|| Error::shape(format!("leaf {} has no enclosing block", leaf.index())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::render_markdown;

    fn segments(markdown: &str, start: usize, len: usize) -> (RenderedTree, Vec<BlockSegment>) {
        let tree = render_markdown(markdown).unwrap();
        let index = TextIndex::build(&tree);
        let segs = segment_by_block(&tree, &index, start, len).unwrap();
        (tree, segs)
    }

    #[test]
    fn test_single_block_short_circuit() {
        let (tree, segs) = segments("plain *styled* text", 2, 12);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start, 2);
        assert_eq!(segs[0].len, 12);
        assert!(tree.is_block(segs[0].block));
    }

    #[test]
    fn test_range_across_paragraphs() {
        // "First" + "Second" + "Third"
        let (tree, segs) = segments("First\n\nSecond\n\nThird", 3, 10);
        assert_eq!(segs.len(), 3);
        assert_eq!((segs[0].start, segs[0].len), (3, 2));
        assert_eq!((segs[1].start, segs[1].len), (5, 6));
        assert_eq!((segs[2].start, segs[2].len), (11, 2));

        let blocks = tree.children(tree.root());
        assert_eq!(segs[0].block, blocks[0]);
        assert_eq!(segs[2].block, blocks[2]);
    }

    #[test]
    fn test_range_across_list_items() {
        let (tree, segs) = segments("- one\n- two", 1, 4);
        assert_eq!(segs.len(), 2);
        assert_ne!(segs[0].block, segs[1].block);
        for seg in &segs {
            assert!(tree.is_block(seg.block));
        }
    }

    #[test]
    fn test_segments_cover_range_exactly() {
        let (_, segs) = segments("# A heading\n\nBody with **bold**\n\n> quoted", 2, 20);
        assert_eq!(segs.first().unwrap().start, 2);
        assert_eq!(segs.last().unwrap().end(), 22);
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start);
        }
    }

    #[test]
    fn test_empty_range() {
        let (_, segs) = segments("abc", 1, 0);
        assert!(segs.is_empty());
    }

    #[test]
    fn test_out_of_range_is_error() {
        let tree = render_markdown("abc").unwrap();
        let index = TextIndex::build(&tree);
        assert!(segment_by_block(&tree, &index, 2, 5).is_err());
    }
}
