//! Flattened text index over a rendered tree
//!
//! Document offsets count characters in the concatenation of every text
//! leaf under the root, in pre-order, with nothing inserted between blocks.
//! A [`TextIndex`] is a snapshot of that flattening for one tree revision;
//! any tree mutation invalidates it.

use crate::error::{Error, Result};
use crate::string_utils::{char_count, char_slice};
use crate::tree::{NodeId, RenderedTree};
use std::collections::HashMap;

/// A character position inside one text leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub leaf: NodeId,
    /// Character offset within the leaf's text
    pub offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct LeafEntry {
    leaf: NodeId,
    start: usize,
    len: usize,
}

impl LeafEntry {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Offset index for one revision of a [`RenderedTree`].
#[derive(Debug, Clone)]
pub struct TextIndex {
    entries: Vec<LeafEntry>,
    by_leaf: HashMap<NodeId, usize>,
    text: String,
    total: usize,
    revision: u64,
}

impl TextIndex {
    /// Flatten `tree` into a fresh index.
    pub fn build(tree: &RenderedTree) -> Self {
        let leaves = tree.leaves();
        let mut entries = Vec::with_capacity(leaves.len());
        let mut by_leaf = HashMap::with_capacity(leaves.len());
        let mut text = String::new();
        let mut total = 0;

        for leaf in leaves {
            let leaf_text = tree.text(leaf).unwrap_or_default();
            let len = char_count(leaf_text);
            by_leaf.insert(leaf, entries.len());
            entries.push(LeafEntry {
                leaf,
                start: total,
                len,
            });
            text.push_str(leaf_text);
            total += len;
        }

        Self {
            entries,
            by_leaf,
            text,
            total,
            revision: tree.revision(),
        }
    }

    /// Total flattened length in characters.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The flattened document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this index still describes `tree`.
    pub fn is_current(&self, tree: &RenderedTree) -> bool {
        self.revision == tree.revision()
    }

    /// Document offset of a position.
    pub fn offset_of(&self, position: TextPosition) -> Result<usize> {
        let entry = self
            .by_leaf
            .get(&position.leaf)
            .map(|i| self.entries[*i])
            .ok_or_else(|| {
                Error::shape(format!("node {} is not an indexed leaf", position.leaf.index()))
            })?;
        if position.offset > entry.len {
            return Err(Error::OffsetOutOfRange {
                offset: position.offset,
                len: entry.len,
            });
        }
        Ok(entry.start + position.offset)
    }

    /// Leaf position of the character at `offset`.
    ///
    /// Offsets at or beyond the end of the content are an error.
    pub fn position_at(&self, offset: usize) -> Result<TextPosition> {
        if offset >= self.total {
            return Err(self.out_of_range(offset));
        }
        let i = self.entries.partition_point(|e| e.end() <= offset);
        let entry = self.entries[i];
        Ok(TextPosition {
            leaf: entry.leaf,
            offset: offset - entry.start,
        })
    }

    /// Leaf position just after the character at `offset - 1`.
    ///
    /// This is where a range ending at `offset` ends: in the leaf holding its
    /// last character, never at the start of the following leaf.
    pub fn end_position_at(&self, offset: usize) -> Result<TextPosition> {
        if offset == 0 || offset > self.total {
            return Err(self.out_of_range(offset));
        }
        let i = self.entries.partition_point(|e| e.end() < offset);
        let entry = self.entries[i];
        Ok(TextPosition {
            leaf: entry.leaf,
            offset: offset - entry.start,
        })
    }

    /// Literal text of `[start, start + len)`.
    pub fn slice_text(&self, start: usize, len: usize) -> Result<String> {
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.total)
            .ok_or_else(|| self.out_of_range(start.saturating_add(len)))?;
        if start == end {
            return Ok(String::new());
        }
        let first = self.position_at(start)?;
        let first_entry = self.by_leaf.get(&first.leaf).copied().unwrap_or(0);

        let mut out = String::new();
        for entry in &self.entries[first_entry..] {
            if entry.start >= end {
                break;
            }
            let from = start.max(entry.start);
            let to = end.min(entry.end());
            out.push_str(char_slice(&self.text, from, to - from));
        }
        Ok(out)
    }

    /// Leaves overlapping `[start, start + len)` with the covered local range
    /// of each, in document order.
    pub fn leaves_in(&self, start: usize, len: usize) -> Vec<(NodeId, usize, usize)> {
        let end = start.saturating_add(len).min(self.total);
        let first = self.entries.partition_point(|e| e.end() <= start);
        self.entries[first..]
            .iter()
            .take_while(|e| e.start < end)
            .filter(|e| e.len > 0)
            .map(|e| {
                let from = start.max(e.start);
                let to = end.min(e.end());
                (e.leaf, from, to - from)
            })
            .collect()
    }

    fn out_of_range(&self, offset: usize) -> Error {
        Error::OffsetOutOfRange {
            offset,
            len: self.total,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
